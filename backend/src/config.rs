//! Analysis configuration.
//!
//! Settings are read from a TOML file (every key optional) and may be
//! overridden from environment variables. Invalid values are rejected by
//! [`AnalysisConfig::validate`] before any game is processed.
//!
//! ```toml
//! [smoother]
//! kernel = "gaussian"
//! bandwidth = 5.0
//! grid_points = 200
//! axis = "possession_index"
//!
//! [change_points]
//! source = "raw"
//! threshold = 4.0
//!
//! [significance]
//! method = "sign_test"
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::algorithms::change_points::{CusumConfig, CusumScale};
use crate::algorithms::kernel::KernelKind;
use crate::algorithms::significance::{
    CauseStdDevs, NormalApprox, SignTest, SignificanceMethod, SignificanceTest,
    WilcoxonSignedRank,
};
use crate::error::{ErrorContext, TempoError, TempoResult};

/// Full pipeline configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub smoother: SmootherSettings,
    pub change_points: ChangePointSettings,
    pub significance: SignificanceSettings,
    pub table: TableSettings,
    pub clock: ClockSettings,
}

/// Position axis of the tempo curve.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionAxis {
    #[default]
    PossessionIndex,
    /// Elapsed game time at possession start
    ElapsedSeconds,
}

/// Kernel smoother settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmootherSettings {
    pub kernel: KernelKind,
    /// Kernel bandwidth in axis units
    pub bandwidth: f64,
    pub grid_points: usize,
    pub axis: PositionAxis,
}

impl Default for SmootherSettings {
    fn default() -> Self {
        Self {
            kernel: KernelKind::Gaussian,
            bandwidth: 5.0,
            grid_points: 200,
            axis: PositionAxis::PossessionIndex,
        }
    }
}

/// Which sequence the change-point detector scans.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CurveSource {
    /// Observed TFS values in possession order
    #[default]
    Raw,
    /// The smoothed curve samples
    Smoothed,
}

/// Change-point detector settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChangePointSettings {
    pub source: CurveSource,
    pub scale: CusumScale,
    pub allowance: f64,
    pub threshold: f64,
    pub reference_mean: Option<f64>,
    pub rebaseline: bool,
    pub min_samples: usize,
}

impl Default for ChangePointSettings {
    fn default() -> Self {
        let cusum = CusumConfig::default();
        Self {
            source: CurveSource::Raw,
            scale: cusum.scale,
            allowance: cusum.allowance,
            threshold: cusum.threshold,
            reference_mean: cusum.reference_mean,
            rebaseline: cusum.rebaseline,
            min_samples: cusum.min_samples,
        }
    }
}

impl ChangePointSettings {
    pub fn cusum(&self) -> CusumConfig {
        CusumConfig {
            reference_mean: self.reference_mean,
            allowance: self.allowance,
            threshold: self.threshold,
            scale: self.scale,
            rebaseline: self.rebaseline,
            min_samples: self.min_samples,
        }
    }
}

/// Significance provider settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignificanceSettings {
    pub method: SignificanceMethod,
    /// Used by `normal_approx` only
    pub std_devs: CauseStdDevs,
}

impl SignificanceSettings {
    /// Instantiate the configured provider.
    pub fn provider(&self) -> Box<dyn SignificanceTest> {
        match self.method {
            SignificanceMethod::Wilcoxon => Box::new(WilcoxonSignedRank),
            SignificanceMethod::SignTest => Box::new(SignTest),
            SignificanceMethod::NormalApprox => Box::new(NormalApprox {
                std_devs: self.std_devs,
            }),
        }
    }
}

/// How period-opening possessions are treated.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodStartPolicy {
    /// Counted like any other possession
    Include,
    /// Shown in the table, left out of every aggregate
    #[default]
    ExcludeFromStats,
    /// Removed from the table and from every aggregate
    Hide,
}

/// Possession table settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableSettings {
    pub period_start: PeriodStartPolicy,
}

/// Game clock layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockSettings {
    pub period_seconds: f64,
    pub regulation_periods: u32,
    pub overtime_seconds: f64,
}

impl Default for ClockSettings {
    fn default() -> Self {
        Self {
            period_seconds: 1200.0,
            regulation_periods: 2,
            overtime_seconds: 300.0,
        }
    }
}

impl ClockSettings {
    /// Length of `period` in seconds.
    pub fn period_length(&self, period: u32) -> f64 {
        if period <= self.regulation_periods {
            self.period_seconds
        } else {
            self.overtime_seconds
        }
    }

    /// Seconds elapsed since tip-off at `clock_remaining` in `period`.
    pub fn elapsed_seconds(&self, period: u32, clock_remaining: f64) -> f64 {
        let completed: f64 = (1..period.max(1)).map(|p| self.period_length(p)).sum();
        completed + (self.period_length(period) - clock_remaining).max(0.0)
    }
}

impl AnalysisConfig {
    /// Load configuration from a TOML file and validate it.
    ///
    /// # Arguments
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    /// * `Ok(AnalysisConfig)` if successful
    /// * `Err(TempoError::Configuration)` if the file cannot be read, parsed or validated
    pub fn from_file<P: AsRef<Path>>(path: P) -> TempoResult<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            TempoError::configuration_with_context(
                format!("Failed to read config file: {}", e),
                ErrorContext::new("load_config").with_details(path.as_ref().display().to_string()),
            )
        })?;

        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from TOML text.
    pub fn from_toml_str(content: &str) -> TempoResult<Self> {
        let config: AnalysisConfig = toml::from_str(content).map_err(|e| {
            TempoError::configuration_with_context(
                format!("Failed to parse config file: {}", e),
                ErrorContext::new("load_config"),
            )
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the default location.
    ///
    /// Searches for `tempo.toml` in:
    /// 1. Current directory
    /// 2. `backend/` directory
    /// 3. Parent directory
    pub fn from_default_location() -> TempoResult<Self> {
        match Self::default_location() {
            Some(path) => Self::from_file(path),
            None => Err(TempoError::configuration(
                "No tempo.toml found in standard locations",
            )),
        }
    }

    /// First `tempo.toml` found in the standard locations, if any.
    pub fn default_location() -> Option<PathBuf> {
        [
            PathBuf::from("tempo.toml"),
            PathBuf::from("backend/tempo.toml"),
            PathBuf::from("../tempo.toml"),
        ]
        .into_iter()
        .find(|path| path.exists())
    }

    /// Load `path` when given, otherwise fall back to the built-in defaults.
    ///
    /// Only an absent path falls back; a file that exists but fails to read,
    /// parse or validate is an error.
    pub fn from_optional_file<P: AsRef<Path>>(path: Option<P>) -> TempoResult<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Apply environment variable overrides.
    ///
    /// # Environment Variables
    /// - `TFS_BANDWIDTH`: smoother bandwidth
    /// - `TFS_GRID_POINTS`: number of curve samples
    /// - `TFS_CUSUM_THRESHOLD`: change-point decision threshold
    /// - `TFS_CUSUM_ALLOWANCE`: change-point allowance
    /// - `TFS_SIGNIFICANCE`: `wilcoxon` | `sign_test` | `normal_approx`
    ///
    /// # Errors
    /// Returns a configuration error if a variable is set but unparsable, or
    /// if the resulting configuration is invalid.
    pub fn with_env_overrides(mut self) -> TempoResult<Self> {
        if let Some(bandwidth) = env_override::<f64>("TFS_BANDWIDTH")? {
            self.smoother.bandwidth = bandwidth;
        }
        if let Some(grid_points) = env_override::<usize>("TFS_GRID_POINTS")? {
            self.smoother.grid_points = grid_points;
        }
        if let Some(threshold) = env_override::<f64>("TFS_CUSUM_THRESHOLD")? {
            self.change_points.threshold = threshold;
        }
        if let Some(allowance) = env_override::<f64>("TFS_CUSUM_ALLOWANCE")? {
            self.change_points.allowance = allowance;
        }
        if let Some(method) = env_override::<SignificanceMethod>("TFS_SIGNIFICANCE")? {
            self.significance.method = method;
        }
        self.validate()?;
        Ok(self)
    }

    /// Check every parameter a caller could get wrong.
    pub fn validate(&self) -> TempoResult<()> {
        let fail = |message: String| {
            Err(TempoError::configuration_with_context(
                message,
                ErrorContext::new("validate_config"),
            ))
        };

        let bandwidth = self.smoother.bandwidth;
        if !bandwidth.is_finite() || bandwidth <= 0.0 {
            return fail(format!(
                "smoother.bandwidth must be finite and positive, got {}",
                bandwidth
            ));
        }
        if self.smoother.grid_points == 0 {
            return fail("smoother.grid_points must be at least 1".to_string());
        }

        self.change_points.cusum().validate()?;

        let clock = &self.clock;
        for (name, value) in [
            ("clock.period_seconds", clock.period_seconds),
            ("clock.overtime_seconds", clock.overtime_seconds),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return fail(format!("{} must be finite and positive, got {}", name, value));
            }
        }

        let std_devs = &self.significance.std_devs;
        for (name, value) in [
            ("rebound", std_devs.rebound),
            ("turnover", std_devs.turnover),
            ("oppo_made_shot", std_devs.oppo_made_shot),
            ("oppo_made_ft", std_devs.oppo_made_ft),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return fail(format!(
                    "significance.std_devs.{} must be finite and positive, got {}",
                    name, value
                ));
            }
        }

        Ok(())
    }
}

fn env_override<T>(name: &str) -> TempoResult<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) if raw.trim().is_empty() => Ok(None),
        Ok(raw) => raw.trim().parse::<T>().map(Some).map_err(|e| {
            TempoError::configuration_with_context(
                format!("{} has invalid value '{}': {}", name, raw, e),
                ErrorContext::new("env_overrides"),
            )
        }),
        Err(_) => Ok(None),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CHANGE-POINT DETECTION (CUSUM)
// ═══════════════════════════════════════════════════════════════════════════════
//
// Two one-sided cumulative sums track upward and downward drift of the TFS
// sequence away from a reference mean. When either sum crosses the decision
// threshold a change point is emitted and both sums restart from zero, so one
// excursion produces exactly one change point.

use log::debug;
use serde::{Deserialize, Serialize};

use super::descriptive::{mean, std_dev};
use crate::error::{ErrorContext, TempoError, TempoResult};

/// Floor for the scale estimate of a constant sequence.
const MIN_SIGMA: f64 = 1e-6;

/// Unit in which allowance and threshold are expressed.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CusumScale {
    /// Multiples of the sequence standard deviation
    #[default]
    StdDev,
    /// Seconds of TFS
    Seconds,
}

/// Parameters of the detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CusumConfig {
    /// Reference mean; the sequence mean when absent
    pub reference_mean: Option<f64>,
    /// Slack subtracted from each deviation (k)
    pub allowance: f64,
    /// Decision threshold (h)
    pub threshold: f64,
    pub scale: CusumScale,
    /// Move the reference to the estimated new mean after each alarm
    pub rebaseline: bool,
    /// Sequences shorter than this yield no change points
    pub min_samples: usize,
}

impl Default for CusumConfig {
    fn default() -> Self {
        Self {
            reference_mean: None,
            allowance: 0.5,
            threshold: 4.0,
            scale: CusumScale::StdDev,
            rebaseline: true,
            min_samples: 5,
        }
    }
}

impl CusumConfig {
    /// Reject parameters that indicate a caller error.
    pub fn validate(&self) -> TempoResult<()> {
        let context = || ErrorContext::new("detect_change_points");
        if !self.allowance.is_finite() || self.allowance < 0.0 {
            return Err(TempoError::configuration_with_context(
                format!("allowance must be finite and >= 0, got {}", self.allowance),
                context(),
            ));
        }
        if !self.threshold.is_finite() || self.threshold <= 0.0 {
            return Err(TempoError::configuration_with_context(
                format!("threshold must be finite and > 0, got {}", self.threshold),
                context(),
            ));
        }
        if let Some(reference) = self.reference_mean {
            if !reference.is_finite() {
                return Err(TempoError::configuration_with_context(
                    format!("reference mean must be finite, got {}", reference),
                    context(),
                ));
            }
        }
        Ok(())
    }
}

/// Direction of a detected mean shift. `Up` means longer TFS (slower tempo).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShiftDirection {
    Up,
    Down,
}

/// Alarm raised by [`CusumDetector::update`].
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CusumAlarm {
    pub direction: ShiftDirection,
    /// Samples since the alarming statistic last sat at zero
    pub run_length: usize,
    /// Estimated size of the shift, in the sequence's units
    pub magnitude: f64,
}

/// Detected tempo shift.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangePoint {
    /// Sequence index at which the alarm fired
    pub index: usize,
    /// Sequence index where the excursion began
    pub onset_index: usize,
    pub position: f64,
    pub direction: ShiftDirection,
    pub magnitude: f64,
}

/// Streaming two-sided CUSUM detector.
#[derive(Debug, Clone)]
pub struct CusumDetector {
    /// Reference mean
    target: f64,
    /// Slack per sample
    slack: f64,
    /// Decision threshold
    threshold: f64,
    cusum_pos: f64,
    cusum_neg: f64,
    run_pos: usize,
    run_neg: usize,
}

impl CusumDetector {
    /// Create a detector with absolute slack and threshold.
    pub fn new(target: f64, slack: f64, threshold: f64) -> Self {
        Self {
            target,
            slack,
            threshold,
            cusum_pos: 0.0,
            cusum_neg: 0.0,
            run_pos: 0,
            run_neg: 0,
        }
    }

    /// Create with slack and threshold in units of `std_dev`.
    pub fn from_baseline(mean: f64, std_dev: f64, allowance: f64, threshold: f64) -> Self {
        let sigma = std_dev.max(MIN_SIGMA);
        Self::new(mean, allowance * sigma, threshold * sigma)
    }

    /// Feed one sample. Returns an alarm when either statistic crosses the
    /// threshold; the caller decides whether to [`reset`](Self::reset).
    pub fn update(&mut self, sample: f64) -> Option<CusumAlarm> {
        let deviation = sample - self.target;

        self.cusum_pos = (self.cusum_pos + deviation - self.slack).max(0.0);
        self.cusum_neg = (self.cusum_neg - deviation - self.slack).max(0.0);
        self.run_pos = if self.cusum_pos > 0.0 { self.run_pos + 1 } else { 0 };
        self.run_neg = if self.cusum_neg > 0.0 { self.run_neg + 1 } else { 0 };

        let up = self.cusum_pos > self.threshold;
        let down = self.cusum_neg > self.threshold;
        if !up && !down {
            return None;
        }

        let (direction, sum, run_length) = if up && (!down || self.cusum_pos >= self.cusum_neg) {
            (ShiftDirection::Up, self.cusum_pos, self.run_pos)
        } else {
            (ShiftDirection::Down, self.cusum_neg, self.run_neg)
        };

        Some(CusumAlarm {
            direction,
            run_length,
            magnitude: self.slack + sum / run_length.max(1) as f64,
        })
    }

    /// Current CUSUM statistics
    pub fn cusum_stats(&self) -> (f64, f64) {
        (self.cusum_pos, self.cusum_neg)
    }

    pub fn target(&self) -> f64 {
        self.target
    }

    /// Reset detector (after acknowledged change-point)
    pub fn reset(&mut self) {
        self.cusum_pos = 0.0;
        self.cusum_neg = 0.0;
        self.run_pos = 0;
        self.run_neg = 0;
    }

    /// Move the reference mean.
    pub fn rebaseline(&mut self, target: f64) {
        self.target = target;
    }
}

/// Scan `values` (ordered by possession) for mean shifts.
///
/// `positions` gives the reported position of each value and must have the
/// same length. Sequences shorter than `config.min_samples` yield an empty
/// list. Output is ordered by index with no duplicates.
pub fn detect_change_points(
    values: &[f64],
    positions: &[f64],
    config: &CusumConfig,
) -> TempoResult<Vec<ChangePoint>> {
    config.validate()?;
    if values.len() != positions.len() {
        return Err(TempoError::configuration_with_context(
            format!(
                "{} values but {} positions",
                values.len(),
                positions.len()
            ),
            ErrorContext::new("detect_change_points"),
        ));
    }
    if values.len() < config.min_samples.max(1) {
        debug!(
            "Skipping change-point detection: {} samples < {}",
            values.len(),
            config.min_samples
        );
        return Ok(vec![]);
    }

    let target = match config.reference_mean {
        Some(reference) => reference,
        None => mean(values).unwrap_or_default(),
    };
    let sigma = match config.scale {
        CusumScale::StdDev => std_dev(values).unwrap_or_default(),
        CusumScale::Seconds => 1.0,
    };
    let mut detector = CusumDetector::from_baseline(target, sigma, config.allowance, config.threshold);

    let mut change_points = Vec::new();
    for (index, &value) in values.iter().enumerate() {
        let Some(alarm) = detector.update(value) else {
            continue;
        };

        change_points.push(ChangePoint {
            index,
            onset_index: (index + 1).saturating_sub(alarm.run_length),
            position: positions[index],
            direction: alarm.direction,
            magnitude: alarm.magnitude,
        });

        detector.reset();
        if config.rebaseline {
            let shift = match alarm.direction {
                ShiftDirection::Up => alarm.magnitude,
                ShiftDirection::Down => -alarm.magnitude,
            };
            detector.rebaseline(detector.target() + shift);
        }
    }

    debug!("Detected {} change points", change_points.len());
    Ok(change_points)
}

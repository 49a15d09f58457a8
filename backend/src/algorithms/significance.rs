//! Significance of a residual sample.
//!
//! All providers test the same null hypothesis (the residuals are centred on
//! zero) and return a probability in `[0, 1]`. They are interchangeable: the
//! pipeline picks one from configuration through [`SignificanceMethod`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::models::StartCause;

/// Largest sample for which the Wilcoxon null distribution is enumerated.
const WILCOXON_EXACT_MAX_N: usize = 50;

/// Which significance provider to use.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignificanceMethod {
    /// Wilcoxon signed-rank test
    #[default]
    #[serde(alias = "wilcoxon_signed_rank")]
    Wilcoxon,
    /// Binomial sign test
    SignTest,
    /// z-test against per-cause standard deviations
    NormalApprox,
}

impl SignificanceMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignificanceMethod::Wilcoxon => "wilcoxon",
            SignificanceMethod::SignTest => "sign_test",
            SignificanceMethod::NormalApprox => "normal_approx",
        }
    }
}

impl fmt::Display for SignificanceMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignificanceMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "wilcoxon" | "wilcoxon_signed_rank" => Ok(SignificanceMethod::Wilcoxon),
            "sign_test" | "sign" => Ok(SignificanceMethod::SignTest),
            "normal_approx" | "normal" | "z_test" => Ok(SignificanceMethod::NormalApprox),
            other => Err(format!("Unknown significance method '{}'", other)),
        }
    }
}

/// Sign of the tested location.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectDirection {
    /// Residuals lean positive (observed TFS above expectation)
    Positive,
    Negative,
    Neutral,
}

impl EffectDirection {
    fn from_offset(offset: f64) -> Self {
        if offset > 0.0 {
            EffectDirection::Positive
        } else if offset < 0.0 {
            EffectDirection::Negative
        } else {
            EffectDirection::Neutral
        }
    }
}

/// One residual with the context some providers need.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ResidualObservation {
    pub period: u32,
    pub cause: StartCause,
    pub residual: f64,
}

/// Result of a significance test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignificanceOutcome {
    pub method: SignificanceMethod,
    /// Two-sided p-value
    pub p_value: f64,
    /// Test statistic (W+, positive count, or z)
    pub statistic: f64,
    /// Observations that entered the test
    pub n: usize,
    pub direction: EffectDirection,
    /// Φ(z) for the normal approximation; higher means more likely slow
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slow_probability: Option<f64>,
}

/// A provider of the significance contract.
pub trait SignificanceTest: Send + Sync {
    fn method(&self) -> SignificanceMethod;

    /// `None` when the sample carries no information (empty, or all zeros
    /// for the rank-based tests).
    fn test(&self, observations: &[ResidualObservation]) -> Option<SignificanceOutcome>;
}

// ---------------------------------------------------------------------------
// Wilcoxon signed-rank
// ---------------------------------------------------------------------------

/// Wilcoxon signed-rank test of a zero median.
///
/// Zeros are dropped and tied magnitudes get midranks. The null distribution
/// of W+ is enumerated exactly up to 50 non-zero residuals; larger samples use
/// the normal approximation with tie and continuity corrections.
#[derive(Debug, Copy, Clone, Default)]
pub struct WilcoxonSignedRank;

impl SignificanceTest for WilcoxonSignedRank {
    fn method(&self) -> SignificanceMethod {
        SignificanceMethod::Wilcoxon
    }

    fn test(&self, observations: &[ResidualObservation]) -> Option<SignificanceOutcome> {
        let mut nonzero: Vec<f64> = observations
            .iter()
            .map(|o| o.residual)
            .filter(|r| *r != 0.0 && r.is_finite())
            .collect();
        if nonzero.is_empty() {
            return None;
        }
        nonzero.sort_by(|a, b| a.abs().total_cmp(&b.abs()));

        let n = nonzero.len();
        let (doubled_ranks, tie_sizes) = doubled_midranks(&nonzero);
        let w_plus_doubled: usize = nonzero
            .iter()
            .zip(&doubled_ranks)
            .filter(|(r, _)| **r > 0.0)
            .map(|(_, rank)| *rank)
            .sum();
        let total_doubled: usize = doubled_ranks.iter().sum();

        let p_value = if n <= WILCOXON_EXACT_MAX_N {
            exact_signed_rank_p(&doubled_ranks, w_plus_doubled)
        } else {
            normal_signed_rank_p(n, w_plus_doubled, &tie_sizes)
        };

        Some(SignificanceOutcome {
            method: SignificanceMethod::Wilcoxon,
            p_value,
            statistic: w_plus_doubled as f64 / 2.0,
            n,
            direction: EffectDirection::from_offset(
                w_plus_doubled as f64 - total_doubled as f64 / 2.0,
            ),
            slow_probability: None,
        })
    }
}

/// Twice the midrank of each value (sorted by magnitude), plus tie group sizes.
fn doubled_midranks(sorted_by_magnitude: &[f64]) -> (Vec<usize>, Vec<usize>) {
    let n = sorted_by_magnitude.len();
    let mut ranks = vec![0; n];
    let mut ties = Vec::new();
    let mut start = 0;
    while start < n {
        let magnitude = sorted_by_magnitude[start].abs();
        let mut end = start + 1;
        while end < n && sorted_by_magnitude[end].abs() == magnitude {
            end += 1;
        }
        // 1-based positions start+1..=end; twice their mean is start+1+end
        for rank in ranks.iter_mut().take(end).skip(start) {
            *rank = start + 1 + end;
        }
        ties.push(end - start);
        start = end;
    }
    (ranks, ties)
}

fn exact_signed_rank_p(doubled_ranks: &[usize], w_doubled: usize) -> f64 {
    let total: usize = doubled_ranks.iter().sum();
    let mut dist = vec![0.0_f64; total + 1];
    dist[0] = 1.0;
    for &rank in doubled_ranks {
        for s in (rank..=total).rev() {
            dist[s] = 0.5 * (dist[s] + dist[s - rank]);
        }
        for value in dist.iter_mut().take(rank.min(total + 1)) {
            *value *= 0.5;
        }
    }

    let lower: f64 = dist[..=w_doubled].iter().sum();
    let upper: f64 = dist[w_doubled..].iter().sum();
    (2.0 * lower.min(upper)).min(1.0)
}

fn normal_signed_rank_p(n: usize, w_doubled: usize, tie_sizes: &[usize]) -> f64 {
    let n = n as f64;
    let mean = n * (n + 1.0) / 4.0;
    let tie_correction: f64 = tie_sizes
        .iter()
        .map(|&t| {
            let t = t as f64;
            t * t * t - t
        })
        .sum::<f64>()
        / 48.0;
    let variance = n * (n + 1.0) * (2.0 * n + 1.0) / 24.0 - tie_correction;
    if variance <= 0.0 {
        return 1.0;
    }

    let offset = w_doubled as f64 / 2.0 - mean;
    let corrected = (offset.abs() - 0.5).max(0.0);
    let z = corrected / variance.sqrt();
    (2.0 * (1.0 - normal_cdf(z))).clamp(0.0, 1.0)
}

// ---------------------------------------------------------------------------
// Sign test
// ---------------------------------------------------------------------------

/// Exact binomial sign test: positives vs negatives under p = 1/2.
#[derive(Debug, Copy, Clone, Default)]
pub struct SignTest;

impl SignificanceTest for SignTest {
    fn method(&self) -> SignificanceMethod {
        SignificanceMethod::SignTest
    }

    fn test(&self, observations: &[ResidualObservation]) -> Option<SignificanceOutcome> {
        let positives = observations.iter().filter(|o| o.residual > 0.0).count();
        let negatives = observations.iter().filter(|o| o.residual < 0.0).count();
        let n = positives + negatives;
        if n == 0 {
            return None;
        }

        let lower = binomial_cdf_half(n, positives);
        let upper = binomial_cdf_half(n, negatives);

        Some(SignificanceOutcome {
            method: SignificanceMethod::SignTest,
            p_value: (2.0 * lower.min(upper)).min(1.0),
            statistic: positives as f64,
            n,
            direction: EffectDirection::from_offset(positives as f64 - negatives as f64),
            slow_probability: None,
        })
    }
}

/// P(X <= k) for X ~ Binomial(n, 1/2), summed in log space.
fn binomial_cdf_half(n: usize, k: usize) -> f64 {
    let mut ln_fact = Vec::with_capacity(n + 1);
    ln_fact.push(0.0_f64);
    for i in 1..=n {
        let prev = ln_fact[i - 1];
        ln_fact.push(prev + (i as f64).ln());
    }
    let ln_half_n = n as f64 * 0.5_f64.ln();

    (0..=k.min(n))
        .map(|i| (ln_fact[n] - ln_fact[i] - ln_fact[n - i] + ln_half_n).exp())
        .sum::<f64>()
        .min(1.0)
}

// ---------------------------------------------------------------------------
// Normal approximation
// ---------------------------------------------------------------------------

/// Per-cause residual standard deviations, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CauseStdDevs {
    pub rebound: f64,
    pub turnover: f64,
    pub oppo_made_shot: f64,
    pub oppo_made_ft: f64,
}

impl Default for CauseStdDevs {
    fn default() -> Self {
        Self {
            rebound: 8.5,
            turnover: 8.5,
            oppo_made_shot: 10.0,
            oppo_made_ft: 9.0,
        }
    }
}

impl CauseStdDevs {
    pub fn for_cause(&self, cause: StartCause) -> f64 {
        match cause {
            StartCause::Rebound | StartCause::PeriodStart => self.rebound,
            StartCause::Turnover => self.turnover,
            StartCause::OppoMadeShot => self.oppo_made_shot,
            StartCause::OppoMadeFt => self.oppo_made_ft,
        }
    }
}

/// z-test of the mean residual with a count-weighted pooled variance.
#[derive(Debug, Clone, Copy, Default)]
pub struct NormalApprox {
    pub std_devs: CauseStdDevs,
}

impl SignificanceTest for NormalApprox {
    fn method(&self) -> SignificanceMethod {
        SignificanceMethod::NormalApprox
    }

    fn test(&self, observations: &[ResidualObservation]) -> Option<SignificanceOutcome> {
        let n = observations.len();
        if n == 0 {
            return None;
        }

        let mean = observations.iter().map(|o| o.residual).sum::<f64>() / n as f64;
        let pooled_variance = observations
            .iter()
            .map(|o| self.std_devs.for_cause(o.cause).powi(2))
            .sum::<f64>()
            / n as f64;
        if pooled_variance <= 0.0 {
            return None;
        }

        let standard_error = pooled_variance.sqrt() / (n as f64).sqrt();
        let z = mean / standard_error;

        Some(SignificanceOutcome {
            method: SignificanceMethod::NormalApprox,
            p_value: (2.0 * (1.0 - normal_cdf(z.abs()))).clamp(0.0, 1.0),
            statistic: z,
            n,
            direction: EffectDirection::from_offset(mean),
            slow_probability: Some(normal_cdf(z)),
        })
    }
}

/// Standard normal CDF approximation (Abramowitz and Stegun)
pub fn normal_cdf(x: f64) -> f64 {
    let a1 = 0.254829592;
    let a2 = -0.284496736;
    let a3 = 1.421413741;
    let a4 = -1.453152027;
    let a5 = 1.061405429;
    let p = 0.3275911;

    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs() / std::f64::consts::SQRT_2;

    let t = 1.0 / (1.0 + p * x);
    let y = 1.0 - (((((a5 * t + a4) * t) + a3) * t + a2) * t + a1) * t * (-x * x).exp();

    0.5 * (1.0 + sign * y)
}

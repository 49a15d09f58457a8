//! Kernel smoothing of the TFS sequence.
//!
//! Each grid sample is a weighted average of the observed values, with
//! weights from a symmetric kernel that decreases with distance. Weights are
//! renormalized over the points that are actually present, so samples near
//! the ends of the sequence are not pulled toward zero.

use serde::{Deserialize, Serialize};

use crate::error::{ErrorContext, TempoError, TempoResult};

/// Weight below which an observation is not counted in `n_samples`.
const SIGNIFICANT_WEIGHT: f64 = 0.01;

/// Kernel shape.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KernelKind {
    #[default]
    Gaussian,
    /// Compact support: zero weight beyond one bandwidth
    Epanechnikov,
}

/// One sample of the smoothed curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmoothedPoint {
    pub position: f64,
    /// `None` when no observation carries weight at this position
    pub smoothed_value: Option<f64>,
    /// Observations whose normalized weight exceeds 1%
    pub n_samples: usize,
}

/// Stateless kernel smoother with a fixed bandwidth.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct KernelSmoother {
    kind: KernelKind,
    bandwidth: f64,
}

impl KernelSmoother {
    /// Create a smoother. The bandwidth must be finite and positive.
    pub fn new(kind: KernelKind, bandwidth: f64) -> TempoResult<Self> {
        if !bandwidth.is_finite() || bandwidth <= 0.0 {
            return Err(TempoError::configuration_with_context(
                format!("bandwidth must be finite and positive, got {}", bandwidth),
                ErrorContext::new("kernel_smoother"),
            ));
        }
        Ok(Self { kind, bandwidth })
    }

    pub fn kind(&self) -> KernelKind {
        self.kind
    }

    pub fn bandwidth(&self) -> f64 {
        self.bandwidth
    }

    /// Log-weight of an observation at scaled distance `u = d / bandwidth`.
    /// `None` means zero weight.
    fn log_weight(&self, u: f64) -> Option<f64> {
        match self.kind {
            KernelKind::Gaussian => Some(-0.5 * u * u),
            KernelKind::Epanechnikov => {
                let w = 1.0 - u * u;
                (w > 0.0).then(|| w.ln())
            }
        }
    }

    /// Normalized weights of each observation at `x`.
    ///
    /// The weights sum to 1 whenever at least one observation is in reach;
    /// `None` otherwise. Gaussian log-weights are shifted by their maximum
    /// before exponentiation so far-away grid points do not underflow to an
    /// all-zero weight vector.
    pub fn weights_at(&self, positions: &[f64], x: f64) -> Option<Vec<f64>> {
        let log_weights: Vec<Option<f64>> = positions
            .iter()
            .map(|p| self.log_weight((p - x) / self.bandwidth))
            .collect();

        let max_log = log_weights
            .iter()
            .flatten()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);
        if !max_log.is_finite() {
            return None;
        }

        let raw: Vec<f64> = log_weights
            .iter()
            .map(|lw| lw.map_or(0.0, |lw| (lw - max_log).exp()))
            .collect();
        let total: f64 = raw.iter().sum();
        if total <= 0.0 {
            return None;
        }
        Some(raw.into_iter().map(|w| w / total).collect())
    }

    /// Smooth `(position, value)` observations onto `grid`.
    ///
    /// Pure function of its inputs: calling it twice with the same arguments
    /// gives the same curve.
    pub fn smooth(&self, points: &[(f64, f64)], grid: &[f64]) -> Vec<SmoothedPoint> {
        let positions: Vec<f64> = points.iter().map(|(x, _)| *x).collect();

        grid.iter()
            .map(|&x| match self.weights_at(&positions, x) {
                Some(weights) => {
                    let smoothed = weights
                        .iter()
                        .zip(points)
                        .map(|(w, (_, y))| w * y)
                        .sum::<f64>();
                    SmoothedPoint {
                        position: x,
                        smoothed_value: Some(smoothed),
                        n_samples: weights.iter().filter(|w| **w > SIGNIFICANT_WEIGHT).count(),
                    }
                }
                None => SmoothedPoint {
                    position: x,
                    smoothed_value: None,
                    n_samples: 0,
                },
            })
            .collect()
    }
}

/// `n_points` evenly spaced positions covering `[min, max]`.
///
/// A degenerate range collapses to a single point.
pub fn linspace_grid(min: f64, max: f64, n_points: usize) -> Vec<f64> {
    if n_points == 0 || !min.is_finite() || !max.is_finite() {
        return vec![];
    }
    if n_points == 1 || min == max {
        return vec![min];
    }

    let range = max - min;
    (0..n_points)
        .map(|i| min + (i as f64 / (n_points - 1) as f64) * range)
        .collect()
}

/// Grid spanning the observed positions.
pub fn grid_for(points: &[(f64, f64)], n_points: usize) -> Vec<f64> {
    if points.is_empty() {
        return vec![];
    }
    let x_min = points.iter().map(|(x, _)| *x).fold(f64::INFINITY, f64::min);
    let x_max = points
        .iter()
        .map(|(x, _)| *x)
        .fold(f64::NEG_INFINITY, f64::max);
    linspace_grid(x_min, x_max, n_points)
}

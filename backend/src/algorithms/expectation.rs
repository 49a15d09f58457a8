//! Expected time to first shot.
//!
//! Eight fixed linear formulas, one per (period, start cause) pair. The
//! period-2 formulas also depend on the absolute score differential at the end
//! of period 1. Overtime periods use the period-2 formulas and period-opening
//! possessions use the rebound formula.

use serde::{Deserialize, Serialize};

use crate::models::{RawEvent, StartCause};

/// Model half: period 1, or period 2 and later.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelPeriod {
    First,
    Second,
}

impl ModelPeriod {
    pub fn from_period(period: u32) -> Self {
        if period <= 1 {
            ModelPeriod::First
        } else {
            ModelPeriod::Second
        }
    }
}

/// Coefficients of one expectation formula:
/// `intercept - total * closing_total - diff * score_differential`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Coefficients {
    pub intercept: f64,
    pub total: f64,
    /// Zero for period-1 formulas
    pub diff: f64,
}

impl Coefficients {
    /// Formula for a (period, start cause) pair.
    pub fn lookup(period: ModelPeriod, cause: StartCause) -> Coefficients {
        let (intercept, total, diff) = match (period, cause) {
            (ModelPeriod::First, StartCause::Turnover) => (23.4283, 0.068865, 0.0),
            (ModelPeriod::First, StartCause::Rebound | StartCause::PeriodStart) => {
                (23.2206, 0.070364, 0.0)
            }
            (ModelPeriod::First, StartCause::OppoMadeShot) => (35.8503, 0.105015, 0.0),
            (ModelPeriod::First, StartCause::OppoMadeFt) => (28.1118, 0.065201, 0.0),
            (ModelPeriod::Second, StartCause::Turnover) => (22.0475, 0.057148, 0.061952),
            (ModelPeriod::Second, StartCause::Rebound | StartCause::PeriodStart) => {
                (24.2071, 0.072452, 0.045162)
            }
            (ModelPeriod::Second, StartCause::OppoMadeShot) => (35.0632, 0.097778, 0.034749),
            (ModelPeriod::Second, StartCause::OppoMadeFt) => (29.7614, 0.073256, 0.030282),
        };
        Coefficients {
            intercept,
            total,
            diff,
        }
    }
}

/// Game-level covariates feeding the model.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameCovariates {
    pub closing_total: Option<f64>,
    /// Absolute score differential observed over period 1
    pub score_diff: Option<f64>,
}

/// Predict TFS for a possession.
///
/// Returns `None` when the closing total is unavailable, or for period 2 and
/// later when the score differential is unavailable.
///
/// # Examples
///
/// ```
/// use tfs_tempo::algorithms::expectation::{expected_tfs, GameCovariates};
/// use tfs_tempo::models::StartCause;
///
/// let covariates = GameCovariates { closing_total: Some(140.0), score_diff: None };
/// let expected = expected_tfs(1, StartCause::Turnover, &covariates).unwrap();
/// assert!((expected - 13.7872).abs() < 1e-6);
/// assert!(expected_tfs(2, StartCause::Turnover, &covariates).is_none());
/// ```
pub fn expected_tfs(period: u32, cause: StartCause, covariates: &GameCovariates) -> Option<f64> {
    let total = covariates.closing_total.filter(|t| t.is_finite())?;
    let model_period = ModelPeriod::from_period(period);
    let coefficients = Coefficients::lookup(model_period, cause);

    match model_period {
        ModelPeriod::First => Some(coefficients.intercept - coefficients.total * total),
        ModelPeriod::Second => {
            let diff = covariates.score_diff?;
            Some(coefficients.intercept - coefficients.total * total - coefficients.diff * diff)
        }
    }
}

/// Absolute difference between the highest away and highest home score seen
/// during period 1. `None` when the stream has no period-1 events.
pub fn period_one_score_differential(events: &[RawEvent]) -> Option<f64> {
    let (max_home, max_away) = events
        .iter()
        .filter(|e| e.period == 1)
        .fold(None, |acc: Option<(u32, u32)>, e| {
            let (home, away) = acc.unwrap_or((0, 0));
            Some((home.max(e.home_score), away.max(e.away_score)))
        })?;
    Some((max_away as f64 - max_home as f64).abs())
}

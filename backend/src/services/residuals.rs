//! Residual aggregation and the second-half tempo verdict.
//!
//! Residuals (`observed - expected`) are grouped into three scopes: period 1,
//! period 2 (including overtime) and the whole game. [`ResidualSummary`] is the
//! record downstream consumers persist; its field names are fixed.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::algorithms::descriptive::{mean, median, pct_above_zero};
use crate::algorithms::significance::{
    ResidualObservation, SignificanceOutcome, SignificanceTest,
};
use crate::models::StartCause;

/// Residual of one possession; `None` if either side is undefined.
pub fn residual(observed: Option<f64>, expected: Option<f64>) -> Option<f64> {
    Some(observed? - expected?)
}

/// Scope of an aggregate.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    Period1,
    /// Period 2 and any overtime
    Period2,
    Game,
}

impl Scope {
    pub fn contains(&self, period: u32) -> bool {
        match self {
            Scope::Period1 => period == 1,
            Scope::Period2 => period >= 2,
            Scope::Game => true,
        }
    }
}

/// Compatibility record persisted by downstream consumers.
///
/// Undefined statistics serialize as `null`, never as zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResidualSummary {
    pub total_poss_p1: usize,
    pub mean_residual_p1: Option<f64>,
    pub median_residual_p1: Option<f64>,
    pub total_poss_p2: usize,
    pub mean_residual_p2: Option<f64>,
    pub median_residual_p2: Option<f64>,
    pub p_value_p2: Option<f64>,
    pub total_poss: usize,
    pub mean_residual: Option<f64>,
    pub median_residual: Option<f64>,
}

/// Statistics for one scope or one (scope, start cause) cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopeStats {
    pub count: usize,
    pub mean: Option<f64>,
    pub median: Option<f64>,
    /// Percentage of residuals above zero ("% slower")
    pub pct_above: Option<f64>,
    pub p_value: Option<f64>,
    pub significance: Option<SignificanceOutcome>,
}

impl ScopeStats {
    fn compute(observations: &[ResidualObservation], test: &dyn SignificanceTest) -> Self {
        let residuals: Vec<f64> = observations.iter().map(|o| o.residual).collect();
        let significance = test.test(observations);
        Self {
            count: residuals.len(),
            mean: mean(&residuals),
            median: median(&residuals),
            pct_above: pct_above_zero(&residuals),
            p_value: significance.as_ref().map(|s| s.p_value),
            significance,
        }
    }
}

/// Scope statistics with a per-start-cause split.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopeBreakdown {
    pub overall: ScopeStats,
    pub by_cause: BTreeMap<StartCause, ScopeStats>,
}

/// Detailed residual statistics beyond the compatibility record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResidualBreakdown {
    pub period_1: ScopeBreakdown,
    pub period_2: ScopeBreakdown,
    pub game: ScopeBreakdown,
}

/// Direction of the second-half tempo verdict.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TempoDirection {
    Slower,
    Faster,
    Undetermined,
}

/// "Second half ran slower/faster than expected, with confidence X".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TempoVerdict {
    pub direction: TempoDirection,
    pub p_value: Option<f64>,
    /// `1 - p_value`
    pub confidence: Option<f64>,
}

impl TempoVerdict {
    /// Verdict from the period-2 median residual.
    pub fn from_summary(summary: &ResidualSummary) -> Self {
        let direction = match summary.median_residual_p2 {
            Some(m) if m > 0.0 => TempoDirection::Slower,
            Some(m) if m < 0.0 => TempoDirection::Faster,
            _ => TempoDirection::Undetermined,
        };
        let p_value = match direction {
            TempoDirection::Undetermined => None,
            _ => summary.p_value_p2,
        };
        Self {
            direction,
            p_value,
            confidence: p_value.map(|p| 1.0 - p),
        }
    }
}

/// Everything the residual engine produces for one game.
#[derive(Debug, Clone, PartialEq)]
pub struct ResidualAnalysis {
    pub summary: ResidualSummary,
    pub breakdown: ResidualBreakdown,
    pub verdict: TempoVerdict,
}

/// Aggregate residuals into the summary, breakdown and verdict.
///
/// `observations` must only contain possessions with both an observed and an
/// expected TFS; exclusions are applied by the caller.
pub fn analyze_residuals(
    observations: &[ResidualObservation],
    test: &dyn SignificanceTest,
) -> ResidualAnalysis {
    let period_1 = breakdown_for(Scope::Period1, observations, test);
    let period_2 = breakdown_for(Scope::Period2, observations, test);
    let game = breakdown_for(Scope::Game, observations, test);

    let summary = ResidualSummary {
        total_poss_p1: period_1.overall.count,
        mean_residual_p1: period_1.overall.mean,
        median_residual_p1: period_1.overall.median,
        total_poss_p2: period_2.overall.count,
        mean_residual_p2: period_2.overall.mean,
        median_residual_p2: period_2.overall.median,
        p_value_p2: period_2.overall.p_value,
        total_poss: game.overall.count,
        mean_residual: game.overall.mean,
        median_residual: game.overall.median,
    };
    let verdict = TempoVerdict::from_summary(&summary);

    ResidualAnalysis {
        summary,
        breakdown: ResidualBreakdown {
            period_1,
            period_2,
            game,
        },
        verdict,
    }
}

fn breakdown_for(
    scope: Scope,
    observations: &[ResidualObservation],
    test: &dyn SignificanceTest,
) -> ScopeBreakdown {
    let in_scope: Vec<ResidualObservation> = observations
        .iter()
        .filter(|o| scope.contains(o.period))
        .copied()
        .collect();

    let mut by_cause = BTreeMap::new();
    for cause in StartCause::ALL {
        let cell: Vec<ResidualObservation> =
            in_scope.iter().filter(|o| o.cause == cause).copied().collect();
        if !cell.is_empty() {
            by_cause.insert(cause, ScopeStats::compute(&cell, test));
        }
    }

    ScopeBreakdown {
        overall: ScopeStats::compute(&in_scope, test),
        by_cause,
    }
}

//! Public API surface of the tempo pipeline.
//!
//! This file consolidates the output DTO types consumed by the plot renderer,
//! the game front end and batch analysis scripts. All types derive
//! Serialize/Deserialize for JSON serialization.

pub use crate::algorithms::change_points::ChangePoint;
pub use crate::algorithms::change_points::ShiftDirection;
pub use crate::algorithms::expectation::GameCovariates;
pub use crate::algorithms::kernel::SmoothedPoint;
pub use crate::error::DataQualityIssue;
pub use crate::error::IssueKind;
pub use crate::preprocessing::tfs::Exclusion;
pub use crate::services::efficiency::HalfShooting;
pub use crate::services::efficiency::ShootingEfficiency;
pub use crate::services::residuals::ResidualBreakdown;
pub use crate::services::residuals::ResidualSummary;
pub use crate::services::residuals::ScopeBreakdown;
pub use crate::services::residuals::ScopeStats;
pub use crate::services::residuals::TempoDirection;
pub use crate::services::residuals::TempoVerdict;
pub use crate::services::status::GameStatus;

use serde::{Deserialize, Serialize};

use crate::models::{PossessionStatus, StartCause, Team};

/// One row of the possession table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PossessionRow {
    /// Index in the full possession sequence
    pub index: usize,
    pub period: u32,
    pub team: Option<Team>,
    pub start_cause: StartCause,
    pub start_clock: Option<f64>,
    pub end_clock: Option<f64>,
    pub tfs: Option<f64>,
    pub expected_tfs: Option<f64>,
    pub residual: Option<f64>,
    pub home_score: u32,
    pub away_score: u32,
    pub status: PossessionStatus,
    /// Reason the row is left out of aggregates, if it is
    pub exclusion: Option<Exclusion>,
}

impl PossessionRow {
    /// Contributes an observed TFS to the tempo curve and change points.
    pub fn counts_for_tempo(&self) -> bool {
        self.tfs.is_some() && self.exclusion != Some(Exclusion::PeriodStart)
    }

    /// Contributes a residual to the summary.
    pub fn counts_for_residuals(&self) -> bool {
        self.exclusion.is_none() && self.residual.is_some()
    }
}

/// Observed minus expected smoothed tempo at one grid position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TempoGapPoint {
    pub position: f64,
    pub observed: Option<f64>,
    pub expected: Option<f64>,
    pub gap: Option<f64>,
}

/// Complete per-game output, built in one piece.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameReport {
    pub game_id: Option<String>,
    /// SHA-256 fingerprint of the decoded event stream
    pub checksum: String,
    pub status: GameStatus,
    pub covariates: GameCovariates,
    pub possessions: Vec<PossessionRow>,
    pub curve: Vec<SmoothedPoint>,
    pub expected_curve: Vec<SmoothedPoint>,
    pub tempo_gap: Vec<TempoGapPoint>,
    pub change_points: Vec<ChangePoint>,
    pub summary: ResidualSummary,
    pub breakdown: ResidualBreakdown,
    pub verdict: TempoVerdict,
    pub efficiency: ShootingEfficiency,
    pub issues: Vec<DataQualityIssue>,
}

/// The part of a report a downstream game engine persists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryView {
    pub game_id: Option<String>,
    pub checksum: String,
    pub summary: ResidualSummary,
    pub verdict: TempoVerdict,
}

impl GameReport {
    pub fn summary_view(&self) -> SummaryView {
        SummaryView {
            game_id: self.game_id.clone(),
            checksum: self.checksum.clone(),
            summary: self.summary.clone(),
            verdict: self.verdict.clone(),
        }
    }
}

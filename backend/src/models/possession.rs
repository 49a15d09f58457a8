//! Possession types produced by the segmenter.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;
use std::str::FromStr;

use super::event::Team;

/// What ended the prior possession.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StartCause {
    Rebound,
    Turnover,
    OppoMadeShot,
    OppoMadeFt,
    PeriodStart,
}

impl StartCause {
    pub const ALL: [StartCause; 5] = [
        StartCause::Rebound,
        StartCause::Turnover,
        StartCause::OppoMadeShot,
        StartCause::OppoMadeFt,
        StartCause::PeriodStart,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StartCause::Rebound => "rebound",
            StartCause::Turnover => "turnover",
            StartCause::OppoMadeShot => "oppo_made_shot",
            StartCause::OppoMadeFt => "oppo_made_ft",
            StartCause::PeriodStart => "period_start",
        }
    }
}

impl fmt::Display for StartCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StartCause {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StartCause::ALL
            .iter()
            .copied()
            .find(|cause| cause.as_str() == s.trim().to_lowercase())
            .ok_or_else(|| format!("Unknown possession start cause '{}'", s))
    }
}

/// Whether a possession counts toward TFS statistics.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PossessionStatus {
    Valid,
    /// Last possession of a closed period with no field-goal attempt.
    EndOfPeriodNoShot,
}

/// One team's offensive turn.
///
/// `events` indexes into the event slice the possession was segmented from;
/// the ranges of a game's possessions tile that slice with no gaps.
#[derive(Debug, Clone, PartialEq)]
pub struct Possession {
    pub index: usize,
    pub period: u32,
    /// Offensive team; `None` when no team-attributed action identified it
    pub team: Option<Team>,
    pub start_cause: StartCause,
    /// Seconds remaining in the period when the possession began
    pub start_clock: Option<f64>,
    /// Seconds remaining at the last clocked event of the possession
    pub end_clock: Option<f64>,
    pub events: Range<usize>,
    pub home_score: u32,
    pub away_score: u32,
    pub status: PossessionStatus,
}

impl Possession {
    pub fn is_valid(&self) -> bool {
        self.status == PossessionStatus::Valid
    }

    pub fn event_count(&self) -> usize {
        self.events.len()
    }
}

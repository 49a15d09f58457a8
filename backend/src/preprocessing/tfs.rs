//! Time-to-first-shot extraction.

use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::{DataQualityIssue, IssueKind};
use crate::models::{Possession, PossessionStatus, RawEvent};

/// Why a possession does not contribute to TFS statistics.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Exclusion {
    /// Last possession of a period that ended without a shot attempt
    EndOfPeriod,
    /// The possessing team never attempted a field goal
    NoShot,
    /// Clock data made the TFS value unusable
    DataQuality,
    /// Period-opening possession hidden from statistics by table policy
    PeriodStart,
    /// Expected TFS could not be computed
    MissingCovariate,
}

/// TFS for one possession.
#[derive(Debug, Clone, PartialEq)]
pub struct TfsValue {
    pub possession_index: usize,
    /// Seconds from possession start to the first field-goal attempt
    pub tfs: Option<f64>,
    pub exclusion: Option<Exclusion>,
    /// Event index of the first field-goal attempt
    pub first_shot_event: Option<usize>,
}

impl TfsValue {
    pub fn is_usable(&self) -> bool {
        self.tfs.is_some() && self.exclusion.is_none()
    }
}

/// Output of [`extract_tfs`].
#[derive(Debug, Clone, Default)]
pub struct TfsExtraction {
    pub values: Vec<TfsValue>,
    pub issues: Vec<DataQualityIssue>,
}

/// Compute TFS for every possession, in possession order.
///
/// TFS is only defined when the possessing team attempted a field goal and
/// both the start clock and the shot clock parsed. A negative value means the
/// clock ran backwards; it is reported as a [`IssueKind::NegativeTfs`] issue
/// and the possession is excluded instead of carrying the value forward.
pub fn extract_tfs(possessions: &[Possession], events: &[RawEvent]) -> TfsExtraction {
    let mut extraction = TfsExtraction {
        values: Vec::with_capacity(possessions.len()),
        issues: Vec::new(),
    };

    for possession in possessions {
        let value = tfs_for(possession, events, &mut extraction.issues);
        extraction.values.push(value);
    }

    extraction
}

fn tfs_for(
    possession: &Possession,
    events: &[RawEvent],
    issues: &mut Vec<DataQualityIssue>,
) -> TfsValue {
    let mut value = TfsValue {
        possession_index: possession.index,
        tfs: None,
        exclusion: None,
        first_shot_event: None,
    };

    if possession.status == PossessionStatus::EndOfPeriodNoShot {
        value.exclusion = Some(Exclusion::EndOfPeriod);
        return value;
    }

    let first_shot = possession.team.and_then(|team| {
        events
            .get(possession.events.clone())
            .and_then(|slice| slice.iter().find(|e| e.is_attempt_by(team)))
    });
    let Some(shot) = first_shot else {
        value.exclusion = Some(Exclusion::NoShot);
        return value;
    };
    value.first_shot_event = Some(shot.index);

    let (Some(start), Some(shot_clock)) = (possession.start_clock, shot.clock_remaining) else {
        issues.push(
            DataQualityIssue::new(
                IssueKind::MalformedClock,
                "possession start or first shot has no usable clock",
            )
            .at_period(possession.period)
            .at_possession(possession.index)
            .at_event(shot.index),
        );
        value.exclusion = Some(Exclusion::DataQuality);
        return value;
    };

    let tfs = start - shot_clock;
    if tfs < 0.0 {
        warn!(
            "Negative TFS {:.2}s in possession {} (period {})",
            tfs, possession.index, possession.period
        );
        issues.push(
            DataQualityIssue::new(
                IssueKind::NegativeTfs,
                format!(
                    "start clock {:.2}s is below first shot clock {:.2}s",
                    start, shot_clock
                ),
            )
            .at_period(possession.period)
            .at_possession(possession.index)
            .at_event(shot.index),
        );
        value.exclusion = Some(Exclusion::DataQuality);
        return value;
    }

    value.tfs = Some(tfs);
    value
}

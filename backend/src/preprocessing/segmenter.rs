//! Possession segmentation.
//!
//! Partitions an ordered play-by-play stream into possessions. A possession
//! changes hands on:
//!
//! - a rebound by the team not currently on offense,
//! - a turnover (the ball goes to the other side),
//! - a made field goal or made free throw (the opponent inbounds),
//! - the start of a period.
//!
//! Made baskets and turnovers do not switch possession immediately: the
//! change is held as pending until the next event that can carry play
//! (anything that is not a foul, timeout, substitution or unrecognized entry).
//! A free throw by the scoring team cancels a pending change, which keeps
//! and-ones and multi-shot trips inside the shooting team's possession.
//!
//! A period-start possession takes the clock of the period-start marker, or
//! the full period length when the feed has no marker.

use log::{debug, warn};

use crate::config::ClockSettings;
use crate::error::{DataQualityIssue, IssueKind};
use crate::models::{EventKind, Possession, PossessionStatus, RawEvent, StartCause, Team};

/// Tolerance used when checking that the clock runs down within a period.
const CLOCK_EPSILON: f64 = 1e-6;

/// Output of [`segment_possessions`].
#[derive(Debug, Clone, Default)]
pub struct Segmentation {
    pub possessions: Vec<Possession>,
    pub issues: Vec<DataQualityIssue>,
}

/// Possession in progress.
struct OpenPossession {
    start: usize,
    period: u32,
    team: Option<Team>,
    cause: StartCause,
    start_clock: Option<f64>,
    score: (u32, u32),
}

/// Change of possession waiting for the next live-ball event.
struct PendingChange {
    /// First event index of the new possession
    split_at: usize,
    team: Team,
    /// Team whose basket or turnover triggered the change
    trigger: Team,
    cause: StartCause,
    clock: Option<f64>,
    score: (u32, u32),
    /// Free throws by `trigger` keep the ball with them
    cancel_on_free_throw: bool,
}

struct Segmenter<'a> {
    events: &'a [RawEvent],
    clock: &'a ClockSettings,
    possessions: Vec<Possession>,
    issues: Vec<DataQualityIssue>,
    current: Option<OpenPossession>,
    pending: Option<PendingChange>,
    closed_periods: Vec<u32>,
    last_period: Option<u32>,
    last_clock: Option<f64>,
}

/// Segment an ordered event stream into possessions.
///
/// Every event ends up in exactly one possession and the possessions' event
/// ranges tile `0..events.len()` in order. An empty stream yields an empty
/// segmentation. `clock` supplies period lengths for periods that open
/// without a period-start marker.
///
/// # Examples
///
/// ```
/// use tfs_tempo::config::ClockSettings;
/// use tfs_tempo::preprocessing::segment_possessions;
///
/// let segmentation = segment_possessions(&[], &ClockSettings::default());
/// assert!(segmentation.possessions.is_empty());
/// ```
pub fn segment_possessions(events: &[RawEvent], clock: &ClockSettings) -> Segmentation {
    let mut segmenter = Segmenter {
        events,
        clock,
        possessions: Vec::new(),
        issues: Vec::new(),
        current: None,
        pending: None,
        closed_periods: Vec::new(),
        last_period: None,
        last_clock: None,
    };

    for (i, event) in events.iter().enumerate() {
        segmenter.check_order(i, event);
        segmenter.step(i, event);
    }
    segmenter.close_current(events.len());
    segmenter.mark_end_of_period();

    debug!(
        "Segmented {} events into {} possessions ({} issues)",
        events.len(),
        segmenter.possessions.len(),
        segmenter.issues.len()
    );

    Segmentation {
        possessions: segmenter.possessions,
        issues: segmenter.issues,
    }
}

impl<'a> Segmenter<'a> {
    fn step(&mut self, i: usize, event: &RawEvent) {
        let period_changed = self
            .current
            .as_ref()
            .is_some_and(|open| open.period != event.period);

        if self.current.is_none() || period_changed || event.kind == EventKind::PeriodStart {
            if period_changed {
                if let Some(period) = self.current.as_ref().map(|open| open.period) {
                    self.mark_closed(period);
                }
            }
            self.pending = None;
            self.close_current(i);
            let full_period = self.clock.period_length(event.period);
            let start_clock = if event.kind == EventKind::PeriodStart {
                event.clock_remaining.unwrap_or(full_period)
            } else {
                full_period
            };
            self.open(i, event.period, None, StartCause::PeriodStart, Some(start_clock), event.score());
            if event.kind == EventKind::PeriodStart {
                return;
            }
        }

        if !event.kind.is_administrative() {
            self.resolve_pending(i, event);
        }

        match event.kind {
            EventKind::FieldGoal { made, .. } => {
                let Some(team) = event.team else { return };
                self.claim(team);
                if made {
                    self.hold_change(i, event, team, StartCause::OppoMadeShot, true);
                }
            }
            EventKind::FreeThrow { made } => {
                let Some(team) = event.team else { return };
                self.claim(team);
                if made {
                    self.hold_change(i, event, team, StartCause::OppoMadeFt, true);
                }
            }
            EventKind::Turnover => {
                let offense = event
                    .team
                    .or_else(|| self.current.as_ref().and_then(|open| open.team));
                if let Some(team) = offense {
                    self.claim(team);
                    self.hold_change(i, event, team, StartCause::Turnover, false);
                }
            }
            EventKind::Rebound => {
                let Some(team) = event.team else { return };
                let offense = self.current.as_ref().and_then(|open| open.team);
                match offense {
                    Some(offense) if offense != team => {
                        self.close_current(i);
                        self.open(
                            i,
                            event.period,
                            Some(team),
                            StartCause::Rebound,
                            event.clock_remaining,
                            event.score(),
                        );
                    }
                    Some(_) => {}
                    None => self.claim(team),
                }
            }
            EventKind::JumpBall => {
                if let Some(team) = event.team {
                    self.claim(team);
                }
            }
            EventKind::PeriodEnd | EventKind::GameEnd => self.mark_closed(event.period),
            EventKind::Steal
            | EventKind::Block
            | EventKind::Foul
            | EventKind::Timeout
            | EventKind::Substitution
            | EventKind::PeriodStart
            | EventKind::Unrecognized => {}
        }
    }

    /// Commit or cancel a pending change before a live-ball event is applied.
    fn resolve_pending(&mut self, i: usize, event: &RawEvent) {
        let Some(pending) = self.pending.take() else {
            return;
        };

        let continues_trip = pending.cancel_on_free_throw
            && matches!(event.kind, EventKind::FreeThrow { .. })
            && event.team == Some(pending.trigger);
        if continues_trip {
            return;
        }

        debug_assert!(pending.split_at <= i);
        self.close_current(pending.split_at);
        self.open(
            pending.split_at,
            event.period,
            Some(pending.team),
            pending.cause,
            pending.clock,
            pending.score,
        );
    }

    fn hold_change(
        &mut self,
        i: usize,
        event: &RawEvent,
        trigger: Team,
        cause: StartCause,
        cancel_on_free_throw: bool,
    ) {
        self.pending = Some(PendingChange {
            split_at: i + 1,
            team: trigger.other(),
            trigger,
            cause,
            clock: event.clock_remaining,
            score: event.score(),
            cancel_on_free_throw,
        });
    }

    /// Attribute the open possession to `team` if nobody holds it yet.
    fn claim(&mut self, team: Team) {
        if let Some(open) = self.current.as_mut() {
            if open.team.is_none() {
                open.team = Some(team);
            }
        }
    }

    fn open(
        &mut self,
        start: usize,
        period: u32,
        team: Option<Team>,
        cause: StartCause,
        start_clock: Option<f64>,
        score: (u32, u32),
    ) {
        self.current = Some(OpenPossession {
            start,
            period,
            team,
            cause,
            start_clock,
            score,
        });
    }

    /// Close the open possession at `end` (exclusive). Empty ranges are
    /// discarded so the partition never contains event-less possessions.
    fn close_current(&mut self, end: usize) {
        let Some(open) = self.current.take() else {
            return;
        };
        if end <= open.start {
            return;
        }

        let end_clock = self.events[open.start..end]
            .iter()
            .rev()
            .find_map(|e| e.clock_remaining);

        self.possessions.push(Possession {
            index: self.possessions.len(),
            period: open.period,
            team: open.team,
            start_cause: open.cause,
            start_clock: open.start_clock,
            end_clock,
            events: open.start..end,
            home_score: open.score.0,
            away_score: open.score.1,
            status: PossessionStatus::Valid,
        });
    }

    fn mark_closed(&mut self, period: u32) {
        if !self.closed_periods.contains(&period) {
            self.closed_periods.push(period);
        }
    }

    fn check_order(&mut self, i: usize, event: &RawEvent) {
        if let Some(last_period) = self.last_period {
            if event.period < last_period {
                warn!(
                    "Event {} goes back from period {} to period {}",
                    i, last_period, event.period
                );
                self.issues.push(
                    DataQualityIssue::new(
                        IssueKind::ClockOutOfOrder,
                        format!("period went back from {} to {}", last_period, event.period),
                    )
                    .at_period(event.period)
                    .at_event(i),
                );
            }
            if event.period != last_period {
                self.last_clock = None;
            }
        }
        self.last_period = Some(event.period);

        let Some(clock) = event.clock_remaining else {
            return;
        };
        if let Some(last) = self.last_clock {
            if clock > last + CLOCK_EPSILON {
                self.issues.push(
                    DataQualityIssue::new(
                        IssueKind::ClockOutOfOrder,
                        format!("clock went up from {:.1}s to {:.1}s", last, clock),
                    )
                    .at_period(event.period)
                    .at_event(i),
                );
            }
        }
        self.last_clock = Some(clock);
    }

    /// Flag the last possession of each closed period when its team never
    /// attempted a field goal.
    fn mark_end_of_period(&mut self) {
        let max_period = self.possessions.iter().map(|p| p.period).max();
        let events = self.events;

        for idx in 0..self.possessions.len() {
            let period = self.possessions[idx].period;
            let is_last_in_period = self
                .possessions
                .get(idx + 1)
                .map_or(true, |next| next.period != period);
            if !is_last_in_period {
                continue;
            }

            let period_closed =
                self.closed_periods.contains(&period) || max_period.is_some_and(|max| period < max);
            if !period_closed {
                continue;
            }

            let possession = &mut self.possessions[idx];
            let shot_taken = possession.team.is_some_and(|team| {
                events[possession.events.clone()]
                    .iter()
                    .any(|e| e.is_attempt_by(team))
            });
            if !shot_taken {
                possession.status = PossessionStatus::EndOfPeriodNoShot;
            }
        }
    }
}

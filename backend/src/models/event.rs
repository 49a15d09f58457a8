//! Play-by-play event types.
//!
//! A [`RawEvent`] is one decoded play-by-play entry. Events are immutable once
//! decoded; the segmenter only ever reads them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Side of the court an event is attributed to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Team {
    Home,
    Away,
}

impl Team {
    /// The opposing side.
    pub fn other(self) -> Team {
        match self {
            Team::Home => Team::Away,
            Team::Away => Team::Home,
        }
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Team::Home => write!(f, "home"),
            Team::Away => write!(f, "away"),
        }
    }
}

impl FromStr for Team {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "home" | "h" => Ok(Team::Home),
            "away" | "a" | "visitor" | "road" => Ok(Team::Away),
            other => Err(format!("Unknown team side '{}'", other)),
        }
    }
}

/// Classified play-by-play event.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum EventKind {
    FieldGoal { made: bool, three: bool },
    FreeThrow { made: bool },
    Rebound,
    Turnover,
    Steal,
    Block,
    Foul,
    Timeout,
    Substitution,
    JumpBall,
    PeriodStart,
    PeriodEnd,
    GameEnd,
    /// Kept in the stream for continuity but never moves a possession boundary.
    Unrecognized,
}

impl EventKind {
    /// Classify a provider event type/subtype pair.
    ///
    /// Matching is case-insensitive and treats spaces and hyphens as
    /// underscores. Shot outcome is read from the type (`made_shot`,
    /// `missed_shot`) or from the subtype (`made`, `missed`, `miss`, `make`).
    pub fn classify(event_type: &str, event_subtype: Option<&str>) -> EventKind {
        let kind = normalize_label(event_type);
        let subtype = event_subtype.map(normalize_label).unwrap_or_default();

        match kind.as_str() {
            "made_shot" | "field_goal_made" | "fgm" => EventKind::FieldGoal {
                made: true,
                three: is_three(&kind, &subtype),
            },
            "missed_shot" | "field_goal_missed" | "fga_missed" => EventKind::FieldGoal {
                made: false,
                three: is_three(&kind, &subtype),
            },
            "shot" | "field_goal" | "jump_shot" | "jumper" | "layup" | "dunk" | "tip_shot"
            | "hook_shot" | "three_point_jumper" | "two_point_jumper" => {
                match shot_outcome(&subtype) {
                    Some(made) => EventKind::FieldGoal {
                        made,
                        three: is_three(&kind, &subtype),
                    },
                    None => EventKind::Unrecognized,
                }
            }
            "free_throw" | "freethrow" | "ft" => match shot_outcome(&subtype) {
                Some(made) => EventKind::FreeThrow { made },
                None => EventKind::Unrecognized,
            },
            "made_free_throw" => EventKind::FreeThrow { made: true },
            "missed_free_throw" => EventKind::FreeThrow { made: false },
            "rebound" | "offensive_rebound" | "defensive_rebound" => EventKind::Rebound,
            "turnover" | "lost_ball" | "bad_pass" | "traveling" => EventKind::Turnover,
            "steal" => EventKind::Steal,
            "block" | "blocked_shot" => EventKind::Block,
            "foul" | "personal_foul" | "shooting_foul" | "technical_foul" | "offensive_foul" => {
                EventKind::Foul
            }
            "timeout" | "official_timeout" | "tv_timeout" | "full_timeout" | "media_timeout" => {
                EventKind::Timeout
            }
            "substitution" | "sub" => EventKind::Substitution,
            "jump_ball" | "jumpball" => EventKind::JumpBall,
            "period_start" | "start_period" | "start_of_period" => EventKind::PeriodStart,
            "period_end" | "end_period" | "end_of_period" => EventKind::PeriodEnd,
            "game_end" | "end_game" | "end_of_game" => EventKind::GameEnd,
            _ => EventKind::Unrecognized,
        }
    }

    /// Field-goal attempt, made or missed.
    pub fn is_field_goal_attempt(&self) -> bool {
        matches!(self, EventKind::FieldGoal { .. })
    }

    /// Clock-administrative events never open a possession.
    pub fn is_administrative(&self) -> bool {
        matches!(
            self,
            EventKind::Foul
                | EventKind::Timeout
                | EventKind::Substitution
                | EventKind::Steal
                | EventKind::Block
                | EventKind::Unrecognized
        )
    }

    /// End of a period (or of the game).
    pub fn closes_period(&self) -> bool {
        matches!(self, EventKind::PeriodEnd | EventKind::GameEnd)
    }
}

fn normalize_label(label: &str) -> String {
    label
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c == ' ' || c == '-' { '_' } else { c })
        .collect()
}

fn shot_outcome(subtype: &str) -> Option<bool> {
    if subtype.contains("missed") || subtype.contains("miss") {
        Some(false)
    } else if subtype.contains("made") || subtype.contains("make") || subtype.contains("good") {
        Some(true)
    } else {
        None
    }
}

fn is_three(kind: &str, subtype: &str) -> bool {
    [kind, subtype]
        .iter()
        .any(|s| s.contains("three") || s.contains("3pt") || s.contains("3_pt"))
}

/// One decoded play-by-play entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEvent {
    /// Position in the decoded stream
    pub index: usize,
    pub period: u32,
    /// Seconds remaining in the period; `None` when the clock field was malformed
    pub clock_remaining: Option<f64>,
    pub kind: EventKind,
    pub team: Option<Team>,
    pub home_score: u32,
    pub away_score: u32,
    /// Provider label, kept for diagnostics
    pub label: String,
}

impl RawEvent {
    /// Field-goal attempt by `team`.
    pub fn is_attempt_by(&self, team: Team) -> bool {
        self.kind.is_field_goal_attempt() && self.team == Some(team)
    }

    pub fn score(&self) -> (u32, u32) {
        (self.home_score, self.away_score)
    }
}

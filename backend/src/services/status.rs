//! Game status derived from the play-by-play stream.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::{EventKind, RawEvent};

/// Where a game stands, as far as the stream shows.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    NotStarted,
    FirstHalf,
    Halftime,
    SecondHalf,
    Final,
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            GameStatus::NotStarted => "Not Started",
            GameStatus::FirstHalf => "First Half",
            GameStatus::Halftime => "Halftime",
            GameStatus::SecondHalf => "Second Half",
            GameStatus::Final => "Final",
        };
        f.write_str(label)
    }
}

/// Classify the game from its events.
///
/// A game is final once a game-end marker appears, or once a period at or
/// beyond `regulation_periods` ends with the scores apart.
pub fn classify_game_status(events: &[RawEvent], regulation_periods: u32) -> GameStatus {
    let live: Vec<&RawEvent> = events
        .iter()
        .filter(|e| e.kind != EventKind::PeriodStart)
        .collect();
    let Some(last) = live.last() else {
        return GameStatus::NotStarted;
    };

    if live.iter().any(|e| e.kind == EventKind::GameEnd) {
        return GameStatus::Final;
    }

    let max_period = events.iter().map(|e| e.period).max().unwrap_or(last.period);
    if max_period <= 1 {
        if last.kind == EventKind::PeriodEnd {
            return GameStatus::Halftime;
        }
        return GameStatus::FirstHalf;
    }

    let regulation_over = last.period >= regulation_periods.max(2)
        && last.kind == EventKind::PeriodEnd
        && last.home_score != last.away_score;
    if regulation_over {
        GameStatus::Final
    } else {
        GameStatus::SecondHalf
    }
}

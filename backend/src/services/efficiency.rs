//! Effective field-goal percentage by half.

use serde::{Deserialize, Serialize};

use crate::models::{EventKind, RawEvent};

/// Shooting totals for one half, both teams combined.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HalfShooting {
    pub field_goals_made: u32,
    pub field_goals_attempted: u32,
    pub threes_made: u32,
    /// `(FGM + 0.5 * 3PM) / FGA`; `None` without attempts
    pub efg: Option<f64>,
}

/// eFG% for period 1 and for period 2 onwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShootingEfficiency {
    pub first_half: HalfShooting,
    pub second_half: HalfShooting,
}

/// Compute eFG% per half from the event stream.
pub fn efg_by_half(events: &[RawEvent]) -> ShootingEfficiency {
    let mut efficiency = ShootingEfficiency::default();

    for event in events {
        let EventKind::FieldGoal { made, three } = event.kind else {
            continue;
        };
        let half = if event.period <= 1 {
            &mut efficiency.first_half
        } else {
            &mut efficiency.second_half
        };
        half.field_goals_attempted += 1;
        if made {
            half.field_goals_made += 1;
            if three {
                half.threes_made += 1;
            }
        }
    }

    for half in [&mut efficiency.first_half, &mut efficiency.second_half] {
        if half.field_goals_attempted > 0 {
            half.efg = Some(
                (half.field_goals_made as f64 + 0.5 * half.threes_made as f64)
                    / half.field_goals_attempted as f64,
            );
        }
    }

    efficiency
}

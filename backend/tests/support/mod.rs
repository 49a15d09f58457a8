#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Mutex;

use serde_json::json;
use tfs_tempo::models::{EventKind, RawEvent, Team};

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Runs `f` with environment variables temporarily modified.
///
/// This is panic-safe (restores variables on unwind) and also serializes access to
/// process-global env vars to avoid flaky tests when Rust runs tests in parallel.
///
/// `changes` is a list of `(key, value)` pairs:
/// - `Some(v)` sets the variable to `v`
/// - `None` removes the variable
pub fn with_scoped_env<F, R>(changes: &[(&str, Option<&str>)], f: F) -> R
where
    F: FnOnce() -> R,
{
    let _lock = ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    let _guard = ScopedEnv::new(changes);
    f()
}

struct ScopedEnv {
    snapshot: Vec<(String, Option<String>)>,
}

impl ScopedEnv {
    fn new(changes: &[(&str, Option<&str>)]) -> Self {
        let keys: HashSet<&str> = changes.iter().map(|(k, _)| *k).collect();
        let snapshot = keys
            .into_iter()
            .map(|k| (k.to_string(), std::env::var(k).ok()))
            .collect::<Vec<_>>();

        for (k, v) in changes {
            match v {
                Some(val) => std::env::set_var(k, val),
                None => std::env::remove_var(k),
            }
        }

        Self { snapshot }
    }
}

impl Drop for ScopedEnv {
    fn drop(&mut self) {
        for (k, v) in self.snapshot.drain(..) {
            match v {
                Some(val) => std::env::set_var(&k, val),
                None => std::env::remove_var(&k),
            }
        }
    }
}

pub const MISS: EventKind = EventKind::FieldGoal {
    made: false,
    three: false,
};

pub const MAKE: EventKind = EventKind::FieldGoal {
    made: true,
    three: false,
};

pub const MAKE_THREE: EventKind = EventKind::FieldGoal {
    made: true,
    three: true,
};

/// Scripted play-by-play builder. Clocks count down from the period length
/// and scores follow made baskets.
pub struct GameBuilder {
    events: Vec<RawEvent>,
    period: u32,
    clock: f64,
    home: u32,
    away: u32,
}

impl GameBuilder {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            period: 1,
            clock: 1200.0,
            home: 0,
            away: 0,
        }
    }

    pub fn start_period(&mut self, period: u32) -> &mut Self {
        self.period = period;
        self.clock = if period <= 2 { 1200.0 } else { 300.0 };
        self.record(EventKind::PeriodStart, None)
    }

    /// Run the clock down by `dt` seconds, then record `kind`.
    pub fn after(&mut self, dt: f64, kind: EventKind, team: Option<Team>) -> &mut Self {
        self.clock = (self.clock - dt).max(0.0);
        self.record(kind, team)
    }

    pub fn end_period(&mut self) -> &mut Self {
        self.clock = 0.0;
        self.record(EventKind::PeriodEnd, None)
    }

    pub fn end_game(&mut self) -> &mut Self {
        self.clock = 0.0;
        self.record(EventKind::GameEnd, None)
    }

    fn record(&mut self, kind: EventKind, team: Option<Team>) -> &mut Self {
        let points = match kind {
            EventKind::FieldGoal { made: true, three } => {
                if three {
                    3
                } else {
                    2
                }
            }
            EventKind::FreeThrow { made: true } => 1,
            _ => 0,
        };
        match team {
            Some(Team::Home) => self.home += points,
            Some(Team::Away) => self.away += points,
            None => {}
        }
        self.events.push(RawEvent {
            index: self.events.len(),
            period: self.period,
            clock_remaining: Some(self.clock),
            kind,
            team,
            home_score: self.home,
            away_score: self.away,
            label: format!("{:?}", kind),
        });
        self
    }

    pub fn build(&self) -> Vec<RawEvent> {
        self.events.clone()
    }

    /// Provider-shaped JSON records for the same events.
    pub fn to_json_records(&self) -> Vec<serde_json::Value> {
        self.events
            .iter()
            .map(|e| {
                let (event_type, subtype, shot_value) = match e.kind {
                    EventKind::FieldGoal { made, three } => (
                        if made { "made_shot" } else { "missed_shot" },
                        None,
                        Some(if three { 3 } else { 2 }),
                    ),
                    EventKind::FreeThrow { made } => {
                        ("free_throw", Some(if made { "made" } else { "missed" }), None)
                    }
                    EventKind::Rebound => ("rebound", None, None),
                    EventKind::Turnover => ("turnover", None, None),
                    EventKind::Steal => ("steal", None, None),
                    EventKind::Block => ("block", None, None),
                    EventKind::Foul => ("foul", None, None),
                    EventKind::Timeout => ("timeout", None, None),
                    EventKind::Substitution => ("substitution", None, None),
                    EventKind::JumpBall => ("jump_ball", None, None),
                    EventKind::PeriodStart => ("period_start", None, None),
                    EventKind::PeriodEnd => ("period_end", None, None),
                    EventKind::GameEnd => ("game_end", None, None),
                    EventKind::Unrecognized => ("mascot_dance", None, None),
                };
                json!({
                    "period": e.period,
                    "clock_value": e.clock_remaining,
                    "event_type": event_type,
                    "event_subtype": subtype,
                    "acting_team": e.team.map(|t| t.to_string()),
                    "home_score": e.home_score,
                    "away_score": e.away_score,
                    "shot_value": shot_value,
                })
            })
            .collect()
    }
}

impl Default for GameBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Append one half in which every possession ends in a missed shot and a
/// defensive rebound. `tfs[i]` is the TFS of the i-th possession; the half
/// ends on a rebound, so its last possession has no shot.
pub fn rebound_half(builder: &mut GameBuilder, period: u32, tfs: &[f64]) {
    builder.start_period(period);
    let mut team = Team::Home;
    builder.after(0.0, EventKind::JumpBall, Some(team));
    for &t in tfs {
        builder.after(t, MISS, Some(team));
        team = team.other();
        builder.after(0.0, EventKind::Rebound, Some(team));
    }
    builder.end_period();
}

/// Two-half game built from [`rebound_half`].
pub fn rebound_game(tfs_p1: &[f64], tfs_p2: &[f64]) -> Vec<RawEvent> {
    let mut builder = GameBuilder::new();
    rebound_half(&mut builder, 1, tfs_p1);
    if !tfs_p2.is_empty() {
        rebound_half(&mut builder, 2, tfs_p2);
    }
    builder.end_game();
    builder.build()
}

// ============================================================================
// Play-by-play JSON decoding
// ============================================================================
//
// Accepts either a bare array of event records or an envelope carrying the
// game id and closing total next to the events. Record-level problems
// (malformed clock, period, score or event type) are reported as data-quality
// issues rather than failing the whole game; only structurally invalid JSON is
// an error.

use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

use super::clock::parse_clock_value;
use crate::error::{DataQualityIssue, IssueKind};
use crate::models::{EventKind, RawEvent, Team};

/// One provider play-by-play record, as delivered.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventRecord {
    #[serde(default, alias = "period_number")]
    pub period: Value,
    #[serde(default, alias = "clock")]
    pub clock_value: Value,
    #[serde(default, alias = "type")]
    pub event_type: Value,
    #[serde(default, alias = "subtype")]
    pub event_subtype: Value,
    #[serde(default, alias = "team")]
    pub acting_team: Value,
    #[serde(default)]
    pub home_score: Value,
    #[serde(default)]
    pub away_score: Value,
    /// 2 or 3 for field goals when the provider reports it
    #[serde(default)]
    pub shot_value: Value,
}

#[derive(Debug, Deserialize)]
struct GameEnvelope {
    #[serde(default)]
    game_id: Option<String>,
    #[serde(default)]
    closing_total: Option<f64>,
    events: Vec<EventRecord>,
}

/// A decoded game ready for analysis.
#[derive(Debug, Clone)]
pub struct DecodedGame {
    pub game_id: Option<String>,
    pub closing_total: Option<f64>,
    pub events: Vec<RawEvent>,
    pub issues: Vec<DataQualityIssue>,
}

/// Parse a play-by-play JSON file.
pub fn parse_game_json(path: &Path) -> Result<DecodedGame> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read play-by-play file: {}", path.display()))?;

    parse_game_json_str(&content)
}

/// Parse play-by-play JSON from a string.
pub fn parse_game_json_str(content: &str) -> Result<DecodedGame> {
    let value: Value = serde_json::from_str(content).with_context(|| {
        let preview: String = content.chars().take(200).collect();
        format!("Invalid JSON syntax. First 200 chars: {}", preview)
    })?;

    let envelope = match value {
        Value::Array(_) => {
            let events: Vec<EventRecord> = serde_path_to_error::deserialize(value)
                .map_err(|e| anyhow::anyhow!("Invalid event record at {}: {}", e.path(), e.inner()))?;
            GameEnvelope {
                game_id: None,
                closing_total: None,
                events,
            }
        }
        Value::Object(ref obj) if obj.contains_key("events") => {
            serde_path_to_error::deserialize(value)
                .map_err(|e| anyhow::anyhow!("Invalid game envelope at {}: {}", e.path(), e.inner()))?
        }
        Value::Object(obj) => anyhow::bail!(
            "Game JSON object must contain an 'events' key. Found keys: {:?}",
            obj.keys().collect::<Vec<_>>()
        ),
        _ => anyhow::bail!("Game JSON must be an array of events or an object with 'events'"),
    };

    let (events, issues) = decode_records(&envelope.events);

    Ok(DecodedGame {
        game_id: envelope.game_id,
        closing_total: envelope.closing_total,
        events,
        issues,
    })
}

/// Convert provider records into [`RawEvent`]s.
///
/// Records with an unusable period are dropped; everything else is kept so
/// that the possession partition covers the full stream. Missing scores carry
/// the last known running score forward.
pub fn decode_records(records: &[EventRecord]) -> (Vec<RawEvent>, Vec<DataQualityIssue>) {
    let mut events = Vec::with_capacity(records.len());
    let mut issues = Vec::new();
    let mut home_score = 0;
    let mut away_score = 0;

    for (record_idx, record) in records.iter().enumerate() {
        let period = match parse_period(&record.period) {
            Ok(p) => p,
            Err(e) => {
                warn!("Dropping record {}: {}", record_idx, e);
                issues.push(
                    DataQualityIssue::new(
                        IssueKind::MalformedPeriod,
                        format!("record {}: {}", record_idx, e),
                    )
                    .at_event(record_idx),
                );
                continue;
            }
        };

        let index = events.len();

        let clock_remaining = match parse_clock_value(&record.clock_value) {
            Ok(c) => Some(c),
            Err(e) => {
                issues.push(
                    DataQualityIssue::new(IssueKind::MalformedClock, format!("record {}: {}", record_idx, e))
                        .at_period(period)
                        .at_event(index),
                );
                None
            }
        };

        let event_type = text_field(&record.event_type);
        let mut kind = match event_type {
            Some(t) => EventKind::classify(t, text_field(&record.event_subtype)),
            None => EventKind::Unrecognized,
        };
        if let EventKind::FieldGoal { made, three } = kind {
            kind = EventKind::FieldGoal {
                made,
                three: three || record.shot_value.as_u64() == Some(3),
            };
        }
        if kind == EventKind::Unrecognized {
            let message = match event_type {
                Some(t) => format!("record {}: unrecognized event type '{}'", record_idx, t),
                None => format!("record {}: missing event type ({})", record_idx, record.event_type),
            };
            issues.push(
                DataQualityIssue::new(IssueKind::UnrecognizedEvent, message)
                    .at_period(period)
                    .at_event(index),
            );
        }

        let team = text_field(&record.acting_team).and_then(|t| t.parse::<Team>().ok());
        if team.is_none() && kind.is_field_goal_attempt() {
            issues.push(
                DataQualityIssue::new(
                    IssueKind::UnattributedShot,
                    format!("record {}: field goal attempt without a team", record_idx),
                )
                .at_period(period)
                .at_event(index),
            );
        }

        for (value, running) in [
            (&record.home_score, &mut home_score),
            (&record.away_score, &mut away_score),
        ] {
            match parse_score(value) {
                Ok(Some(score)) => *running = score,
                Ok(None) => {}
                Err(e) => issues.push(
                    DataQualityIssue::new(IssueKind::MalformedScore, format!("record {}: {}", record_idx, e))
                        .at_period(period)
                        .at_event(index),
                ),
            }
        }

        events.push(RawEvent {
            index,
            period,
            clock_remaining,
            kind,
            team,
            home_score,
            away_score,
            label: event_type.unwrap_or_default().to_string(),
        });
    }

    (events, issues)
}

fn parse_period(value: &Value) -> std::result::Result<u32, String> {
    let period = match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    match period {
        Some(p) if p >= 1 && p <= u32::MAX as u64 => Ok(p as u32),
        _ => Err(format!("invalid period value {}", value)),
    }
}

fn text_field(value: &Value) -> Option<&str> {
    value.as_str().map(str::trim).filter(|s| !s.is_empty())
}

/// A running score. Null or absent means "not reported"; integral numbers and
/// numeric strings are accepted.
fn parse_score(value: &Value) -> std::result::Result<Option<u32>, String> {
    let score = match value {
        Value::Null => return Ok(None),
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0 && *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    score
        .and_then(|s| u32::try_from(s).ok())
        .map(Some)
        .ok_or_else(|| format!("invalid score value {}", value))
}

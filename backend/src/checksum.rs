//! Input fingerprints.
//!
//! A persisted summary stores the fingerprint of the event stream it was
//! computed from so a reloading process can tell whether it is stale.

use sha2::{Digest, Sha256};

use crate::models::RawEvent;

/// Calculate SHA-256 checksum of a decoded event stream.
///
/// Only the fields that drive the analysis are hashed, so two encodings of
/// the same game produce the same fingerprint.
pub fn events_checksum(events: &[RawEvent]) -> String {
    let mut hasher = Sha256::new();
    for event in events {
        let clock = event
            .clock_remaining
            .map(|c| format!("{:.3}", c))
            .unwrap_or_else(|| "-".to_string());
        let team = event.team.map(|t| t.to_string()).unwrap_or_default();
        hasher.update(
            format!(
                "{}|{}|{:?}|{}|{}|{}\n",
                event.period, clock, event.kind, team, event.home_score, event.away_score
            )
            .as_bytes(),
        );
    }
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EventKind, Team};

    fn event(clock: f64) -> RawEvent {
        RawEvent {
            index: 0,
            period: 1,
            clock_remaining: Some(clock),
            kind: EventKind::Rebound,
            team: Some(Team::Home),
            home_score: 0,
            away_score: 0,
            label: "rebound".to_string(),
        }
    }

    #[test]
    fn test_events_checksum_is_hex_sha256() {
        let checksum = events_checksum(&[event(100.0)]);
        assert_eq!(checksum.len(), 64);
        assert!(checksum.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(checksum, events_checksum(&[event(100.0)]));
    }

    #[test]
    fn test_events_checksum_ignores_labels() {
        let a = event(100.0);
        let mut b = event(100.0);
        b.label = "Defensive Rebound".to_string();
        assert_eq!(events_checksum(&[a.clone()]), events_checksum(&[b]));
        assert_ne!(events_checksum(&[a]), events_checksum(&[event(99.0)]));
    }
}

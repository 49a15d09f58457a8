//! End-to-end tests of the per-game tempo pipeline.

mod support;

use serde_json::json;
use support::{rebound_game, GameBuilder, MAKE, MISS};
use tfs_tempo::algorithms::change_points::CusumScale;
use tfs_tempo::algorithms::descriptive::mean;
use tfs_tempo::algorithms::expectation::expected_tfs;
use tfs_tempo::algorithms::significance::SignificanceMethod;
use tfs_tempo::api::{Exclusion, GameStatus, IssueKind, ShiftDirection, TempoDirection};
use tfs_tempo::config::{AnalysisConfig, PeriodStartPolicy, PositionAxis};
use tfs_tempo::models::{EventKind, PossessionStatus, StartCause, Team};
use tfs_tempo::services::{analyze_game, analyze_game_json};
use tfs_tempo::TempoError;

const HOME: Option<Team> = Some(Team::Home);
const AWAY: Option<Team> = Some(Team::Away);

/// One possession of every start cause in a single half:
/// made basket, foul, turnover, and-one, defensive rebounds.
fn mixed_first_half() -> GameBuilder {
    let mut game = GameBuilder::new();
    game.start_period(1)
        .after(0.0, EventKind::JumpBall, HOME)
        .after(8.0, MAKE, HOME)
        .after(3.0, EventKind::Foul, HOME)
        .after(14.0, MISS, AWAY)
        .after(0.0, EventKind::Rebound, AWAY)
        .after(6.0, EventKind::Turnover, AWAY)
        .after(0.0, EventKind::Steal, HOME)
        .after(10.0, MAKE, HOME)
        .after(0.0, EventKind::Foul, AWAY)
        .after(0.0, EventKind::FreeThrow { made: true }, HOME)
        .after(12.0, MISS, AWAY)
        .after(0.0, EventKind::Rebound, HOME)
        .after(9.0, MISS, HOME)
        .after(0.0, EventKind::Rebound, AWAY)
        .end_period();
    game
}

#[test]
fn test_mixed_half_causes_and_tfs() {
    let events = mixed_first_half().build();
    let report = analyze_game(&events, Some(140.0), &AnalysisConfig::default()).unwrap();

    let causes: Vec<StartCause> = report.possessions.iter().map(|r| r.start_cause).collect();
    assert_eq!(
        causes,
        vec![
            StartCause::PeriodStart,
            StartCause::OppoMadeShot,
            StartCause::Turnover,
            StartCause::OppoMadeFt,
            StartCause::Rebound,
            StartCause::Rebound,
        ]
    );

    let tfs: Vec<Option<f64>> = report.possessions.iter().map(|r| r.tfs).collect();
    assert_eq!(
        tfs,
        vec![Some(8.0), Some(17.0), Some(10.0), Some(12.0), Some(9.0), None]
    );

    let teams: Vec<Option<Team>> = report.possessions.iter().map(|r| r.team).collect();
    assert_eq!(teams, vec![HOME, AWAY, HOME, AWAY, HOME, AWAY]);

    let last = report.possessions.last().unwrap();
    assert_eq!(last.status, PossessionStatus::EndOfPeriodNoShot);
    assert_eq!(last.exclusion, Some(Exclusion::EndOfPeriod));

    // The and-one free throw is scored before the ball changes hands
    assert_eq!(report.possessions[3].home_score, 5);
    assert_eq!(report.possessions[3].start_clock, Some(1159.0));

    let turnover = &report.possessions[2];
    assert!((turnover.expected_tfs.unwrap() - 13.7872).abs() < 1e-6);
    assert!((turnover.residual.unwrap() - (10.0 - 13.7872)).abs() < 1e-6);

    assert_eq!(report.efficiency.first_half.field_goals_attempted, 5);
    assert_eq!(report.efficiency.first_half.field_goals_made, 2);
    assert!(report.issues.is_empty(), "{:?}", report.issues);
}

#[test]
fn test_residuals_are_exact_and_summaries_consistent() {
    let p1 = [14.0, 9.0, 22.0, 11.0, 17.0, 6.0, 13.0, 19.0];
    let p2 = [21.0, 16.0, 18.0, 25.0, 12.0, 20.0, 23.0];
    let events = rebound_game(&p1, &p2);
    let report = analyze_game(&events, Some(145.5), &AnalysisConfig::default()).unwrap();

    assert_eq!(report.possessions.len(), (p1.len() + 1) + (p2.len() + 1));

    for row in &report.possessions {
        if let (Some(tfs), Some(expected)) = (row.tfs, row.expected_tfs) {
            let residual = row.residual.unwrap();
            assert!((residual - (tfs - expected)).abs() < 1e-12);
            let model = expected_tfs(row.period, row.start_cause, &report.covariates).unwrap();
            assert!((model - expected).abs() < 1e-12);
        } else {
            assert!(row.residual.is_none());
        }
    }

    let residuals_in = |period: u32| -> Vec<f64> {
        report
            .possessions
            .iter()
            .filter(|r| r.period == period && r.counts_for_residuals())
            .filter_map(|r| r.residual)
            .collect()
    };
    let p1_residuals = residuals_in(1);
    let p2_residuals = residuals_in(2);

    let summary = &report.summary;
    assert_eq!(summary.total_poss_p1, p1.len() - 1);
    assert_eq!(summary.total_poss_p2, p2.len() - 1);
    assert_eq!(summary.total_poss, summary.total_poss_p1 + summary.total_poss_p2);
    assert!((summary.mean_residual_p1.unwrap() - mean(&p1_residuals).unwrap()).abs() < 1e-9);
    assert!((summary.mean_residual_p2.unwrap() - mean(&p2_residuals).unwrap()).abs() < 1e-9);

    let n1 = p1_residuals.len() as f64;
    let n2 = p2_residuals.len() as f64;
    let pooled = (summary.mean_residual_p1.unwrap() * n1 + summary.mean_residual_p2.unwrap() * n2)
        / (n1 + n2);
    assert!((summary.mean_residual.unwrap() - pooled).abs() < 1e-9);

    assert_eq!(report.breakdown.game.overall.count, summary.total_poss);
    assert_eq!(
        report.breakdown.period_2.by_cause[&StartCause::Rebound].count,
        summary.total_poss_p2
    );
}

#[test]
fn test_period_start_excluded_from_stats_by_default() {
    let events = rebound_game(&[12.0; 6], &[14.0; 6]);
    let report = analyze_game(&events, Some(140.0), &AnalysisConfig::default()).unwrap();

    let opening: Vec<_> = report
        .possessions
        .iter()
        .filter(|r| r.start_cause == StartCause::PeriodStart)
        .collect();
    assert_eq!(opening.len(), 2);
    for row in opening {
        assert_eq!(row.tfs, Some(if row.period == 1 { 12.0 } else { 14.0 }));
        assert_eq!(row.exclusion, Some(Exclusion::PeriodStart));
        assert!(!row.counts_for_tempo());
        assert!(!row.counts_for_residuals());
    }
    assert_eq!(report.summary.total_poss_p1, 5);
    assert_eq!(report.summary.total_poss_p2, 5);
}

#[test]
fn test_period_start_policies() {
    let events = rebound_game(&[12.0; 6], &[14.0; 6]);

    let mut config = AnalysisConfig::default();
    config.table.period_start = PeriodStartPolicy::Include;
    let included = analyze_game(&events, Some(140.0), &config).unwrap();
    assert_eq!(included.possessions.len(), 14);
    assert_eq!(included.summary.total_poss_p1, 6);
    assert_eq!(included.summary.total_poss_p2, 6);
    let opening = &included.possessions[0];
    assert_eq!(opening.start_cause, StartCause::PeriodStart);
    assert!(opening.exclusion.is_none());
    let rebound_expected = expected_tfs(1, StartCause::Rebound, &included.covariates);
    assert_eq!(opening.expected_tfs, rebound_expected);

    config.table.period_start = PeriodStartPolicy::Hide;
    let hidden = analyze_game(&events, Some(140.0), &config).unwrap();
    assert_eq!(hidden.possessions.len(), 12);
    assert!(hidden
        .possessions
        .iter()
        .all(|r| r.start_cause != StartCause::PeriodStart));
    assert_eq!(hidden.summary.total_poss_p1, 5);
}

#[test]
fn test_missing_closing_total_keeps_curve_but_no_verdict() {
    let events = rebound_game(&[12.0; 8], &[18.0; 8]);
    let report = analyze_game(&events, None, &AnalysisConfig::default()).unwrap();

    assert!(report.covariates.closing_total.is_none());
    assert!(report.possessions.iter().all(|r| r.expected_tfs.is_none()));
    assert!(report.possessions.iter().all(|r| r.residual.is_none()));
    assert!(report
        .possessions
        .iter()
        .any(|r| r.exclusion == Some(Exclusion::MissingCovariate)));

    assert!(!report.curve.is_empty());
    assert!(report.curve.iter().all(|p| p.smoothed_value.is_some()));
    assert!(report.expected_curve.is_empty());
    assert!(report.tempo_gap.is_empty());

    assert_eq!(report.summary.total_poss, 0);
    assert!(report.summary.mean_residual.is_none());
    assert!(report.summary.p_value_p2.is_none());
    assert_eq!(report.verdict.direction, TempoDirection::Undetermined);
    assert!(report.verdict.confidence.is_none());
}

#[test]
fn test_no_second_period_is_undetermined() {
    let events = rebound_game(&[12.0; 8], &[]);
    let report = analyze_game(&events, Some(140.0), &AnalysisConfig::default()).unwrap();

    assert_eq!(report.summary.total_poss_p1, 7);
    assert_eq!(report.summary.total_poss_p2, 0);
    assert!(report.summary.mean_residual_p2.is_none());
    assert!(report.summary.median_residual_p2.is_none());
    assert!(report.summary.p_value_p2.is_none());
    assert_eq!(report.verdict.direction, TempoDirection::Undetermined);

    let json = serde_json::to_value(&report.summary).unwrap();
    assert!(json["median_residual_p2"].is_null());
    assert_eq!(json["total_poss_p2"], 0);
}

#[test]
fn test_slower_second_half_verdict() {
    let events = rebound_game(&[12.0; 10], &[20.0; 12]);

    for method in [SignificanceMethod::Wilcoxon, SignificanceMethod::SignTest] {
        let mut config = AnalysisConfig::default();
        config.significance.method = method;
        let report = analyze_game(&events, Some(140.0), &config).unwrap();

        assert_eq!(report.summary.total_poss_p2, 11);
        assert!(report.summary.median_residual_p2.unwrap() > 0.0);
        assert!(report.summary.median_residual_p1.unwrap() < 0.0);

        let p = report.summary.p_value_p2.unwrap();
        assert!(p > 0.0 && p < 0.01, "{}: p = {}", method, p);
        assert_eq!(report.verdict.direction, TempoDirection::Slower);
        assert!((report.verdict.confidence.unwrap() - (1.0 - p)).abs() < 1e-12);

        let outcome = report.breakdown.period_2.overall.significance.as_ref().unwrap();
        assert_eq!(outcome.method, method);
        assert_eq!(outcome.n, 11);
    }
}

#[test]
fn test_faster_second_half_verdict() {
    let events = rebound_game(&[12.0; 10], &[6.0; 12]);
    let report = analyze_game(&events, Some(140.0), &AnalysisConfig::default()).unwrap();

    assert_eq!(report.verdict.direction, TempoDirection::Faster);
    assert!(report.verdict.p_value.unwrap() < 0.01);
    assert_eq!(report.breakdown.period_2.overall.pct_above, Some(0.0));
}

#[test]
fn test_single_upward_change_point() {
    let events = rebound_game(&[10.0; 20], &[25.0; 20]);
    let mut config = AnalysisConfig::default();
    config.change_points.scale = CusumScale::Seconds;
    config.change_points.reference_mean = Some(10.0);

    let report = analyze_game(&events, Some(140.0), &config).unwrap();

    // Rows 1..=19 carry 10s, row 20 ends the half, row 21 opens period 2
    assert_eq!(report.change_points.len(), 1);
    let cp = &report.change_points[0];
    assert_eq!(cp.direction, ShiftDirection::Up);
    assert_eq!(cp.position, 22.0);
    assert_eq!(cp.index, 19);
    assert!((cp.magnitude - 15.0).abs() < 1e-9);

    let again = analyze_game(&events, Some(140.0), &config).unwrap();
    assert_eq!(report.change_points, again.change_points);
    assert_eq!(
        serde_json::to_string(&report).unwrap(),
        serde_json::to_string(&again).unwrap()
    );
}

#[test]
fn test_flat_tempo_has_no_change_points() {
    let events = rebound_game(&[15.0; 20], &[15.0; 20]);
    let report = analyze_game(&events, Some(140.0), &AnalysisConfig::default()).unwrap();
    assert!(report.change_points.is_empty());
}

#[test]
fn test_curve_follows_tempo_gap() {
    let events = rebound_game(&[12.0; 10], &[20.0; 10]);
    let report = analyze_game(&events, Some(140.0), &AnalysisConfig::default()).unwrap();

    assert_eq!(report.curve.len(), 200);
    assert_eq!(report.expected_curve.len(), 200);
    assert_eq!(report.tempo_gap.len(), 200);
    for point in &report.tempo_gap {
        let gap = point.gap.unwrap();
        assert!((gap - (point.observed.unwrap() - point.expected.unwrap())).abs() < 1e-12);
    }

    let first = report.curve.first().unwrap().smoothed_value.unwrap();
    let last = report.curve.last().unwrap().smoothed_value.unwrap();
    assert!(first < 13.0);
    assert!(last > 19.0);
}

#[test]
fn test_elapsed_seconds_axis() {
    let events = rebound_game(&[15.0; 10], &[15.0; 10]);
    let mut config = AnalysisConfig::default();
    config.smoother.axis = PositionAxis::ElapsedSeconds;

    let report = analyze_game(&events, Some(140.0), &config).unwrap();
    assert!(!report.curve.is_empty());
    assert!(report
        .curve
        .iter()
        .all(|p| (0.0..=2400.0).contains(&p.position)));
    assert_eq!(report.curve.first().unwrap().position, 15.0);
    assert!(report.curve.last().unwrap().position > 1200.0);
}

#[test]
fn test_negative_tfs_is_reported_and_excluded() {
    let mut game = GameBuilder::new();
    game.start_period(1)
        .after(0.0, EventKind::JumpBall, HOME)
        .after(10.0, MISS, HOME)
        .after(0.0, EventKind::Rebound, AWAY)
        .after(-5.0, MISS, AWAY)
        .after(0.0, EventKind::Rebound, HOME)
        .after(7.0, MISS, HOME)
        .after(0.0, EventKind::Rebound, AWAY)
        .end_period()
        .end_game();
    let events = game.build();

    let report = analyze_game(&events, Some(140.0), &AnalysisConfig::default()).unwrap();

    let bad = &report.possessions[1];
    assert!(bad.tfs.is_none());
    assert_eq!(bad.exclusion, Some(Exclusion::DataQuality));
    assert!(!bad.counts_for_tempo());

    assert!(report
        .issues
        .iter()
        .any(|i| i.kind == IssueKind::NegativeTfs && i.possession_index == Some(1)));
    assert!(report
        .issues
        .iter()
        .any(|i| i.kind == IssueKind::ClockOutOfOrder));

    assert_eq!(report.possessions[2].tfs, Some(7.0));
    assert_eq!(report.summary.total_poss_p1, 1);
}

#[test]
fn test_invalid_config_fails_before_processing() {
    let events = rebound_game(&[12.0; 6], &[14.0; 6]);

    let mut config = AnalysisConfig::default();
    config.smoother.bandwidth = 0.0;
    let err = analyze_game(&events, Some(140.0), &config).unwrap_err();
    assert!(err.is_configuration());

    let mut config = AnalysisConfig::default();
    config.change_points.threshold = -1.0;
    let err = analyze_game(&events, Some(140.0), &config).unwrap_err();
    assert!(err.is_configuration());
}

#[test]
fn test_empty_game() {
    let report = analyze_game(&[], Some(140.0), &AnalysisConfig::default()).unwrap();

    assert_eq!(report.status, GameStatus::NotStarted);
    assert!(report.possessions.is_empty());
    assert!(report.curve.is_empty());
    assert!(report.change_points.is_empty());
    assert_eq!(report.summary.total_poss, 0);
    assert_eq!(report.verdict.direction, TempoDirection::Undetermined);
}

#[test]
fn test_game_status_from_stream() {
    let finished = rebound_game(&[12.0; 4], &[12.0; 4]);
    let report = analyze_game(&finished, Some(140.0), &AnalysisConfig::default()).unwrap();
    assert_eq!(report.status, GameStatus::Final);

    let mut halftime = GameBuilder::new();
    support::rebound_half(&mut halftime, 1, &[12.0; 4]);
    let report = analyze_game(&halftime.build(), Some(140.0), &AnalysisConfig::default()).unwrap();
    assert_eq!(report.status, GameStatus::Halftime);
}

#[test]
fn test_json_envelope_entry_point() {
    let game = mixed_first_half();
    let mut records = game.to_json_records();
    records.push(json!({
        "period": 1,
        "clock_value": "0:00",
        "event_type": "mascot_dance",
    }));
    records.push(json!({
        "period": "first",
        "clock_value": "0:00",
        "event_type": "timeout",
    }));
    let content = json!({
        "game_id": "game-0042",
        "closing_total": 140.0,
        "events": records,
    })
    .to_string();

    let report = analyze_game_json(&content, None, &AnalysisConfig::default()).unwrap();
    assert_eq!(report.game_id.as_deref(), Some("game-0042"));
    assert_eq!(report.covariates.closing_total, Some(140.0));
    assert_eq!(report.possessions.len(), 6);

    let kinds: Vec<IssueKind> = report.issues.iter().map(|i| i.kind).collect();
    assert!(kinds.contains(&IssueKind::MalformedPeriod));
    assert!(kinds.contains(&IssueKind::UnrecognizedEvent));

    let overridden = analyze_game_json(&content, Some(150.0), &AnalysisConfig::default()).unwrap();
    assert_eq!(overridden.covariates.closing_total, Some(150.0));
    assert_ne!(report.possessions[2].expected_tfs, overridden.possessions[2].expected_tfs);
}

#[test]
fn test_json_bare_array_matches_builder_events() {
    let game = mixed_first_half();
    let content = serde_json::to_string(&game.to_json_records()).unwrap();

    let from_json = analyze_game_json(&content, Some(140.0), &AnalysisConfig::default()).unwrap();
    let direct = analyze_game(&game.build(), Some(140.0), &AnalysisConfig::default()).unwrap();

    assert!(from_json.game_id.is_none());
    let tfs = |r: &tfs_tempo::api::GameReport| -> Vec<Option<f64>> {
        r.possessions.iter().map(|p| p.tfs).collect()
    };
    assert_eq!(tfs(&from_json), tfs(&direct));
    assert_eq!(from_json.summary, direct.summary);
}

#[test]
fn test_json_structural_errors() {
    let err = analyze_game_json("{\"plays\": []}", None, &AnalysisConfig::default()).unwrap_err();
    assert!(matches!(err, TempoError::Parse { .. }));

    let err = analyze_game_json("not json", None, &AnalysisConfig::default()).unwrap_err();
    assert!(matches!(err, TempoError::Parse { .. }));
    assert_eq!(err.context().operation.as_deref(), Some("analyze_game_json"));
}

#[test]
fn test_json_bad_record_fields_do_not_fail_the_game() {
    let game = mixed_first_half();
    let mut records = game.to_json_records();
    records[2]["event_type"] = serde_json::Value::Null;
    records[3]["home_score"] = json!("7");
    records[4]["away_score"] = json!(12.0);
    records[5]["home_score"] = json!("seven");
    let content = serde_json::to_string(&records).unwrap();

    let report = analyze_game_json(&content, Some(140.0), &AnalysisConfig::default()).unwrap();
    assert!(!report.possessions.is_empty());

    let kinds: Vec<IssueKind> = report.issues.iter().map(|i| i.kind).collect();
    assert!(kinds.contains(&IssueKind::UnrecognizedEvent));
    assert_eq!(
        kinds.iter().filter(|k| **k == IssueKind::MalformedScore).count(),
        1
    );
}

#[test]
fn test_period_without_start_marker_measures_from_full_period() {
    let content = json!([
        {"period": 1, "clock_value": "19:40", "event_type": "missed_shot", "acting_team": "home"},
        {"period": 1, "clock_value": "19:38", "event_type": "rebound", "acting_team": "away"},
        {"period": 1, "clock_value": "19:30", "event_type": "missed_shot", "acting_team": "away"},
    ])
    .to_string();

    let mut config = AnalysisConfig::default();
    config.table.period_start = PeriodStartPolicy::Include;
    let report = analyze_game_json(&content, Some(140.0), &config).unwrap();

    let opening = &report.possessions[0];
    assert_eq!(opening.start_cause, StartCause::PeriodStart);
    assert_eq!(opening.start_clock, Some(1200.0));
    assert_eq!(opening.tfs, Some(20.0));
    assert_eq!(report.possessions[1].tfs, Some(8.0));
}

//! Per-game tempo pipeline.
//!
//! Raw events flow strictly forward: possessions, TFS values, expectations,
//! the smoothed curve, change points and finally the residual summary. The
//! whole [`GameReport`] is assembled at the end, so a failing game produces no
//! partial output.

use log::{debug, warn};

use crate::algorithms::change_points::detect_change_points;
use crate::algorithms::expectation::{expected_tfs, period_one_score_differential, GameCovariates};
use crate::algorithms::kernel::{grid_for, KernelSmoother, SmoothedPoint};
use crate::algorithms::significance::ResidualObservation;
use crate::api::{GameReport, PossessionRow, TempoGapPoint};
use crate::checksum::events_checksum;
use crate::config::{AnalysisConfig, CurveSource, PeriodStartPolicy, PositionAxis};
use crate::error::{TempoError, TempoResult};
use crate::models::{Possession, RawEvent, StartCause};
use crate::parsing::{parse_game_json_str, DecodedGame};
use crate::preprocessing::{extract_tfs, segment_possessions, Exclusion, TfsValue};
use crate::services::efficiency::efg_by_half;
use crate::services::residuals::{analyze_residuals, residual};
use crate::services::status::classify_game_status;

/// Run the full pipeline on one game's ordered events.
///
/// # Arguments
/// * `events` - Ordered play-by-play events for a single game
/// * `closing_total` - Closing total covariate; `None` leaves every expectation undefined
/// * `config` - Validated before any event is touched
///
/// # Errors
/// Only configuration errors are returned. Data problems are reported in
/// [`GameReport::issues`] and insufficient data yields undefined statistics.
pub fn analyze_game(
    events: &[RawEvent],
    closing_total: Option<f64>,
    config: &AnalysisConfig,
) -> TempoResult<GameReport> {
    config.validate()?;
    let smoother = KernelSmoother::new(config.smoother.kernel, config.smoother.bandwidth)?;

    let segmentation = segment_possessions(events, &config.clock);
    let extraction = extract_tfs(&segmentation.possessions, events);

    let covariates = game_covariates(events, closing_total);

    let rows: Vec<PossessionRow> = segmentation
        .possessions
        .iter()
        .zip(&extraction.values)
        .filter(|(possession, _)| {
            !(possession.start_cause == StartCause::PeriodStart
                && config.table.period_start == PeriodStartPolicy::Hide)
        })
        .map(|(possession, value)| build_row(possession, value, &covariates, config))
        .collect();

    // Tempo curve over observed TFS
    let tempo_rows: Vec<&PossessionRow> = rows.iter().filter(|r| r.counts_for_tempo()).collect();
    let mut observed_points = Vec::with_capacity(tempo_rows.len());
    let mut expected_points = Vec::new();
    for row in &tempo_rows {
        let (Some(position), Some(tfs)) = (curve_position(row, config), row.tfs) else {
            continue;
        };
        observed_points.push((position, tfs));
        if let Some(expected) = row.expected_tfs {
            expected_points.push((position, expected));
        }
    }

    let grid = grid_for(&observed_points, config.smoother.grid_points);
    let curve = smoother.smooth(&observed_points, &grid);
    let expected_curve = if expected_points.is_empty() {
        Vec::new()
    } else {
        smoother.smooth(&expected_points, &grid)
    };
    let tempo_gap = tempo_gap(&curve, &expected_curve);

    let (cp_values, cp_positions): (Vec<f64>, Vec<f64>) = match config.change_points.source {
        CurveSource::Raw => observed_points.iter().map(|(x, y)| (*y, *x)).unzip(),
        CurveSource::Smoothed => curve
            .iter()
            .filter_map(|p| p.smoothed_value.map(|v| (v, p.position)))
            .unzip(),
    };
    let change_points =
        detect_change_points(&cp_values, &cp_positions, &config.change_points.cusum())?;

    let observations: Vec<ResidualObservation> = rows
        .iter()
        .filter(|r| r.counts_for_residuals())
        .filter_map(|r| {
            r.residual.map(|residual| ResidualObservation {
                period: r.period,
                cause: r.start_cause,
                residual,
            })
        })
        .collect();
    let provider = config.significance.provider();
    let residuals = analyze_residuals(&observations, provider.as_ref());

    let mut issues = segmentation.issues;
    issues.extend(extraction.issues);

    debug!(
        "Analyzed {} events: {} possessions, {} tempo samples, {} residuals, {} change points",
        events.len(),
        rows.len(),
        observed_points.len(),
        observations.len(),
        change_points.len()
    );

    Ok(GameReport {
        game_id: None,
        checksum: events_checksum(events),
        status: classify_game_status(events, config.clock.regulation_periods),
        covariates,
        possessions: rows,
        curve,
        expected_curve,
        tempo_gap,
        change_points,
        summary: residuals.summary,
        breakdown: residuals.breakdown,
        verdict: residuals.verdict,
        efficiency: efg_by_half(events),
        issues,
    })
}

/// Run the pipeline on a decoded game.
///
/// An explicit `closing_total` takes precedence over the one carried by the
/// input envelope. Decoding issues are reported ahead of pipeline issues.
pub fn analyze_decoded(
    game: DecodedGame,
    closing_total: Option<f64>,
    config: &AnalysisConfig,
) -> TempoResult<GameReport> {
    let mut report = analyze_game(&game.events, closing_total.or(game.closing_total), config)?;
    report.game_id = game.game_id;
    let mut issues = game.issues;
    issues.append(&mut report.issues);
    report.issues = issues;
    Ok(report)
}

/// Decode play-by-play JSON and run the pipeline.
pub fn analyze_game_json(
    content: &str,
    closing_total: Option<f64>,
    config: &AnalysisConfig,
) -> TempoResult<GameReport> {
    let game = parse_game_json_str(content).map_err(|e| {
        TempoError::parse(format!("{:#}", e)).with_operation("analyze_game_json")
    })?;
    analyze_decoded(game, closing_total, config)
}

fn game_covariates(events: &[RawEvent], closing_total: Option<f64>) -> GameCovariates {
    let closing_total = match closing_total {
        Some(total) if total.is_finite() => Some(total),
        Some(total) => {
            warn!("Ignoring non-finite closing total {}", total);
            None
        }
        None => {
            warn!("No closing total: expected TFS undefined for every possession");
            None
        }
    };

    let score_diff = period_one_score_differential(events);
    if score_diff.is_none() && events.iter().any(|e| e.period >= 2) {
        warn!("No period-1 events: period-2 expectations undefined");
    }

    GameCovariates {
        closing_total,
        score_diff,
    }
}

fn build_row(
    possession: &Possession,
    value: &TfsValue,
    covariates: &GameCovariates,
    config: &AnalysisConfig,
) -> PossessionRow {
    let expected = expected_tfs(possession.period, possession.start_cause, covariates);

    let mut exclusion = value.exclusion;
    if exclusion.is_none()
        && possession.start_cause == StartCause::PeriodStart
        && config.table.period_start != PeriodStartPolicy::Include
    {
        exclusion = Some(Exclusion::PeriodStart);
    }
    if exclusion.is_none() && value.tfs.is_some() && expected.is_none() {
        exclusion = Some(Exclusion::MissingCovariate);
    }

    PossessionRow {
        index: possession.index,
        period: possession.period,
        team: possession.team,
        start_cause: possession.start_cause,
        start_clock: possession.start_clock,
        end_clock: possession.end_clock,
        tfs: value.tfs,
        expected_tfs: expected,
        residual: residual(value.tfs, expected),
        home_score: possession.home_score,
        away_score: possession.away_score,
        status: possession.status,
        exclusion,
    }
}

fn curve_position(row: &PossessionRow, config: &AnalysisConfig) -> Option<f64> {
    match config.smoother.axis {
        PositionAxis::PossessionIndex => Some(row.index as f64),
        PositionAxis::ElapsedSeconds => row
            .start_clock
            .map(|clock| config.clock.elapsed_seconds(row.period, clock)),
    }
}

fn tempo_gap(curve: &[SmoothedPoint], expected_curve: &[SmoothedPoint]) -> Vec<TempoGapPoint> {
    if expected_curve.is_empty() {
        return Vec::new();
    }
    curve
        .iter()
        .zip(expected_curve)
        .map(|(observed, expected)| TempoGapPoint {
            position: observed.position,
            observed: observed.smoothed_value,
            expected: expected.smoothed_value,
            gap: observed
                .smoothed_value
                .zip(expected.smoothed_value)
                .map(|(o, e)| o - e),
        })
        .collect()
}

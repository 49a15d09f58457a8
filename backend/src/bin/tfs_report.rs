//! TFS Report CLI
//!
//! Reads one game's play-by-play JSON and prints the tempo report as JSON.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin tfs-report --features cli -- \
//!   --events game.json --closing-total 141.5 --config tempo.toml
//! ```
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Log level (default: info)
//! - `TFS_BANDWIDTH`, `TFS_GRID_POINTS`, `TFS_CUSUM_THRESHOLD`,
//!   `TFS_CUSUM_ALLOWANCE`, `TFS_SIGNIFICANCE`: configuration overrides

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tfs_tempo::config::AnalysisConfig;
use tfs_tempo::parsing::parse_game_json;
use tfs_tempo::services::analyze_decoded;

#[derive(Parser)]
#[command(name = "tfs-report")]
#[command(about = "Time-to-first-shot tempo report for one game", long_about = None)]
struct Cli {
    /// Play-by-play JSON file (array of events or game envelope)
    #[arg(long)]
    events: PathBuf,

    /// Closing total; overrides the value in the input envelope
    #[arg(long)]
    closing_total: Option<f64>,

    /// TOML configuration file (defaults to tempo.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print only the residual summary and verdict
    #[arg(long, default_value = "false")]
    summary_only: bool,

    /// Pretty-print the JSON output
    #[arg(long, default_value = "false")]
    pretty: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();

    let cli = Cli::parse();

    let config_path = cli.config.clone().or_else(AnalysisConfig::default_location);
    let config = AnalysisConfig::from_optional_file(config_path.as_ref())
        .with_context(|| match config_path {
            Some(ref path) => format!("Failed to load config {}", path.display()),
            None => "Invalid built-in configuration".to_string(),
        })?
        .with_env_overrides()
        .context("Invalid configuration override")?;
    match config_path {
        Some(ref path) => info!("Using configuration {}", path.display()),
        None => info!("No tempo.toml found; using built-in defaults"),
    }

    let game = parse_game_json(&cli.events)?;
    info!(
        "Loaded {} events from {} ({} decode issues)",
        game.events.len(),
        cli.events.display(),
        game.issues.len()
    );

    let report = analyze_decoded(game, cli.closing_total, &config)?;
    info!(
        "{} possessions, {} change points, verdict {:?}",
        report.possessions.len(),
        report.change_points.len(),
        report.verdict.direction
    );

    let output = if cli.summary_only {
        let view = report.summary_view();
        if cli.pretty {
            serde_json::to_string_pretty(&view)?
        } else {
            serde_json::to_string(&view)?
        }
    } else if cli.pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    println!("{}", output);

    Ok(())
}

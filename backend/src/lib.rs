//! # TFS Tempo
//!
//! Possession-level tempo analysis for basketball play-by-play.
//!
//! This crate derives "time to first shot" (TFS) for every possession of a
//! game, smooths it into a tempo curve, detects regime shifts, and compares
//! observed tempo against a fixed expectation model to produce a second-half
//! tempo verdict.
//!
//! ## Features
//!
//! - **Data Loading**: Parse play-by-play JSON (bare arrays or game envelopes)
//! - **Segmentation**: Partition the event stream into possessions by start cause
//! - **Expectation Model**: Eight fixed linear TFS formulas by period and start cause
//! - **Smoothing**: Gaussian or Epanechnikov kernel curve on a configurable grid
//! - **Change Points**: Two-sided CUSUM with reset after each alarm
//! - **Significance**: Wilcoxon signed-rank, sign test, or normal approximation
//!
//! ## Architecture
//!
//! The crate is organized into several logical modules:
//!
//! - [`parsing`]: JSON decoding and game-clock parsing
//! - [`preprocessing`]: Possession segmentation and TFS extraction
//! - [`algorithms`]: Expectation model, kernel smoother, CUSUM, significance tests
//! - [`services`]: Per-game pipeline, residual summary, eFG% and game status
//! - [`api`]: Output DTOs (possession table, curves, change points, report)
//! - [`config`]: TOML configuration with environment overrides
//!
//! ## Usage
//!
//! ```
//! use tfs_tempo::config::AnalysisConfig;
//! use tfs_tempo::services::analyze_game_json;
//!
//! let report = analyze_game_json("[]", Some(140.0), &AnalysisConfig::default()).unwrap();
//! assert!(report.possessions.is_empty());
//! assert_eq!(report.summary.total_poss, 0);
//! ```
//!
//! Every game is processed independently with no shared state, so callers
//! may analyze many games in parallel.

pub mod algorithms;
pub mod api;
pub mod checksum;
pub mod config;
pub mod error;
pub mod models;
pub mod parsing;
pub mod preprocessing;
pub mod services;

#[cfg(feature = "python")]
pub mod python;

pub use config::AnalysisConfig;
pub use error::{TempoError, TempoResult};
pub use services::{analyze_game, analyze_game_json};

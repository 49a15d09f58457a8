//! Service layer: per-game orchestration and game-level aggregates.
//!
//! The pipeline in [`tempo`] chains segmentation, TFS extraction, the
//! expectation model, smoothing and change-point detection, then hands the
//! residuals to [`residuals`] for the summary and verdict.

pub mod efficiency;

pub mod residuals;

pub mod status;

pub mod tempo;

pub use efficiency::efg_by_half;
pub use residuals::{analyze_residuals, ResidualAnalysis, ResidualSummary, TempoVerdict};
pub use status::{classify_game_status, GameStatus};
pub use tempo::{analyze_decoded, analyze_game, analyze_game_json};

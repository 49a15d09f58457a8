//! Numerical core: expectation model, smoothing, change points and
//! significance tests.

pub mod change_points;
pub mod descriptive;
pub mod expectation;
pub mod kernel;
pub mod significance;

pub use change_points::{
    detect_change_points, ChangePoint, CusumConfig, CusumDetector, CusumScale, ShiftDirection,
};
pub use expectation::{expected_tfs, period_one_score_differential, GameCovariates, ModelPeriod};
pub use kernel::{grid_for, linspace_grid, KernelKind, KernelSmoother, SmoothedPoint};
pub use significance::{
    EffectDirection, ResidualObservation, SignTest, SignificanceMethod, SignificanceOutcome,
    SignificanceTest, WilcoxonSignedRank,
};

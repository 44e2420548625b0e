//! Numerical helpers shared by the feature builder, estimator and evaluator.

pub mod metrics;
pub mod ols;
pub mod optimization;
pub mod stats;

pub use metrics::{evaluate, AccuracyBand, AccuracyMetrics, MapePolicy};
pub use ols::{ols_fit, OlsFit};
pub use optimization::{nelder_mead, Minimum, NelderMeadConfig};
pub use stats::{mean, quantile, round_to};

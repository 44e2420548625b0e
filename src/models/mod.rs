//! Forecasting models.

mod traits;

pub mod baseline;
pub mod sarimax;

pub use baseline::TrailingAverage;
pub use sarimax::{ArimaOrder, FittedSarimax, SarimaxEstimator, SeasonalOrder};
pub use traits::{Estimator, ExogMatrix, FittedModel};

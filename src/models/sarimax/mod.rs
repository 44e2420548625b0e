//! Regression with seasonal ARIMA errors.

pub mod diff;
mod model;

pub use model::{ArimaOrder, FittedSarimax, SarimaxEstimator, SeasonalOrder};

//! Recursive multi-day forecasting.

mod history;
mod recursive;

pub use history::RunningHistory;
pub use recursive::{forecast_horizon, ForecastPoint, RecursiveForecaster};

//! # vantedjo-forecast
//!
//! Daily sales forecasting for a poultry shop's product categories.
//!
//! Each category's history is clipped at a high quantile, log-transformed and
//! enriched with lag, moving-average and calendar regressors. A seasonal
//! regression-with-ARIMA-errors model is fitted on that table and rolled
//! forward one day at a time, feeding each forecast back in as history for
//! the next day's regressors. When the model cannot be fitted, a damped
//! trailing average takes over.
//!
//! ```no_run
//! use vantedjo_forecast::prelude::*;
//!
//! # fn main() -> vantedjo_forecast::Result<()> {
//! let series = load_sales("data/ts_ayam_potong_clean.csv", "Ayam_Potong", DateFormat::Iso)?;
//! let config = ForecastConfig::improved();
//! let pipeline = CategoryPipeline::new(config.clone(), config.estimator());
//!
//! let forecast = pipeline.forecast_category("ayam_potong", &series, &Calendar::new(), 14)?;
//! for point in &forecast.points {
//!     println!("{} {:.1}", point.date, point.predicted_quantity);
//! }
//! # Ok(())
//! # }
//! ```

#![allow(clippy::needless_range_loop)]

pub mod config;
pub mod core;
pub mod data;
pub mod error;
pub mod evaluation;
pub mod features;
pub mod forecast;
pub mod models;
pub mod pipeline;
pub mod server;
pub mod utils;

pub use error::{ForecastError, Result};

pub mod prelude {
    pub use crate::config::{AppConfig, ConfigLoader, ForecastConfig};
    pub use crate::core::{Calendar, CalendarRow, CoveragePolicy, SalesSeries};
    pub use crate::data::{load_calendar, load_sales, DateFormat};
    pub use crate::error::{ForecastError, Result};
    pub use crate::evaluation::{evaluate_holdout, HoldoutEvaluation};
    pub use crate::features::{build_features, FeatureSpec, FeatureTable};
    pub use crate::forecast::{forecast_horizon, ForecastPoint, RecursiveForecaster};
    pub use crate::models::{Estimator, FittedModel, SarimaxEstimator, TrailingAverage};
    pub use crate::pipeline::{CategoryForecast, CategoryPipeline, ForecastMethod, ForecastReport};
    pub use crate::utils::{AccuracyBand, AccuracyMetrics, MapePolicy};
}

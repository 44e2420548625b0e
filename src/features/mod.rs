//! Lag and moving-average features over clipped daily quantities.
//!
//! The same [`FeatureSpec`] drives both the training table and the rows the
//! recursive forecaster synthesises, so column order is defined in one place.
//!
//! # Example
//!
//! ```
//! use chrono::NaiveDate;
//! use vantedjo_forecast::core::SalesSeries;
//! use vantedjo_forecast::features::{build_features, FeatureSpec};
//!
//! let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
//! let quantities: Vec<f64> = (0..20).map(|i| 10.0 + (i % 7) as f64).collect();
//! let series = SalesSeries::from_quantities(start, &quantities).unwrap();
//!
//! let table = build_features(&series, 0.95, &FeatureSpec::default()).unwrap();
//! assert_eq!(table.len(), 20 - 7);
//! assert_eq!(table.exog_names()[6], "lag1");
//! ```

mod builder;

pub use builder::{build_features, FeatureRow, FeatureTable};

use crate::core::{CalendarRow, CALENDAR_REGRESSORS};
use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};

/// Which lag offsets and trailing-mean windows to derive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSpec {
    pub lags: Vec<usize>,
    pub ma_windows: Vec<usize>,
}

impl Default for FeatureSpec {
    fn default() -> Self {
        Self {
            lags: vec![1, 3, 7],
            ma_windows: vec![3, 7],
        }
    }
}

impl FeatureSpec {
    /// Offsets and windows must be positive and unique.
    pub fn validate(&self) -> Result<()> {
        for (kind, values) in [("lag", &self.lags), ("moving-average window", &self.ma_windows)] {
            if values.contains(&0) {
                return Err(ForecastError::InvalidParameter(format!(
                    "{kind} must be at least 1"
                )));
            }
            let mut sorted = values.clone();
            sorted.sort_unstable();
            sorted.dedup();
            if sorted.len() != values.len() {
                return Err(ForecastError::InvalidParameter(format!(
                    "duplicate {kind} in {values:?}"
                )));
            }
        }
        Ok(())
    }

    /// Largest lag offset; rows before it have undefined lags.
    pub fn max_lag(&self) -> usize {
        self.lags.iter().copied().max().unwrap_or(0)
    }

    /// History rows needed to compute every lag and full moving-average window.
    pub fn required_history(&self) -> usize {
        self.lags
            .iter()
            .chain(&self.ma_windows)
            .copied()
            .max()
            .unwrap_or(0)
    }

    /// Exogenous column names: calendar indicators, then `lag{k}`, then `ma{k}`.
    pub fn exog_names(&self) -> Vec<String> {
        CALENDAR_REGRESSORS
            .iter()
            .map(|s| s.to_string())
            .chain(self.lags.iter().map(|k| format!("lag{k}")))
            .chain(self.ma_windows.iter().map(|k| format!("ma{k}")))
            .collect()
    }

    /// Assemble one exogenous row in [`FeatureSpec::exog_names`] order.
    pub fn exog_row(&self, calendar: &CalendarRow, lags: &[f64], mas: &[f64]) -> Vec<f64> {
        calendar
            .regressors()
            .iter()
            .chain(lags)
            .chain(mas)
            .copied()
            .collect()
    }
}

//! Trailing-average fallback forecaster.
//!
//! Used when the regression model cannot be fitted. Each forecast is the mean
//! of the last `window` days plus a damped copy of the matching historical
//! day's deviation from that mean, so the weekly shape survives in muted form.

use crate::error::{ForecastError, Result};
use crate::utils::stats::round_to;
use serde::{Deserialize, Serialize};

/// Mean-plus-damped-deviation forecaster over a trailing window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrailingAverage {
    /// Number of most recent days averaged.
    pub window: usize,
    /// Share of each historical day's deviation carried into the forecast.
    /// Zero gives a flat forecast at the window mean.
    pub damping: f64,
}

impl Default for TrailingAverage {
    fn default() -> Self {
        Self {
            window: 14,
            damping: 0.3,
        }
    }
}

impl TrailingAverage {
    pub fn new(window: usize, damping: f64) -> Self {
        Self { window, damping }
    }

    /// Forecast `horizon` days from `history` (oldest first).
    ///
    /// Values are floored at zero and rounded to two decimals.
    pub fn forecast(&self, history: &[f64], horizon: usize) -> Result<Vec<f64>> {
        if self.window == 0 {
            return Err(ForecastError::InvalidParameter(
                "window must be at least 1".into(),
            ));
        }
        let recent = &history[history.len().saturating_sub(self.window)..];
        if recent.is_empty() {
            return Err(ForecastError::EmptyData);
        }

        let avg = recent.iter().sum::<f64>() / recent.len() as f64;
        Ok((0..horizon)
            .map(|i| {
                let deviation = recent[i % recent.len()] - avg;
                round_to(avg + self.damping * deviation, 2).max(0.0)
            })
            .collect())
    }

    pub fn name(&self) -> &'static str {
        "TrailingAverage"
    }
}

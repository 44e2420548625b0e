//! Day-by-day forecasting that feeds each forecast back into the lag features.

use crate::core::CalendarRow;
use crate::error::{ForecastError, Result};
use crate::features::{FeatureRow, FeatureSpec, FeatureTable};
use crate::forecast::RunningHistory;
use crate::models::{ExogMatrix, FittedModel};
use chrono::{Duration, NaiveDate};
use serde::Serialize;
use tracing::debug;

/// Forecast for one day, on the original quantity scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub predicted_quantity: f64,
}

/// Recursive forecaster bound to one fitted model and one training table.
///
/// Each step reads lags and trailing means from the end of the running
/// history, asks the model for a one-step forecast, and appends a synthetic
/// row built from that forecast. Later steps therefore depend on earlier
/// forecasts, never on unseen actuals.
pub struct RecursiveForecaster<M> {
    model: M,
    spec: FeatureSpec,
    exog_names: Vec<String>,
    clip_threshold: f64,
    upper_bound: f64,
    history: RunningHistory,
}

impl<M: FittedModel> RecursiveForecaster<M> {
    /// Forecasts are clamped to `[0, clip_threshold × upper_multiplier]`.
    pub fn new(table: &FeatureTable, model: M, upper_multiplier: f64) -> Result<Self> {
        if table.is_empty() {
            return Err(ForecastError::EmptyData);
        }
        if !(upper_multiplier.is_finite() && upper_multiplier > 0.0) {
            return Err(ForecastError::InvalidParameter(format!(
                "upper multiplier must be positive, got {upper_multiplier}"
            )));
        }
        Ok(Self {
            model,
            spec: table.spec.clone(),
            exog_names: table.exog_names(),
            clip_threshold: table.clip_threshold,
            upper_bound: (table.clip_threshold * upper_multiplier).max(0.0),
            history: RunningHistory::from_table(table),
        })
    }

    pub fn history(&self) -> &RunningHistory {
        &self.history
    }

    /// Forecast the day after the current end of history.
    pub fn step(&mut self, date: NaiveDate, calendar: &CalendarRow) -> Result<ForecastPoint> {
        if let Some(last) = self.history.last_date() {
            let expected = last + Duration::days(1);
            if date != expected {
                return Err(ForecastError::InvalidParameter(format!(
                    "next forecast date must be {expected}, got {date}"
                )));
            }
        }

        let lags = self
            .spec
            .lags
            .iter()
            .map(|&k| self.history.lag(k))
            .collect::<Result<Vec<_>>>()?;
        let mas = self
            .spec
            .ma_windows
            .iter()
            .map(|&k| self.history.trailing_mean(k))
            .collect::<Result<Vec<_>>>()?;

        let row = self.spec.exog_row(calendar, &lags, &mas);
        let exog = ExogMatrix::from_rows(self.exog_names.clone(), &[row])?;
        let log_forecast = self
            .model
            .forecast(1, &exog)?
            .first()
            .copied()
            .ok_or_else(|| ForecastError::Numerical("model returned no forecast".into()))?;

        let raw = log_forecast.exp_m1();
        if !raw.is_finite() {
            return Err(ForecastError::Numerical(format!(
                "forecast for {date} is not finite"
            )));
        }
        let predicted = raw.clamp(0.0, self.upper_bound);
        let smoothed = predicted.min(self.clip_threshold);

        debug!(%date, log_forecast, predicted, history = self.history.len(), "recursive step");

        self.history.push(FeatureRow {
            date,
            quantity: predicted,
            smoothed,
            log_quantity: smoothed.ln_1p(),
            lags,
            mas,
            calendar: calendar.clone(),
        });

        Ok(ForecastPoint {
            date,
            predicted_quantity: predicted,
        })
    }

    /// Forecast every date in `horizon`, which must continue the history day by day.
    pub fn run(&mut self, horizon: &[(NaiveDate, CalendarRow)]) -> Result<Vec<ForecastPoint>> {
        horizon
            .iter()
            .map(|(date, calendar)| self.step(*date, calendar))
            .collect()
    }
}

/// Run a fresh recursive forecast over `horizon`.
pub fn forecast_horizon<M: FittedModel>(
    table: &FeatureTable,
    model: M,
    horizon: &[(NaiveDate, CalendarRow)],
    upper_multiplier: f64,
) -> Result<Vec<ForecastPoint>> {
    RecursiveForecaster::new(table, model, upper_multiplier)?.run(horizon)
}

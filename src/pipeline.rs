//! Per-category orchestration with baseline fallback and combined reporting.
//!
//! Each category runs in isolation: a failure in one is recorded next to the
//! successful results of the others instead of aborting the batch.

use crate::config::ForecastConfig;
use crate::core::{Calendar, SalesSeries};
use crate::error::{ForecastError, Result};
use crate::evaluation::{evaluate_holdout, HoldoutEvaluation};
use crate::features::build_features;
use crate::forecast::{forecast_horizon, ForecastPoint};
use crate::models::{Estimator, FittedModel};
use crate::utils::metrics::AccuracyBand;
use crate::utils::stats::mean;
use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;
use tracing::{info, warn};

/// Which forecaster produced a category's numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ForecastMethod {
    Sarimax,
    Baseline,
}

impl fmt::Display for ForecastMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            ForecastMethod::Sarimax => "sarimax",
            ForecastMethod::Baseline => "baseline",
        })
    }
}

/// Forecast for one category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryForecast {
    pub category: String,
    pub method: ForecastMethod,
    pub model: String,
    pub points: Vec<ForecastPoint>,
    /// Model error that triggered the baseline, if any.
    pub fallback_reason: Option<String>,
    /// Forecast dates whose calendar row was derived from the date.
    pub calendar_filled: Vec<NaiveDate>,
    /// First requested date the calendar did not cover, when the horizon was cut short.
    pub truncated_at: Option<NaiveDate>,
}

/// Runs forecasts and evaluations for categories with one configuration.
pub struct CategoryPipeline<E> {
    config: ForecastConfig,
    estimator: E,
}

impl<E: Estimator> CategoryPipeline<E> {
    pub fn new(config: ForecastConfig, estimator: E) -> Self {
        Self { config, estimator }
    }

    pub fn config(&self) -> &ForecastConfig {
        &self.config
    }

    /// Forecast `days` days after the end of `series`.
    ///
    /// Estimator failures fall back to the trailing-average baseline and are
    /// reported through [`CategoryForecast::method`]; all other errors propagate.
    pub fn forecast_category(
        &self,
        category: &str,
        series: &SalesSeries,
        calendar: &Calendar,
        days: usize,
    ) -> Result<CategoryForecast> {
        let horizon = calendar.horizon(series.last_date(), days, self.config.coverage)?;
        if !horizon.filled.is_empty() {
            warn!(
                category,
                days = horizon.filled.len(),
                first = %horizon.filled[0],
                "calendar rows derived from dates"
            );
        }
        if let Some(date) = horizon.missing_from {
            warn!(category, %date, "calendar coverage ends before the requested horizon");
        }

        let table = build_features(series, self.config.clip_quantile, &self.config.features)?;

        let modelled = self
            .estimator
            .fit(&table.endog(), &table.exog_matrix()?)
            .and_then(|fitted| {
                let points = forecast_horizon(
                    &table,
                    &fitted,
                    &horizon.rows,
                    self.config.upper_multiplier,
                )?;
                Ok((fitted.name().to_string(), points))
            });

        let forecast = match modelled {
            Ok((model, points)) => CategoryForecast {
                category: category.to_string(),
                method: ForecastMethod::Sarimax,
                model,
                points,
                fallback_reason: None,
                calendar_filled: Vec::new(),
                truncated_at: None,
            },
            Err(err) if err.is_model_failure() => {
                warn!(category, error = %err, "model failed, using trailing-average baseline");
                let dates: Vec<NaiveDate> = horizon.rows.iter().map(|(d, _)| *d).collect();
                self.baseline_forecast(category, series, &dates, err.to_string())?
            }
            Err(err) => return Err(err),
        };

        info!(category, method = %forecast.method, days = horizon.len(), "forecast complete");

        Ok(CategoryForecast {
            calendar_filled: horizon.filled,
            truncated_at: horizon.missing_from,
            ..forecast
        })
    }

    /// Trailing-average forecast for `dates`, recording why the model was not used.
    pub fn baseline_forecast(
        &self,
        category: &str,
        series: &SalesSeries,
        dates: &[NaiveDate],
        reason: String,
    ) -> Result<CategoryForecast> {
        let fallback = &self.config.fallback;
        let values = fallback.forecast(&series.quantities(), dates.len())?;
        let points = dates
            .iter()
            .zip(values)
            .map(|(date, v)| ForecastPoint {
                date: *date,
                predicted_quantity: v,
            })
            .collect();
        Ok(CategoryForecast {
            category: category.to_string(),
            method: ForecastMethod::Baseline,
            model: fallback.name().to_string(),
            points,
            fallback_reason: Some(reason),
            calendar_filled: Vec::new(),
            truncated_at: None,
        })
    }

    pub fn evaluate_category(&self, category: &str, series: &SalesSeries) -> Result<HoldoutEvaluation> {
        let result = evaluate_holdout(series, &self.config, &self.estimator);
        if let Err(err) = &result {
            warn!(category, error = %err, "evaluation failed");
        }
        result
    }

    /// Evaluate every category, keeping failures alongside successes.
    pub fn evaluate_all<'a, I>(&self, categories: I) -> EvaluationReport
    where
        I: IntoIterator<Item = (&'a str, Result<SalesSeries>)>,
    {
        let entries = categories
            .into_iter()
            .map(|(name, series)| {
                let result = series.and_then(|s| self.evaluate_category(name, &s));
                (name.to_string(), result)
            })
            .collect();
        EvaluationReport { entries }
    }

    /// Forecast every category; one failure does not stop the rest.
    pub fn forecast_all<'a, I>(&self, categories: I, calendar: &Calendar, days: usize) -> ForecastReport
    where
        I: IntoIterator<Item = (&'a str, Result<SalesSeries>)>,
    {
        let entries = categories
            .into_iter()
            .map(|(name, series)| {
                let result = series.and_then(|s| self.forecast_category(name, &s, calendar, days));
                if let Err(err) = &result {
                    warn!(category = name, error = %err, "forecast failed");
                }
                (name.to_string(), result)
            })
            .collect();
        ForecastReport { entries }
    }
}

/// Per-category forecast outcomes.
#[derive(Debug, Clone)]
pub struct ForecastReport {
    pub entries: Vec<(String, Result<CategoryForecast>)>,
}

impl ForecastReport {
    pub fn successes(&self) -> impl Iterator<Item = &CategoryForecast> {
        self.entries.iter().filter_map(|(_, r)| r.as_ref().ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &ForecastError)> {
        self.entries
            .iter()
            .filter_map(|(name, r)| r.as_ref().err().map(|e| (name.as_str(), e)))
    }
}

impl fmt::Display for ForecastReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:<16} {:>6} {:<10} model", "category", "days", "method")?;
        for (name, result) in &self.entries {
            match result {
                Ok(c) => writeln!(f, "{:<16} {:>6} {:<10} {}", name, c.points.len(), c.method, c.model)?,
                Err(err) => writeln!(f, "{name:<16} failed: {err}")?,
            }
        }
        Ok(())
    }
}

/// Averages over the categories that evaluated successfully.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationSummary {
    pub evaluated: usize,
    pub failed: usize,
    pub mean_mae: f64,
    pub mean_rmse: f64,
    /// Mean over categories with a defined MAPE.
    pub mean_mape: Option<f64>,
}

impl EvaluationSummary {
    pub fn band(&self) -> Option<AccuracyBand> {
        self.mean_mape.map(AccuracyBand::from_mape)
    }
}

/// Per-category evaluation outcomes.
#[derive(Debug, Clone)]
pub struct EvaluationReport {
    pub entries: Vec<(String, Result<HoldoutEvaluation>)>,
}

impl EvaluationReport {
    pub fn successes(&self) -> impl Iterator<Item = (&str, &HoldoutEvaluation)> {
        self.entries
            .iter()
            .filter_map(|(name, r)| r.as_ref().ok().map(|e| (name.as_str(), e)))
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &ForecastError)> {
        self.entries
            .iter()
            .filter_map(|(name, r)| r.as_ref().err().map(|e| (name.as_str(), e)))
    }

    /// `None` when no category evaluated successfully.
    pub fn summary(&self) -> Option<EvaluationSummary> {
        let ok: Vec<&HoldoutEvaluation> = self.successes().map(|(_, e)| e).collect();
        if ok.is_empty() {
            return None;
        }
        let mapes: Vec<f64> = ok.iter().filter_map(|e| e.metrics.mape).collect();
        Some(EvaluationSummary {
            evaluated: ok.len(),
            failed: self.entries.len() - ok.len(),
            mean_mae: mean(&ok.iter().map(|e| e.metrics.mae).collect::<Vec<_>>()),
            mean_rmse: mean(&ok.iter().map(|e| e.metrics.rmse).collect::<Vec<_>>()),
            mean_mape: (!mapes.is_empty()).then(|| mean(&mapes)),
        })
    }
}

fn fmt_mape(mape: Option<f64>) -> String {
    mape.map(|m| format!("{m:.2}%")).unwrap_or_else(|| "n/a".into())
}

impl fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<16} {:>10} {:>10} {:>10} {:>8} {:>6}  accuracy",
            "category", "MAE", "RMSE", "MAPE", "train", "test"
        )?;
        for (name, result) in &self.entries {
            match result {
                Ok(e) => writeln!(
                    f,
                    "{:<16} {:>10.2} {:>10.2} {:>10} {:>8} {:>6}  {}",
                    name,
                    e.metrics.mae,
                    e.metrics.rmse,
                    fmt_mape(e.metrics.mape),
                    e.train_size,
                    e.test_size,
                    e.band().map(|b| b.to_string()).unwrap_or_else(|| "n/a".into()),
                )?,
                Err(err) => writeln!(f, "{name:<16} failed: {err}")?,
            }
        }
        if let Some(s) = self.summary() {
            writeln!(
                f,
                "{:<16} {:>10.2} {:>10.2} {:>10} {:>8} {:>6}  {}",
                "average",
                s.mean_mae,
                s.mean_rmse,
                fmt_mape(s.mean_mape),
                "",
                "",
                s.band().map(|b| b.to_string()).unwrap_or_else(|| "n/a".into()),
            )?;
        }
        Ok(())
    }
}

/// Human-readable period label, e.g. `2025-01-02 - 2025-01-15`.
pub fn period_label(points: &[ForecastPoint]) -> Option<String> {
    let first = points.first()?.date;
    let last = points.last()?.date;
    Some(format!("{first} - {last}"))
}

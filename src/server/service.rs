//! Synchronous data and forecasting operations behind the HTTP API.
//!
//! Data is re-read from disk on every call so the dashboard reflects the
//! latest CSVs without a restart.

use crate::config::AppConfig;
use crate::core::{Calendar, SalesSeries};
use crate::data::load_calendar;
use crate::error::{ForecastError, Result};
use crate::models::SarimaxEstimator;
use crate::pipeline::{period_label, CategoryForecast, CategoryPipeline, ForecastMethod};
use crate::utils::stats::round_to;
use chrono::{Duration, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::warn;

/// Days of history returned by [`DashboardService::historical`].
pub const HISTORY_DAYS: usize = 30;

/// Column-oriented series: shared dates plus one value list per category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesTable {
    pub dates: Vec<String>,
    #[serde(flatten)]
    pub values: BTreeMap<String, Vec<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Predictions {
    pub data: SeriesTable,
    pub methods: BTreeMap<String, ForecastMethod>,
    /// Why each baseline category could not use the model.
    pub fallback_reasons: BTreeMap<String, String>,
    pub period: String,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CategoryStats {
    pub total: f64,
    pub average: f64,
    pub max: f64,
    pub min: f64,
}

impl CategoryStats {
    fn from_series(series: &SalesSeries) -> Self {
        let q = series.quantities();
        let total: f64 = q.iter().sum();
        Self {
            total: round_to(total, 2),
            average: round_to(total / q.len() as f64, 2),
            max: q.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            min: q.iter().copied().fold(f64::INFINITY, f64::min),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelInfo {
    pub model: String,
    pub exogenous: Vec<String>,
    pub clip_quantile: f64,
    pub upper_multiplier: f64,
    pub horizon: usize,
    pub categories: Vec<String>,
    pub fallback_window: usize,
    pub fallback_damping: f64,
}

pub struct DashboardService {
    config: AppConfig,
    pipeline: CategoryPipeline<SarimaxEstimator>,
}

impl DashboardService {
    pub fn new(config: AppConfig) -> Self {
        let pipeline = CategoryPipeline::new(config.model.clone(), config.model.estimator());
        Self { config, pipeline }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Load every configured category; the first failure aborts.
    pub fn load_categories(&self) -> Result<Vec<(String, SalesSeries)>> {
        self.load_categories_with(&self.load_calendar()?)
    }

    fn load_categories_with(&self, calendar: &Calendar) -> Result<Vec<(String, SalesSeries)>> {
        self.config
            .resolved_categories()
            .into_iter()
            .map(|c| {
                let mut series = c.source.load()?;
                series.apply_calendar(calendar);
                Ok((c.name, series))
            })
            .collect()
    }

    /// The configured calendar, or an empty one when none is configured.
    pub fn load_calendar(&self) -> Result<Calendar> {
        match self.config.data.calendar_path() {
            Some(path) => load_calendar(path, self.config.data.calendar_date_format),
            None => Ok(Calendar::new()),
        }
    }

    pub fn predictions(&self, days: usize) -> Result<Predictions> {
        let calendar = self.load_calendar()?;
        let categories = self.load_categories_with(&calendar)?;

        // A category that cannot be modelled is served from its baseline so the others still ship.
        let forecasts = categories
            .iter()
            .map(|(name, series)| {
                self.pipeline
                    .forecast_category(name, series, &calendar, days)
                    .or_else(|err| {
                        warn!(category = %name, error = %err, "forecast failed, serving baseline");
                        let dates: Vec<NaiveDate> = (1..=days as i64)
                            .map(|i| series.last_date() + Duration::days(i))
                            .collect();
                        self.pipeline
                            .baseline_forecast(name, series, &dates, err.to_string())
                    })
            })
            .collect::<Result<Vec<CategoryForecast>>>()?;

        let first = forecasts.first().ok_or(ForecastError::EmptyData)?;
        let dates: Vec<String> = first.points.iter().map(|p| p.date.to_string()).collect();
        for f in &forecasts[1..] {
            if f.points.len() != first.points.len()
                || f.points.iter().zip(&first.points).any(|(a, b)| a.date != b.date)
            {
                warn!(category = %f.category, "forecast dates differ from {}", first.category);
            }
        }

        let values = forecasts
            .iter()
            .map(|f| {
                let v = f.points.iter().map(|p| round_to(p.predicted_quantity, 2)).collect();
                (f.category.clone(), v)
            })
            .collect();
        let methods: BTreeMap<String, ForecastMethod> = forecasts
            .iter()
            .map(|f| (f.category.clone(), f.method))
            .collect();

        let fallback_reasons: BTreeMap<String, String> = forecasts
            .iter()
            .filter_map(|f| Some((f.category.clone(), f.fallback_reason.clone()?)))
            .collect();

        let baseline: Vec<&str> = forecasts
            .iter()
            .filter(|f| f.method == ForecastMethod::Baseline)
            .map(|f| f.category.as_str())
            .collect();
        let mut message = format!("Forecast valid for the next {} days", dates.len());
        if !baseline.is_empty() {
            message.push_str(&format!(
                "; trailing-average baseline used for {}",
                baseline.join(", ")
            ));
        }

        Ok(Predictions {
            period: period_label(&first.points).unwrap_or_default(),
            data: SeriesTable { dates, values },
            methods,
            fallback_reasons,
            message,
        })
    }

    /// The last [`HISTORY_DAYS`] days of actual sales per category.
    pub fn historical(&self) -> Result<SeriesTable> {
        let categories = self.load_categories()?;
        let dates = categories
            .first()
            .map(|(_, s)| s.tail(HISTORY_DAYS).iter().map(|p| p.date.to_string()).collect())
            .unwrap_or_default();
        let values = categories
            .iter()
            .map(|(name, s)| {
                let v = s.tail(HISTORY_DAYS).iter().map(|p| p.quantity).collect();
                (name.clone(), v)
            })
            .collect();
        Ok(SeriesTable { dates, values })
    }

    pub fn stats(&self) -> Result<BTreeMap<String, CategoryStats>> {
        Ok(self
            .load_categories()?
            .iter()
            .map(|(name, s)| (name.clone(), CategoryStats::from_series(s)))
            .collect())
    }

    pub fn model_info(&self) -> ModelInfo {
        let model = &self.config.model;
        ModelInfo {
            model: model.estimator().to_string(),
            exogenous: model.features.exog_names(),
            clip_quantile: model.clip_quantile,
            upper_multiplier: model.upper_multiplier,
            horizon: model.horizon,
            categories: self.config.categories.iter().map(|c| c.name.clone()).collect(),
            fallback_window: model.fallback.window,
            fallback_damping: model.fallback.damping,
        }
    }
}

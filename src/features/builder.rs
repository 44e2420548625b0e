//! Feature table construction.

use crate::core::{CalendarRow, SalesSeries};
use crate::error::{ForecastError, Result};
use crate::features::FeatureSpec;
use crate::models::ExogMatrix;
use crate::utils::stats::quantile;
use chrono::NaiveDate;

/// Derived per-date record used for fitting and as recursive history.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    pub date: NaiveDate,
    pub quantity: f64,
    pub smoothed: f64,
    /// `ln(1 + smoothed)`, the model's endogenous variable.
    pub log_quantity: f64,
    /// One value per [`FeatureSpec::lags`] entry.
    pub lags: Vec<f64>,
    /// One value per [`FeatureSpec::ma_windows`] entry.
    pub mas: Vec<f64>,
    pub calendar: CalendarRow,
}

impl FeatureRow {
    pub fn lag(&self, spec: &FeatureSpec, k: usize) -> Option<f64> {
        let i = spec.lags.iter().position(|&l| l == k)?;
        self.lags.get(i).copied()
    }

    pub fn ma(&self, spec: &FeatureSpec, k: usize) -> Option<f64> {
        let i = spec.ma_windows.iter().position(|&w| w == k)?;
        self.mas.get(i).copied()
    }
}

/// Feature rows with every lag defined, plus the clip threshold frozen for the run.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTable {
    pub rows: Vec<FeatureRow>,
    pub clip_threshold: f64,
    pub spec: FeatureSpec,
}

impl FeatureTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn exog_names(&self) -> Vec<String> {
        self.spec.exog_names()
    }

    /// Endogenous series (`log_quantity`).
    pub fn endog(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.log_quantity).collect()
    }

    pub fn exog_matrix(&self) -> Result<ExogMatrix> {
        let rows: Vec<Vec<f64>> = self
            .rows
            .iter()
            .map(|r| self.spec.exog_row(&r.calendar, &r.lags, &r.mas))
            .collect();
        ExogMatrix::from_rows(self.exog_names(), &rows)
    }

    /// Split after the first `n` rows, sharing the clip threshold.
    pub fn split_at(&self, n: usize) -> (FeatureTable, FeatureTable) {
        let n = n.min(self.rows.len());
        let (head, tail) = self.rows.split_at(n);
        let part = |rows: &[FeatureRow]| FeatureTable {
            rows: rows.to_vec(),
            clip_threshold: self.clip_threshold,
            spec: self.spec.clone(),
        };
        (part(head), part(tail))
    }
}

/// Build the feature table for `series`.
///
/// The clip threshold is the `clip_quantile` quantile of the raw quantities
/// over the whole series. Rows before the largest lag are dropped.
pub fn build_features(
    series: &SalesSeries,
    clip_quantile: f64,
    spec: &FeatureSpec,
) -> Result<FeatureTable> {
    if !(clip_quantile > 0.0 && clip_quantile <= 1.0) {
        return Err(ForecastError::InvalidParameter(format!(
            "clip quantile must be in (0, 1], got {clip_quantile}"
        )));
    }
    spec.validate()?;

    let max_lag = spec.max_lag();
    if series.len() < max_lag + 1 {
        return Err(ForecastError::InsufficientHistory {
            needed: max_lag + 1,
            got: series.len(),
        });
    }

    let quantities = series.quantities();
    let clip_threshold = quantile(&quantities, clip_quantile).ok_or(ForecastError::EmptyData)?;

    let smoothed: Vec<f64> = quantities
        .iter()
        .map(|q| q.max(0.0).min(clip_threshold))
        .collect();

    let rows = series
        .points()
        .iter()
        .enumerate()
        .skip(max_lag)
        .map(|(i, point)| FeatureRow {
            date: point.date,
            quantity: point.quantity,
            smoothed: smoothed[i],
            log_quantity: smoothed[i].ln_1p(),
            lags: spec.lags.iter().map(|&k| smoothed[i - k]).collect(),
            mas: spec
                .ma_windows
                .iter()
                .map(|&k| trailing_mean(&smoothed[..=i], k))
                .collect(),
            calendar: point.calendar.clone(),
        })
        .collect();

    Ok(FeatureTable {
        rows,
        clip_threshold,
        spec: spec.clone(),
    })
}

/// Mean of the last `window` values, or of all of them when fewer are available.
pub(crate) fn trailing_mean(values: &[f64], window: usize) -> f64 {
    let tail = &values[values.len().saturating_sub(window)..];
    tail.iter().sum::<f64>() / tail.len() as f64
}

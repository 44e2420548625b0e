//! Holdout evaluation: fit on the head of the feature table, score the tail.

use crate::config::ForecastConfig;
use crate::core::SalesSeries;
use crate::error::{ForecastError, Result};
use crate::features::build_features;
use crate::forecast::forecast_horizon;
use crate::models::{Estimator, FittedModel};
use crate::utils::metrics::{evaluate, AccuracyBand, AccuracyMetrics};
use crate::utils::stats::mean;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

/// How the feature table is divided into training and test rows.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum SplitRule {
    /// Hold out the last `n` rows.
    LastDays(usize),
    /// Train on the first `ratio` share of rows.
    Ratio(f64),
}

impl SplitRule {
    /// Number of test rows for a table of `len` rows.
    pub fn test_size(&self, len: usize) -> usize {
        match *self {
            SplitRule::LastDays(n) => n,
            SplitRule::Ratio(r) => len - ((len as f64 * r).floor() as usize).min(len),
        }
    }
}

/// Where the test period's lag and moving-average regressors come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExogenousSource {
    /// Use the regressors computed from actual sales.
    Observed,
    /// Rebuild them day by day from the model's own forecasts.
    Recursive,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    pub split: SplitRule,
    pub exog_source: ExogenousSource,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            split: SplitRule::LastDays(7),
            exog_source: ExogenousSource::Observed,
        }
    }
}

impl EvaluationConfig {
    pub fn validate(&self) -> Result<()> {
        match self.split {
            SplitRule::LastDays(0) => Err(ForecastError::InvalidParameter(
                "holdout must contain at least one day".into(),
            )),
            SplitRule::Ratio(r) if !(r > 0.0 && r < 1.0) => Err(ForecastError::InvalidParameter(
                format!("train ratio must be in (0, 1), got {r}"),
            )),
            _ => Ok(()),
        }
    }
}

/// One scored day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EvaluationRow {
    pub date: NaiveDate,
    pub actual: f64,
    pub predicted: f64,
}

/// Result of a holdout evaluation for one series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HoldoutEvaluation {
    pub model: String,
    pub rows: Vec<EvaluationRow>,
    pub metrics: AccuracyMetrics,
    pub mean_actual: f64,
    pub mean_predicted: f64,
    pub train_size: usize,
    pub test_size: usize,
}

impl HoldoutEvaluation {
    pub fn band(&self) -> Option<AccuracyBand> {
        self.metrics.band()
    }
}

/// Fit on all but the held-out rows and score predictions against raw quantities.
///
/// The clip threshold is computed once over the whole series, as in the
/// forecasting path.
pub fn evaluate_holdout<E: Estimator>(
    series: &SalesSeries,
    config: &ForecastConfig,
    estimator: &E,
) -> Result<HoldoutEvaluation> {
    config.evaluation.validate()?;
    let table = build_features(series, config.clip_quantile, &config.features)?;

    let test_size = config.evaluation.split.test_size(table.len());
    if test_size == 0 || test_size >= table.len() {
        return Err(ForecastError::InsufficientHistory {
            needed: test_size.max(1) + 1,
            got: table.len(),
        });
    }
    let (train, test) = table.split_at(table.len() - test_size);

    let fitted = estimator.fit(&train.endog(), &train.exog_matrix()?)?;

    let predicted: Vec<f64> = match config.evaluation.exog_source {
        ExogenousSource::Observed => fitted
            .forecast(test.len(), &test.exog_matrix()?)?
            .into_iter()
            .map(|log| log.exp_m1().max(0.0))
            .collect(),
        ExogenousSource::Recursive => {
            let horizon: Vec<_> = test
                .rows
                .iter()
                .map(|r| (r.date, r.calendar.clone()))
                .collect();
            forecast_horizon(&train, &fitted, &horizon, config.upper_multiplier)?
                .into_iter()
                .map(|p| p.predicted_quantity)
                .collect()
        }
    };

    let actual: Vec<f64> = test.rows.iter().map(|r| r.quantity).collect();
    let metrics = evaluate(&actual, &predicted, config.mape_policy)?;

    info!(
        model = fitted.name(),
        train = train.len(),
        test = test.len(),
        mae = metrics.mae,
        rmse = metrics.rmse,
        mape = ?metrics.mape,
        "holdout evaluation"
    );

    let rows = test
        .rows
        .iter()
        .zip(&predicted)
        .map(|(r, &p)| EvaluationRow {
            date: r.date,
            actual: r.quantity,
            predicted: p,
        })
        .collect();

    Ok(HoldoutEvaluation {
        model: fitted.name().to_string(),
        rows,
        metrics,
        mean_actual: mean(&actual),
        mean_predicted: mean(&predicted),
        train_size: train.len(),
        test_size: test.len(),
    })
}

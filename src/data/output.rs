//! CSV writers for forecasts and evaluation results.

use crate::data::with_path;
use crate::error::Result;
use crate::evaluation::HoldoutEvaluation;
use crate::forecast::ForecastPoint;
use csv::Writer;
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
struct ForecastRecord {
    date: String,
    forecast_sales: f64,
}

#[derive(Serialize)]
struct EvaluationRecord {
    date: String,
    actual_sales: f64,
    pred_sales: f64,
}

#[derive(Serialize)]
struct SummaryRecord<'a> {
    category: &'a str,
    mae: f64,
    rmse: f64,
    mape: Option<f64>,
    mean_actual: f64,
    mean_predicted: f64,
    train_size: usize,
    test_size: usize,
    accuracy: String,
}

fn write_records<T: Serialize>(path: &Path, records: impl IntoIterator<Item = T>) -> Result<()> {
    let write = || -> Result<()> {
        let mut writer = Writer::from_path(path)?;
        for record in records {
            writer.serialize(record)?;
        }
        writer.flush()?;
        Ok(())
    };
    write().map_err(|err| with_path(path, err))
}

/// Write `date, forecast_sales`.
pub fn write_forecast_csv(path: impl AsRef<Path>, points: &[ForecastPoint]) -> Result<()> {
    write_records(
        path.as_ref(),
        points.iter().map(|p| ForecastRecord {
            date: p.date.to_string(),
            forecast_sales: p.predicted_quantity,
        }),
    )
}

/// Write `date, actual_sales, pred_sales`.
pub fn write_evaluation_csv(path: impl AsRef<Path>, evaluation: &HoldoutEvaluation) -> Result<()> {
    write_records(
        path.as_ref(),
        evaluation.rows.iter().map(|r| EvaluationRecord {
            date: r.date.to_string(),
            actual_sales: r.actual,
            pred_sales: r.predicted,
        }),
    )
}

/// Write one summary line per evaluated category.
pub fn write_summary_csv<'a, I>(path: impl AsRef<Path>, evaluations: I) -> Result<()>
where
    I: IntoIterator<Item = (&'a str, &'a HoldoutEvaluation)>,
{
    write_records(
        path.as_ref(),
        evaluations.into_iter().map(|(category, e)| SummaryRecord {
            category,
            mae: e.metrics.mae,
            rmse: e.metrics.rmse,
            mape: e.metrics.mape,
            mean_actual: e.mean_actual,
            mean_predicted: e.mean_predicted,
            train_size: e.train_size,
            test_size: e.test_size,
            accuracy: e
                .band()
                .map(|b| b.to_string())
                .unwrap_or_else(|| "n/a".to_string()),
        }),
    )
}

//! End-to-end tests: CSV in, fitted model, recursive forecast and evaluation out.

use chrono::{Datelike, Duration, NaiveDate};
use std::fmt::Write as _;
use std::path::Path;
use tempfile::TempDir;
use vantedjo_forecast::core::{Calendar, CoveragePolicy, SalesSeries};
use vantedjo_forecast::data::{load_sales, write_summary_csv, DateFormat};
use vantedjo_forecast::pipeline::{CategoryPipeline, ForecastMethod};
use vantedjo_forecast::prelude::*;

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 6).unwrap() // Monday
}

/// Weekday demand of about 10 with a weekend uplift of 5 and a little noise.
fn weekend_series(days: usize) -> SalesSeries {
    let q: Vec<f64> = (0..days)
        .map(|i| {
            let date = start() + Duration::days(i as i64);
            let weekend = if date.weekday().num_days_from_monday() >= 5 { 5.0 } else { 0.0 };
            let noise = ((i * 37) % 11) as f64 * 0.1 - 0.5;
            10.0 + weekend + noise
        })
        .collect();
    SalesSeries::from_quantities(start(), &q).unwrap()
}

fn write_csv(path: &Path, column: &str, series: &SalesSeries) {
    let mut text = format!("date,{column}\n");
    for p in series.points() {
        writeln!(text, "{},{}", p.date, p.quantity).unwrap();
    }
    std::fs::write(path, text).unwrap();
}

#[test]
fn weekend_forecasts_exceed_weekday_forecasts() {
    let config = ForecastConfig::improved();
    let pipeline = CategoryPipeline::new(config.clone(), config.estimator());

    let forecast = pipeline
        .forecast_category("ayam_potong", &weekend_series(30), &Calendar::new(), 14)
        .unwrap();

    assert_eq!(forecast.method, ForecastMethod::Sarimax);
    assert_eq!(forecast.points.len(), 14);
    assert_eq!(forecast.calendar_filled.len(), 14);

    let (mut weekend, mut weekday) = (vec![], vec![]);
    for p in &forecast.points {
        assert!(p.predicted_quantity.is_finite() && p.predicted_quantity >= 0.0);
        if p.date.weekday().num_days_from_monday() >= 5 {
            weekend.push(p.predicted_quantity);
        } else {
            weekday.push(p.predicted_quantity);
        }
    }
    let mean = |v: &[f64]| v.iter().sum::<f64>() / v.len() as f64;
    assert!(
        mean(&weekend) > mean(&weekday),
        "weekend {:?} vs weekday {:?}",
        weekend,
        weekday
    );
}

#[test]
fn short_history_falls_back_to_trailing_average() {
    let config = ForecastConfig::dashboard();
    let pipeline = CategoryPipeline::new(config.clone(), config.estimator());
    let series = SalesSeries::from_quantities(start(), &[10.0; 16]).unwrap();

    let forecast = pipeline
        .forecast_category("ayam_tua", &series, &Calendar::new(), 5)
        .unwrap();

    assert_eq!(forecast.method, ForecastMethod::Baseline);
    assert_eq!(forecast.model, "TrailingAverage");
    assert!(forecast.fallback_reason.is_some());
    assert!(forecast.points.iter().all(|p| p.predicted_quantity == 10.0));
    assert_eq!(forecast.points[0].date, start() + Duration::days(16));
}

#[test]
fn varied_short_history_falls_back_to_trailing_average() {
    // Fourteen days leave seven training rows, fewer than the non-constant regressors.
    let config = ForecastConfig::dashboard();
    let pipeline = CategoryPipeline::new(config.clone(), config.estimator());
    let series = weekend_series(14);

    let forecast = pipeline
        .forecast_category("ayam_tua", &series, &Calendar::new(), 7)
        .unwrap();

    assert_eq!(forecast.method, ForecastMethod::Baseline);
    assert!(forecast.fallback_reason.is_some());
    let expected = config.fallback.forecast(&series.quantities(), 7).unwrap();
    let got: Vec<f64> = forecast.points.iter().map(|p| p.predicted_quantity).collect();
    assert_eq!(got, expected);
}

#[test]
fn strict_coverage_requires_calendar_rows() {
    let mut config = ForecastConfig::improved();
    config.coverage = CoveragePolicy::Strict;
    let pipeline = CategoryPipeline::new(config.clone(), config.estimator());

    let err = pipeline
        .forecast_category("ayam_potong", &weekend_series(42), &Calendar::new(), 3)
        .unwrap_err();
    assert!(matches!(err, ForecastError::MissingCalendarCoverage { .. }));
}

#[test]
fn evaluation_over_csv_files_reports_failures_separately() {
    let dir = TempDir::new().unwrap();
    let good = dir.path().join("potong.csv");
    write_csv(&good, "Ayam_Potong", &weekend_series(60));

    let config = ForecastConfig::improved();
    let pipeline = CategoryPipeline::new(config.clone(), config.estimator());
    let report = pipeline.evaluate_all([
        (
            "ayam_potong",
            load_sales(&good, "Ayam_Potong", DateFormat::Iso),
        ),
        (
            "ayam_kampung",
            load_sales(dir.path().join("missing.csv"), "Ayam_Kampung", DateFormat::Iso),
        ),
    ]);

    let (name, evaluation) = report.successes().next().unwrap();
    assert_eq!(name, "ayam_potong");
    assert_eq!(evaluation.test_size, 7);
    assert_eq!(evaluation.train_size, 60 - 7 - 7);
    assert!(evaluation.metrics.mape.is_some());

    let failures: Vec<_> = report.failures().collect();
    assert_eq!(failures.len(), 1);
    assert!(matches!(failures[0].1, ForecastError::DataLoad(_)));

    let summary = report.summary().unwrap();
    assert_eq!((summary.evaluated, summary.failed), (1, 1));
    assert!(report.to_string().contains("average"));

    let summary_path = dir.path().join("summary.csv");
    write_summary_csv(&summary_path, report.successes()).unwrap();
    let text = std::fs::read_to_string(summary_path).unwrap();
    assert_eq!(text.lines().count(), 2);
}

//! CSV input and output.

mod calendar;
mod output;
mod sales;

pub use calendar::load_calendar;
pub use output::{write_evaluation_csv, write_forecast_csv, write_summary_csv};
pub use sales::{load_sales, SalesSource};

use crate::error::{ForecastError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Date layout used by a CSV source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateFormat {
    /// `YYYY-MM-DD`, optionally followed by a time of day.
    #[default]
    Iso,
    /// `M/D/YYYY`.
    MonthDayYear,
}

impl DateFormat {
    pub fn parse(&self, raw: &str) -> Result<NaiveDate> {
        let raw = raw.trim();
        let parsed = match self {
            DateFormat::Iso => NaiveDate::parse_from_str(raw, "%Y-%m-%d").or_else(|_| {
                chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|dt| dt.date())
            }),
            DateFormat::MonthDayYear => NaiveDate::parse_from_str(raw, "%m/%d/%Y"),
        };
        parsed.map_err(|err| ForecastError::DataLoad(format!("invalid date {raw:?}: {err}")))
    }
}

/// Parse a 0/1 indicator; accepts `1`, `1.0`, `true` and treats blanks as false.
pub(crate) fn parse_flag(raw: &str) -> Result<bool> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(false);
    }
    if let Ok(b) = raw.parse::<bool>() {
        return Ok(b);
    }
    raw.parse::<f64>()
        .map(|v| v != 0.0)
        .map_err(|_| ForecastError::DataLoad(format!("invalid indicator value {raw:?}")))
}

/// Prefix load errors with the file they came from.
pub(crate) fn with_path(path: &Path, err: ForecastError) -> ForecastError {
    match err {
        ForecastError::DataLoad(msg) => ForecastError::DataLoad(format!("{}: {msg}", path.display())),
        other => other,
    }
}

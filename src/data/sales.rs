//! Sales CSV loading.

use crate::core::{CalendarRow, SalesPoint, SalesSeries};
use crate::data::{parse_flag, with_path, DateFormat};
use crate::error::{ForecastError, Result};
use csv::StringRecord;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Where one category's sales history lives and how to read it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesSource {
    pub path: PathBuf,
    /// Column holding the daily quantity.
    #[serde(default = "default_value_column")]
    pub value_column: String,
    #[serde(default)]
    pub date_format: DateFormat,
}

fn default_value_column() -> String {
    "sales".to_string()
}

impl SalesSource {
    pub fn new(path: impl Into<PathBuf>, value_column: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            value_column: value_column.into(),
            date_format: DateFormat::Iso,
        }
    }

    pub fn with_date_format(mut self, date_format: DateFormat) -> Self {
        self.date_format = date_format;
        self
    }

    pub fn load(&self) -> Result<SalesSeries> {
        load_sales(&self.path, &self.value_column, self.date_format)
    }
}

/// Column positions resolved from the header row.
struct Columns {
    date: usize,
    value: usize,
    dow: Option<usize>,
    is_weekend: Option<usize>,
    is_closed: Option<usize>,
    is_event: Option<usize>,
    pre_event_peak: Option<usize>,
    restock_flag: Option<usize>,
}

impl Columns {
    fn resolve(headers: &StringRecord, value_column: &str) -> Result<Self> {
        let find = |name: &str| headers.iter().position(|h| h.trim() == name);
        let require = |name: &str| {
            find(name).ok_or_else(|| ForecastError::DataLoad(format!("missing column {name:?}")))
        };
        Ok(Self {
            date: require("date")?,
            value: require(value_column)?,
            dow: find("dow"),
            is_weekend: find("is_weekend"),
            is_closed: find("is_closed"),
            is_event: find("is_event"),
            pre_event_peak: find("pre_event_peak"),
            restock_flag: find("restock_flag"),
        })
    }

    fn flag(record: &StringRecord, column: Option<usize>) -> Result<Option<bool>> {
        match column.and_then(|i| record.get(i)) {
            Some(raw) => parse_flag(raw).map(Some),
            None => Ok(None),
        }
    }

    fn point(&self, record: &StringRecord, date_format: DateFormat) -> Result<SalesPoint> {
        let field = |i: usize| record.get(i).unwrap_or("");
        let date = date_format.parse(field(self.date))?;

        let raw = field(self.value).trim();
        let quantity = if raw.is_empty() {
            0.0
        } else {
            raw.parse::<f64>()
                .map_err(|_| ForecastError::DataLoad(format!("invalid quantity {raw:?} on {date}")))?
        };

        // Indicators missing from the file default to 0; weekday fields fall back to the date.
        let mut calendar = CalendarRow::from_date(date);
        if let Some(raw) = self
            .dow
            .and_then(|i| record.get(i))
            .map(str::trim)
            .filter(|raw| !raw.is_empty())
        {
            let dow = raw
                .parse::<f64>()
                .map_err(|_| ForecastError::DataLoad(format!("invalid dow {raw:?} on {date}")))?;
            if !(0.0..=6.0).contains(&dow) {
                return Err(ForecastError::DataLoad(format!(
                    "dow {dow} out of range on {date}"
                )));
            }
            calendar.dow = dow as u8;
        }
        if let Some(v) = Self::flag(record, self.is_weekend)? {
            calendar.is_weekend = v;
        }
        calendar.is_closed = Self::flag(record, self.is_closed)?.unwrap_or(false);
        calendar.is_event = Self::flag(record, self.is_event)?.unwrap_or(false);
        calendar.pre_event_peak = Self::flag(record, self.pre_event_peak)?.unwrap_or(false);
        calendar.restock_flag = Self::flag(record, self.restock_flag)?.unwrap_or(false);

        Ok(SalesPoint {
            date,
            quantity,
            calendar,
        })
    }
}

/// Load a sales CSV into a gap-free daily series.
pub fn load_sales(
    path: impl AsRef<Path>,
    value_column: &str,
    date_format: DateFormat,
) -> Result<SalesSeries> {
    let path = path.as_ref();
    let read = || -> Result<SalesSeries> {
        let mut reader = csv::Reader::from_path(path)?;
        let columns = Columns::resolve(reader.headers()?, value_column)?;

        let mut points = Vec::new();
        for record in reader.records() {
            points.push(columns.point(&record?, date_format)?);
        }
        if points.is_empty() {
            return Err(ForecastError::DataLoad("no data rows".into()));
        }
        SalesSeries::from_points(points)
    };
    read().map_err(|err| with_path(path, err))
}

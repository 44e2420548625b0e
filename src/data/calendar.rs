//! Calendar CSV loading.

use crate::core::{Calendar, CalendarRow};
use crate::data::{parse_flag, with_path, DateFormat};
use crate::error::{ForecastError, Result};
use serde::{Deserialize, Deserializer};
use std::path::Path;

#[derive(Debug, Deserialize)]
struct CalendarRecord {
    date: String,
    #[serde(default)]
    dow: Option<f64>,
    #[serde(default, deserialize_with = "flag")]
    is_weekend: Option<bool>,
    #[serde(default, deserialize_with = "flag")]
    is_national_holiday: Option<bool>,
    #[serde(default)]
    holiday_name: Option<String>,
    #[serde(default, deserialize_with = "flag")]
    is_event: Option<bool>,
    #[serde(default, deserialize_with = "flag")]
    pre_event_peak: Option<bool>,
    #[serde(default, deserialize_with = "flag")]
    is_closed: Option<bool>,
    #[serde(default, deserialize_with = "flag")]
    restock_flag: Option<bool>,
}

fn flag<'de, D>(deserializer: D) -> std::result::Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    raw.map(|s| parse_flag(&s).map_err(serde::de::Error::custom))
        .transpose()
}

impl CalendarRecord {
    fn into_row(self, date_format: DateFormat) -> Result<(chrono::NaiveDate, CalendarRow)> {
        let date = date_format.parse(&self.date)?;
        let derived = CalendarRow::from_date(date);
        let dow = match self.dow {
            Some(d) if (0.0..=6.0).contains(&d) => d as u8,
            Some(d) => {
                return Err(ForecastError::DataLoad(format!(
                    "dow {d} out of range on {date}"
                )))
            }
            None => derived.dow,
        };
        let row = CalendarRow {
            is_closed: self.is_closed.unwrap_or(false),
            dow,
            is_weekend: self.is_weekend.unwrap_or(derived.is_weekend),
            is_event: self.is_event.unwrap_or(false),
            pre_event_peak: self.pre_event_peak.unwrap_or(false),
            restock_flag: self.restock_flag.unwrap_or(false),
            is_national_holiday: self.is_national_holiday.unwrap_or(false),
            holiday_name: self.holiday_name.filter(|n| !n.trim().is_empty()),
        };
        Ok((date, row))
    }
}

/// Load a calendar CSV (`date, dow, is_weekend, is_national_holiday,
/// holiday_name, is_event, pre_event_peak, is_closed, restock_flag`).
///
/// Only `date` is required; absent indicators default to 0 and absent
/// weekday fields are derived from the date. Duplicate dates keep the first row.
pub fn load_calendar(path: impl AsRef<Path>, date_format: DateFormat) -> Result<Calendar> {
    let path = path.as_ref();
    let read = || -> Result<Calendar> {
        let mut reader = csv::Reader::from_path(path)?;
        let mut rows = Vec::new();
        for record in reader.deserialize::<CalendarRecord>() {
            rows.push(record?.into_row(date_format)?);
        }
        Ok(Calendar::from_rows(rows))
    };
    read().map_err(|err| with_path(path, err))
}

//! Per-date calendar indicators used as exogenous regressors.

use crate::error::{ForecastError, Result};
use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Names of the calendar regressors, in the order [`CalendarRow::regressors`] emits them.
pub const CALENDAR_REGRESSORS: [&str; 6] = [
    "is_closed",
    "dow",
    "is_weekend",
    "is_event",
    "pre_event_peak",
    "restock_flag",
];

/// Calendar indicators for a single day.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CalendarRow {
    pub is_closed: bool,
    /// Day of week, Monday = 0.
    pub dow: u8,
    pub is_weekend: bool,
    pub is_event: bool,
    pub pre_event_peak: bool,
    pub restock_flag: bool,
    /// Informational only; not a model regressor.
    pub is_national_holiday: bool,
    pub holiday_name: Option<String>,
}

impl CalendarRow {
    /// Row derived from the date alone: weekday, Saturday/Sunday weekend, no events.
    pub fn from_date(date: NaiveDate) -> Self {
        let dow = date.weekday().num_days_from_monday() as u8;
        Self {
            dow,
            is_weekend: dow >= 5,
            ..Default::default()
        }
    }

    /// Regressor values in [`CALENDAR_REGRESSORS`] order.
    pub fn regressors(&self) -> [f64; 6] {
        [
            flag(self.is_closed),
            f64::from(self.dow),
            flag(self.is_weekend),
            flag(self.is_event),
            flag(self.pre_event_peak),
            flag(self.restock_flag),
        ]
    }
}

fn flag(value: bool) -> f64 {
    if value {
        1.0
    } else {
        0.0
    }
}

/// What to do when a requested date has no calendar row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoveragePolicy {
    /// Fail with [`ForecastError::MissingCalendarCoverage`].
    #[default]
    Strict,
    /// Stop at the first uncovered date and report where coverage ended.
    Truncate,
    /// Fill uncovered dates with [`CalendarRow::from_date`] and report them.
    DeriveFromDate,
}

/// Calendar rows for a contiguous date range.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CalendarRange {
    pub rows: Vec<(NaiveDate, CalendarRow)>,
    /// Dates whose rows were derived from the date rather than read from the calendar.
    pub filled: Vec<NaiveDate>,
    /// First uncovered date when the range was truncated.
    pub missing_from: Option<NaiveDate>,
}

impl CalendarRange {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Whether every requested date came straight from the calendar.
    pub fn is_complete(&self) -> bool {
        self.filled.is_empty() && self.missing_from.is_none()
    }
}

/// Date-indexed calendar table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Calendar {
    rows: BTreeMap<NaiveDate, CalendarRow>,
}

impl Calendar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(date, row)` pairs; the first row seen for a date wins.
    pub fn from_rows<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = (NaiveDate, CalendarRow)>,
    {
        let mut calendar = Self::new();
        for (date, row) in rows {
            calendar.rows.entry(date).or_insert(row);
        }
        calendar
    }

    /// Calendar covering `start..=end` with every row derived from its date.
    pub fn derived(start: NaiveDate, end: NaiveDate) -> Self {
        Self::from_rows(
            start
                .iter_days()
                .take_while(|d| *d <= end)
                .map(|d| (d, CalendarRow::from_date(d))),
        )
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.rows.keys().next().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.rows.keys().next_back().copied()
    }

    pub fn get(&self, date: NaiveDate) -> Option<&CalendarRow> {
        self.rows.get(&date)
    }

    /// Row for `date`, failing when the calendar does not cover it.
    pub fn lookup(&self, date: NaiveDate) -> Result<&CalendarRow> {
        self.get(date)
            .ok_or(ForecastError::MissingCalendarCoverage { date })
    }

    /// Rows for every date in `start..=end`, in date order.
    ///
    /// An empty range (`end < start`) yields no rows.
    pub fn range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        policy: CoveragePolicy,
    ) -> Result<CalendarRange> {
        let mut range = CalendarRange::default();
        for date in start.iter_days().take_while(|d| *d <= end) {
            match (self.get(date), policy) {
                (Some(row), _) => range.rows.push((date, row.clone())),
                (None, CoveragePolicy::Strict) => {
                    return Err(ForecastError::MissingCalendarCoverage { date })
                }
                (None, CoveragePolicy::Truncate) => {
                    range.missing_from = Some(date);
                    break;
                }
                (None, CoveragePolicy::DeriveFromDate) => {
                    range.rows.push((date, CalendarRow::from_date(date)));
                    range.filled.push(date);
                }
            }
        }
        Ok(range)
    }

    /// Rows strictly after `after`, up to and including `until`.
    pub fn future_dates(
        &self,
        after: NaiveDate,
        until: NaiveDate,
        policy: CoveragePolicy,
    ) -> Result<CalendarRange> {
        self.range(after + Duration::days(1), until, policy)
    }

    /// The next `days` rows following `after`.
    pub fn horizon(
        &self,
        after: NaiveDate,
        days: usize,
        policy: CoveragePolicy,
    ) -> Result<CalendarRange> {
        if days == 0 {
            return Ok(CalendarRange::default());
        }
        self.future_dates(after, after + Duration::days(days as i64), policy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn from_date_uses_monday_zero() {
        // 2025-01-06 is a Monday
        let monday = CalendarRow::from_date(date(2025, 1, 6));
        assert_eq!(monday.dow, 0);
        assert!(!monday.is_weekend);

        let saturday = CalendarRow::from_date(date(2025, 1, 11));
        assert_eq!(saturday.dow, 5);
        assert!(saturday.is_weekend);

        let sunday = CalendarRow::from_date(date(2025, 1, 12));
        assert_eq!(sunday.dow, 6);
        assert!(sunday.is_weekend);
    }

    #[test]
    fn regressors_follow_column_order() {
        let row = CalendarRow {
            is_closed: true,
            dow: 3,
            is_event: true,
            restock_flag: true,
            ..Default::default()
        };
        assert_eq!(row.regressors(), [1.0, 3.0, 0.0, 1.0, 0.0, 1.0]);
        assert_eq!(CALENDAR_REGRESSORS.len(), row.regressors().len());
    }

    #[test]
    fn first_row_for_a_date_wins() {
        let first = CalendarRow {
            is_event: true,
            ..CalendarRow::from_date(date(2025, 3, 1))
        };
        let second = CalendarRow::from_date(date(2025, 3, 1));
        let calendar =
            Calendar::from_rows(vec![(date(2025, 3, 1), first.clone()), (date(2025, 3, 1), second)]);
        assert_eq!(calendar.len(), 1);
        assert_eq!(calendar.lookup(date(2025, 3, 1)).unwrap(), &first);
    }

    #[test]
    fn strict_range_fails_on_gap() {
        let mut calendar = Calendar::derived(date(2025, 1, 1), date(2025, 1, 5));
        calendar.rows.remove(&date(2025, 1, 3));

        let err = calendar
            .range(date(2025, 1, 1), date(2025, 1, 5), CoveragePolicy::Strict)
            .unwrap_err();
        assert_eq!(
            err,
            ForecastError::MissingCalendarCoverage {
                date: date(2025, 1, 3)
            }
        );
    }

    #[test]
    fn truncate_reports_where_coverage_ends() {
        let calendar = Calendar::derived(date(2025, 1, 1), date(2025, 1, 3));
        let range = calendar
            .range(date(2025, 1, 2), date(2025, 1, 6), CoveragePolicy::Truncate)
            .unwrap();
        assert_eq!(range.len(), 2);
        assert_eq!(range.missing_from, Some(date(2025, 1, 4)));
        assert!(!range.is_complete());
    }

    #[test]
    fn derive_policy_fills_and_reports() {
        let calendar = Calendar::derived(date(2025, 1, 1), date(2025, 1, 2));
        let range = calendar
            .range(date(2025, 1, 1), date(2025, 1, 4), CoveragePolicy::DeriveFromDate)
            .unwrap();
        assert_eq!(range.len(), 4);
        assert_eq!(range.filled, vec![date(2025, 1, 3), date(2025, 1, 4)]);
        assert_eq!(range.rows[3].1, CalendarRow::from_date(date(2025, 1, 4)));
    }

    #[test]
    fn future_dates_excludes_the_anchor() {
        let calendar = Calendar::derived(date(2025, 1, 1), date(2025, 1, 31));
        let range = calendar
            .future_dates(date(2025, 1, 10), date(2025, 1, 16), CoveragePolicy::Strict)
            .unwrap();
        assert_eq!(range.len(), 6);
        assert_eq!(range.rows[0].0, date(2025, 1, 11));
        assert!(range.is_complete());

        let horizon = calendar
            .horizon(date(2025, 1, 10), 7, CoveragePolicy::Strict)
            .unwrap();
        assert_eq!(horizon.len(), 7);
        assert_eq!(horizon.rows[6].0, date(2025, 1, 17));
    }

    #[test]
    fn empty_range_when_end_precedes_start() {
        let calendar = Calendar::derived(date(2025, 1, 1), date(2025, 1, 31));
        let range = calendar
            .range(date(2025, 1, 10), date(2025, 1, 5), CoveragePolicy::Strict)
            .unwrap();
        assert!(range.is_empty());
    }
}

//! Daily sales series for one product category.

use crate::core::calendar::{Calendar, CalendarRow};
use crate::error::{ForecastError, Result};
use chrono::{Duration, NaiveDate};
use serde::Serialize;

/// One day of observed sales together with that day's calendar indicators.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SalesPoint {
    pub date: NaiveDate,
    pub quantity: f64,
    pub calendar: CalendarRow,
}

impl SalesPoint {
    /// Point whose calendar row is derived from the date.
    pub fn new(date: NaiveDate, quantity: f64) -> Self {
        Self {
            date,
            quantity,
            calendar: CalendarRow::from_date(date),
        }
    }
}

/// Gap-free, strictly increasing daily series.
///
/// Construction sorts by date, keeps the first point of any duplicated date,
/// treats non-finite quantities as zero and inserts zero-quantity points for
/// missing days.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SalesSeries {
    points: Vec<SalesPoint>,
}

impl SalesSeries {
    pub fn from_points(mut points: Vec<SalesPoint>) -> Result<Self> {
        if points.is_empty() {
            return Err(ForecastError::EmptyData);
        }

        // Stable sort keeps input order among equal dates, so dedup keeps the first.
        points.sort_by_key(|p| p.date);
        points.dedup_by_key(|p| p.date);

        let mut filled = Vec::with_capacity(points.len());
        for mut point in points {
            if let Some(prev) = filled.last().map(|p: &SalesPoint| p.date) {
                let mut gap = prev + Duration::days(1);
                while gap < point.date {
                    filled.push(SalesPoint::new(gap, 0.0));
                    gap += Duration::days(1);
                }
            }
            if !point.quantity.is_finite() {
                point.quantity = 0.0;
            }
            filled.push(point);
        }

        Ok(Self { points: filled })
    }

    /// Consecutive days starting at `start`, calendar derived from each date.
    pub fn from_quantities(start: NaiveDate, quantities: &[f64]) -> Result<Self> {
        Self::from_points(
            quantities
                .iter()
                .enumerate()
                .map(|(i, &q)| SalesPoint::new(start + Duration::days(i as i64), q))
                .collect(),
        )
    }

    /// Replace each point's calendar row with the calendar's row for that date, where present.
    pub fn apply_calendar(&mut self, calendar: &Calendar) {
        for point in &mut self.points {
            if let Some(row) = calendar.get(point.date) {
                point.calendar = row.clone();
            }
        }
    }

    pub fn points(&self) -> &[SalesPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first_date(&self) -> NaiveDate {
        self.points[0].date
    }

    pub fn last_date(&self) -> NaiveDate {
        self.points[self.points.len() - 1].date
    }

    pub fn quantities(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.quantity).collect()
    }

    /// The last `n` points (all of them when `n` exceeds the length).
    pub fn tail(&self, n: usize) -> &[SalesPoint] {
        &self.points[self.points.len().saturating_sub(n)..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, d).unwrap()
    }

    #[test]
    fn sorts_and_fills_gaps_with_zero() {
        let series = SalesSeries::from_points(vec![
            SalesPoint::new(date(1, 4), 7.0),
            SalesPoint::new(date(1, 1), 3.0),
        ])
        .unwrap();

        assert_eq!(series.len(), 4);
        assert_eq!(series.quantities(), vec![3.0, 0.0, 0.0, 7.0]);
        assert_eq!(series.first_date(), date(1, 1));
        assert_eq!(series.last_date(), date(1, 4));
        // Filled days carry a calendar row derived from their own date.
        assert_eq!(
            series.points()[1].calendar,
            CalendarRow::from_date(date(1, 2))
        );
    }

    #[test]
    fn duplicate_dates_keep_first() {
        let series = SalesSeries::from_points(vec![
            SalesPoint::new(date(1, 1), 1.0),
            SalesPoint::new(date(1, 2), 5.0),
            SalesPoint::new(date(1, 2), 9.0),
            SalesPoint::new(date(1, 3), 2.0),
        ])
        .unwrap();
        assert_eq!(series.quantities(), vec![1.0, 5.0, 2.0]);
    }

    #[test]
    fn non_finite_quantities_become_zero() {
        let series = SalesSeries::from_quantities(date(1, 1), &[1.0, f64::NAN, 3.0]).unwrap();
        assert_eq!(series.quantities(), vec![1.0, 0.0, 3.0]);
    }

    #[test]
    fn empty_input_is_rejected() {
        assert_eq!(
            SalesSeries::from_points(vec![]).unwrap_err(),
            ForecastError::EmptyData
        );
    }

    #[test]
    fn apply_calendar_overrides_matching_dates() {
        let mut series = SalesSeries::from_quantities(date(1, 1), &[1.0, 2.0, 3.0]).unwrap();
        let event = CalendarRow {
            is_event: true,
            ..CalendarRow::from_date(date(1, 2))
        };
        series.apply_calendar(&Calendar::from_rows(vec![(date(1, 2), event.clone())]));

        assert_eq!(series.points()[1].calendar, event);
        assert!(!series.points()[0].calendar.is_event);
    }

    #[test]
    fn tail_returns_most_recent_points() {
        let series = SalesSeries::from_quantities(date(1, 1), &[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(series.tail(2).len(), 2);
        assert_eq!(series.tail(2)[0].quantity, 3.0);
        assert_eq!(series.tail(10).len(), 4);
    }
}

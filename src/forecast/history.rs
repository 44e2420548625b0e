//! Append-only feature history for one recursive run.

use crate::error::{ForecastError, Result};
use crate::features::{FeatureRow, FeatureTable};
use chrono::NaiveDate;

/// Feature rows seen so far: the training table followed by one synthetic
/// row per forecast step. Rows can only be appended.
#[derive(Debug, Clone, PartialEq)]
pub struct RunningHistory {
    rows: Vec<FeatureRow>,
}

impl RunningHistory {
    pub fn from_table(table: &FeatureTable) -> Self {
        Self {
            rows: table.rows.clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[FeatureRow] {
        &self.rows
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.rows.last().map(|r| r.date)
    }

    /// Smoothed quantity `k` rows back from the end (`k = 1` is the last row).
    pub fn lag(&self, k: usize) -> Result<f64> {
        if k == 0 || k > self.rows.len() {
            return Err(ForecastError::InsufficientHistory {
                needed: k.max(1),
                got: self.rows.len(),
            });
        }
        Ok(self.rows[self.rows.len() - k].smoothed)
    }

    /// Mean smoothed quantity over the last `k` rows.
    pub fn trailing_mean(&self, k: usize) -> Result<f64> {
        if k == 0 || k > self.rows.len() {
            return Err(ForecastError::InsufficientHistory {
                needed: k.max(1),
                got: self.rows.len(),
            });
        }
        let tail = &self.rows[self.rows.len() - k..];
        Ok(tail.iter().map(|r| r.smoothed).sum::<f64>() / k as f64)
    }

    pub fn push(&mut self, row: FeatureRow) {
        self.rows.push(row);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SalesSeries;
    use crate::features::{build_features, FeatureSpec};
    use approx::assert_relative_eq;

    fn history(quantities: &[f64]) -> RunningHistory {
        let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let series = SalesSeries::from_quantities(start, quantities).unwrap();
        RunningHistory::from_table(&build_features(&series, 1.0, &FeatureSpec::default()).unwrap())
    }

    #[test]
    fn lag_reads_from_the_end() {
        let h = history(&(1..=12).map(f64::from).collect::<Vec<_>>());
        // table rows hold quantities 8..=12
        assert_eq!(h.len(), 5);
        assert_relative_eq!(h.lag(1).unwrap(), 12.0);
        assert_relative_eq!(h.lag(5).unwrap(), 8.0);
        assert_relative_eq!(h.trailing_mean(3).unwrap(), 11.0);
    }

    #[test]
    fn short_history_is_guarded() {
        let h = history(&[1.0; 9]);
        assert_eq!(h.len(), 2);
        assert_eq!(
            h.lag(3).unwrap_err(),
            ForecastError::InsufficientHistory { needed: 3, got: 2 }
        );
        assert!(h.trailing_mean(7).is_err());
        assert!(h.lag(0).is_err());
    }

    #[test]
    fn push_grows_the_history() {
        let mut h = history(&[1.0; 10]);
        let mut row = h.rows()[0].clone();
        row.smoothed = 42.0;
        let before = h.len();
        h.push(row);
        assert_eq!(h.len(), before + 1);
        assert_relative_eq!(h.lag(1).unwrap(), 42.0);
    }
}

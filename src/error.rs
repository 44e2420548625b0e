//! Error types for the vantedjo-forecast library.

use chrono::NaiveDate;
use thiserror::Error;

/// Result type alias for forecasting operations.
pub type Result<T> = std::result::Result<T, ForecastError>;

/// Errors that can occur while loading data, fitting, forecasting or evaluating.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ForecastError {
    /// Input data is empty.
    #[error("empty input data")]
    EmptyData,

    /// Not enough rows to derive lag/MA features, seed a recursive run or split train/test.
    #[error("insufficient history: need at least {needed} rows, got {got}")]
    InsufficientHistory { needed: usize, got: usize },

    /// The estimator could not produce a usable fit.
    #[error("model failed to converge: {0}")]
    Convergence(String),

    /// Linear algebra breakdown inside the estimator.
    #[error("numerical error: {0}")]
    Numerical(String),

    /// A requested date has no calendar row.
    #[error("calendar has no row for {date}")]
    MissingCalendarCoverage { date: NaiveDate },

    /// An input file is missing or malformed.
    #[error("failed to load data: {0}")]
    DataLoad(String),

    /// Invalid parameter value.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Dimension mismatch between data structures.
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
}

impl ForecastError {
    /// Whether a baseline forecast is an acceptable substitute for this failure.
    pub fn is_model_failure(&self) -> bool {
        matches!(
            self,
            ForecastError::Convergence(_) | ForecastError::Numerical(_)
        )
    }
}

impl From<csv::Error> for ForecastError {
    fn from(err: csv::Error) -> Self {
        ForecastError::DataLoad(err.to_string())
    }
}

impl From<std::io::Error> for ForecastError {
    fn from(err: std::io::Error) -> Self {
        ForecastError::DataLoad(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_are_descriptive() {
        let err = ForecastError::InsufficientHistory { needed: 8, got: 5 };
        assert_eq!(
            err.to_string(),
            "insufficient history: need at least 8 rows, got 5"
        );

        let err = ForecastError::MissingCalendarCoverage {
            date: NaiveDate::from_ymd_opt(2025, 1, 8).unwrap(),
        };
        assert_eq!(err.to_string(), "calendar has no row for 2025-01-08");

        let err = ForecastError::Convergence("objective is not finite".to_string());
        assert_eq!(
            err.to_string(),
            "model failed to converge: objective is not finite"
        );
    }

    #[test]
    fn only_estimator_failures_allow_fallback() {
        assert!(ForecastError::Convergence("x".into()).is_model_failure());
        assert!(ForecastError::Numerical("x".into()).is_model_failure());
        assert!(!ForecastError::DataLoad("x".into()).is_model_failure());
        assert!(!ForecastError::InsufficientHistory { needed: 1, got: 0 }.is_model_failure());
    }

    #[test]
    fn io_errors_become_data_load_errors() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.csv");
        let err: ForecastError = io.into();
        assert!(matches!(err, ForecastError::DataLoad(msg) if msg.contains("missing.csv")));
    }
}

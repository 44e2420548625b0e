//! Estimator interface separating the forecasting loop from the model internals.

use crate::error::{ForecastError, Result};

/// Column-major exogenous regressors with named columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExogMatrix {
    names: Vec<String>,
    columns: Vec<Vec<f64>>,
    rows: usize,
}

impl ExogMatrix {
    /// Build from row-major observations, one value per name in each row.
    pub fn from_rows(names: Vec<String>, rows: &[Vec<f64>]) -> Result<Self> {
        let mut columns = vec![Vec::with_capacity(rows.len()); names.len()];
        for row in rows {
            if row.len() != names.len() {
                return Err(ForecastError::DimensionMismatch {
                    expected: names.len(),
                    got: row.len(),
                });
            }
            for (column, &value) in columns.iter_mut().zip(row) {
                column.push(value);
            }
        }
        Ok(Self {
            names,
            columns,
            rows: rows.len(),
        })
    }

    /// Matrix with column names but no observations.
    pub fn empty(names: Vec<String>) -> Self {
        let columns = vec![Vec::new(); names.len()];
        Self {
            names,
            columns,
            rows: 0,
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn columns(&self) -> &[Vec<f64>] {
        &self.columns
    }

    pub fn nrows(&self) -> usize {
        self.rows
    }

    pub fn ncols(&self) -> usize {
        self.names.len()
    }

    /// Observation `t` across all columns.
    pub fn row(&self, t: usize) -> Option<Vec<f64>> {
        (t < self.rows).then(|| self.columns.iter().map(|c| c[t]).collect())
    }
}

/// Something that can be fitted to a log-scale series with exogenous regressors.
pub trait Estimator {
    type Fitted: FittedModel;

    /// Fit to `endog` (one value per row of `exog`).
    fn fit(&self, endog: &[f64], exog: &ExogMatrix) -> Result<Self::Fitted>;
}

/// An immutable fitted model.
///
/// Forecasts are produced from the end of the fitting window; `future_exog`
/// must have `steps` rows and the same columns the model was fitted with.
pub trait FittedModel {
    /// Point forecasts on the fitting scale.
    fn forecast(&self, steps: usize, future_exog: &ExogMatrix) -> Result<Vec<f64>>;

    /// Short human-readable model description.
    fn name(&self) -> &str;
}

impl<M: FittedModel + ?Sized> FittedModel for &M {
    fn forecast(&self, steps: usize, future_exog: &ExogMatrix) -> Result<Vec<f64>> {
        (**self).forecast(steps, future_exog)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

impl<M: FittedModel + ?Sized> FittedModel for Box<M> {
    fn forecast(&self, steps: usize, future_exog: &ExogMatrix) -> Result<Vec<f64>> {
        (**self).forecast(steps, future_exog)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

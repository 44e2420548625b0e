//! Ordinary least squares for the regression part of a regression-with-ARIMA-errors model.

use crate::error::{ForecastError, Result};

/// Ridge added to the normal-equation diagonal.
const DIAGONAL_JITTER: f64 = 1e-8;

/// Columns whose sample variance is below this are treated as constant.
const CONSTANT_COLUMN_VARIANCE: f64 = 1e-12;

/// Fitted OLS coefficients.
#[derive(Debug, Clone, PartialEq)]
pub struct OlsFit {
    /// Intercept term.
    pub intercept: f64,
    /// One coefficient per column that took part in the fit.
    pub coefficients: Vec<f64>,
    /// Index into the original column list for each coefficient.
    pub used_columns: Vec<usize>,
    /// Total number of columns the fit was given.
    pub num_columns: usize,
}

impl OlsFit {
    /// Predict a single observation given all original columns in order.
    pub fn predict_row(&self, row: &[f64]) -> Result<f64> {
        if row.len() != self.num_columns {
            return Err(ForecastError::DimensionMismatch {
                expected: self.num_columns,
                got: row.len(),
            });
        }
        Ok(self
            .used_columns
            .iter()
            .zip(&self.coefficients)
            .fold(self.intercept, |acc, (&col, beta)| acc + beta * row[col]))
    }

    /// Residuals `y - ŷ` over column-major regressors.
    pub fn residuals(&self, y: &[f64], columns: &[Vec<f64>]) -> Result<Vec<f64>> {
        check_columns(y.len(), columns)?;
        let mut row = vec![0.0; columns.len()];
        y.iter()
            .enumerate()
            .map(|(t, &yt)| {
                for (slot, column) in row.iter_mut().zip(columns) {
                    *slot = column[t];
                }
                self.predict_row(&row).map(|fit| yt - fit)
            })
            .collect()
    }
}

fn check_columns(n: usize, columns: &[Vec<f64>]) -> Result<()> {
    for column in columns {
        if column.len() != n {
            return Err(ForecastError::DimensionMismatch {
                expected: n,
                got: column.len(),
            });
        }
    }
    Ok(())
}

fn variance(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n
}

/// Fit `y = intercept + Σ βᵢ xᵢ` by solving the normal equations with Cholesky.
///
/// Constant columns are skipped (their effect is absorbed by the intercept)
/// and recorded as unused so prediction ignores them.
pub fn ols_fit(y: &[f64], columns: &[Vec<f64>]) -> Result<OlsFit> {
    let n = y.len();
    if n == 0 {
        return Err(ForecastError::EmptyData);
    }
    check_columns(n, columns)?;

    let used_columns: Vec<usize> = columns
        .iter()
        .enumerate()
        .filter(|(_, column)| variance(column) > CONSTANT_COLUMN_VARIANCE)
        .map(|(i, _)| i)
        .collect();

    let k = used_columns.len() + 1;
    if n < k {
        return Err(ForecastError::InsufficientHistory { needed: k, got: n });
    }

    // Design row: [1, x_used...]
    let design = |t: usize| -> Vec<f64> {
        std::iter::once(1.0)
            .chain(used_columns.iter().map(|&c| columns[c][t]))
            .collect()
    };

    let mut xtx = vec![vec![0.0; k]; k];
    let mut xty = vec![0.0; k];
    for (t, &yt) in y.iter().enumerate() {
        let x = design(t);
        for i in 0..k {
            xty[i] += x[i] * yt;
            for j in 0..=i {
                xtx[i][j] += x[i] * x[j];
            }
        }
    }
    for i in 0..k {
        for j in 0..i {
            xtx[j][i] = xtx[i][j];
        }
        xtx[i][i] += DIAGONAL_JITTER;
    }

    let beta = cholesky_solve(&xtx, &xty).ok_or_else(|| {
        ForecastError::Numerical("normal equations are not positive definite".into())
    })?;

    if beta.iter().any(|b| !b.is_finite()) {
        return Err(ForecastError::Numerical(
            "regression coefficients are not finite".into(),
        ));
    }

    Ok(OlsFit {
        intercept: beta[0],
        coefficients: beta[1..].to_vec(),
        used_columns,
        num_columns: columns.len(),
    })
}

/// Solve `A x = b` for symmetric positive definite `A`.
fn cholesky_solve(a: &[Vec<f64>], b: &[f64]) -> Option<Vec<f64>> {
    let n = b.len();
    let mut l = vec![vec![0.0; n]; n];

    for i in 0..n {
        for j in 0..=i {
            let sum = a[i][j] - (0..j).map(|k| l[i][k] * l[j][k]).sum::<f64>();
            if i == j {
                if sum <= 0.0 || !sum.is_finite() {
                    return None;
                }
                l[i][i] = sum.sqrt();
            } else {
                l[i][j] = sum / l[j][j];
            }
        }
    }

    let mut z = vec![0.0; n];
    for i in 0..n {
        z[i] = (b[i] - (0..i).map(|j| l[i][j] * z[j]).sum::<f64>()) / l[i][i];
    }

    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        x[i] = (z[i] - ((i + 1)..n).map(|j| l[j][i] * x[j]).sum::<f64>()) / l[i][i];
    }

    Some(x)
}

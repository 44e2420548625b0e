//! Linear regression with seasonal ARIMA errors.
//!
//! The regression part is fitted by OLS on the exogenous columns; the OLS
//! residuals are then modelled as SARIMA(p,d,q)(P,D,Q,s) by conditional sum
//! of squares, minimised with Nelder-Mead.

use crate::error::{ForecastError, Result};
use crate::models::sarimax::diff::{difference, differencing_polynomial, integrate, poly_mul};
use crate::models::{Estimator, ExogMatrix, FittedModel};
use crate::utils::ols::{ols_fit, OlsFit};
use crate::utils::optimization::{nelder_mead, NelderMeadConfig};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Coefficients are kept inside this box for stationarity/invertibility.
const COEFFICIENT_BOUND: f64 = 0.99;

/// Non-seasonal order `(p, d, q)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArimaOrder {
    pub p: usize,
    pub d: usize,
    pub q: usize,
}

impl ArimaOrder {
    pub fn new(p: usize, d: usize, q: usize) -> Self {
        Self { p, d, q }
    }
}

/// Seasonal order `(P, D, Q, period)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonalOrder {
    pub p: usize,
    pub d: usize,
    pub q: usize,
    pub period: usize,
}

impl SeasonalOrder {
    pub fn new(p: usize, d: usize, q: usize, period: usize) -> Self {
        Self { p, d, q, period }
    }

    /// No seasonal component.
    pub fn none() -> Self {
        Self::new(0, 0, 0, 0)
    }

    fn is_active(&self) -> bool {
        self.period > 1
    }
}

/// SARIMAX estimator configuration.
#[derive(Debug, Clone)]
pub struct SarimaxEstimator {
    order: ArimaOrder,
    seasonal: SeasonalOrder,
    optimizer: NelderMeadConfig,
}

impl SarimaxEstimator {
    pub fn new(order: ArimaOrder, seasonal: SeasonalOrder) -> Self {
        Self {
            order,
            seasonal,
            optimizer: NelderMeadConfig {
                max_iter: 1000,
                tolerance: 1e-8,
                ..Default::default()
            },
        }
    }

    pub fn order(&self) -> ArimaOrder {
        self.order
    }

    pub fn seasonal_order(&self) -> SeasonalOrder {
        self.seasonal
    }

    fn seasonal_terms(&self) -> (usize, usize, usize) {
        if self.seasonal.is_active() {
            (self.seasonal.p, self.seasonal.d, self.seasonal.q)
        } else {
            (0, 0, 0)
        }
    }

    fn has_intercept(&self) -> bool {
        self.order.d + self.seasonal_terms().1 == 0
    }

    fn layout(&self) -> ParamLayout {
        let (sp, _, sq) = self.seasonal_terms();
        ParamLayout {
            p: self.order.p,
            q: self.order.q,
            sp,
            sq,
            period: self.seasonal.period,
            intercept: self.has_intercept(),
        }
    }
}

impl fmt::Display for SarimaxEstimator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let o = self.order;
        let s = self.seasonal;
        write!(
            f,
            "SARIMAX({},{},{})({},{},{},{})",
            o.p, o.d, o.q, s.p, s.d, s.q, s.period
        )
    }
}

/// Position of each coefficient group in the optimiser's parameter vector.
#[derive(Debug, Clone, Copy)]
struct ParamLayout {
    p: usize,
    q: usize,
    sp: usize,
    sq: usize,
    period: usize,
    intercept: bool,
}

impl ParamLayout {
    fn len(&self) -> usize {
        self.p + self.sp + self.q + self.sq + usize::from(self.intercept)
    }

    fn initial(&self, mean: f64) -> Vec<f64> {
        let mut init = Vec::with_capacity(self.len());
        init.extend((0..self.p).map(|i| 0.1 / (i + 1) as f64));
        init.extend((0..self.sp).map(|i| 0.1 / (i + 1) as f64));
        init.extend((0..self.q).map(|i| 0.1 / (i + 1) as f64));
        init.extend((0..self.sq).map(|i| 0.1 / (i + 1) as f64));
        if self.intercept {
            init.push(mean);
        }
        init
    }

    fn bounds(&self) -> Vec<(f64, f64)> {
        let coefficients = self.len() - usize::from(self.intercept);
        let mut bounds = vec![(-COEFFICIENT_BOUND, COEFFICIENT_BOUND); coefficients];
        if self.intercept {
            bounds.push((f64::NEG_INFINITY, f64::INFINITY));
        }
        bounds
    }

    fn unpack(&self, params: &[f64]) -> ArmaPolynomials {
        let (ar, rest) = params.split_at(self.p);
        let (sar, rest) = rest.split_at(self.sp);
        let (ma, rest) = rest.split_at(self.q);
        let (sma, rest) = rest.split_at(self.sq);
        let intercept = if self.intercept { rest[0] } else { 0.0 };

        // φ(B)Φ(B^s) = 1 - Σ a_j B^j, so the AR lag weights are the negated tail.
        let ar_poly = poly_mul(
            &lag_polynomial(ar, 1, -1.0),
            &lag_polynomial(sar, self.period, -1.0),
        );
        let ma_poly = poly_mul(
            &lag_polynomial(ma, 1, 1.0),
            &lag_polynomial(sma, self.period, 1.0),
        );

        ArmaPolynomials {
            ar: ar_poly.iter().skip(1).map(|c| -c).collect(),
            ma: ma_poly.into_iter().skip(1).collect(),
            intercept,
        }
    }
}

/// `1 + sign·(c₁B^step + c₂B^{2·step} + …)`.
fn lag_polynomial(coefficients: &[f64], step: usize, sign: f64) -> Vec<f64> {
    let mut poly = vec![0.0; coefficients.len() * step + 1];
    poly[0] = 1.0;
    for (i, c) in coefficients.iter().enumerate() {
        poly[(i + 1) * step] = sign * c;
    }
    poly
}

/// Expanded ARMA lag weights: `w_t - μ = Σ ar_j (w_{t-j} - μ) + e_t + Σ ma_j e_{t-j}`.
#[derive(Debug, Clone, PartialEq)]
struct ArmaPolynomials {
    ar: Vec<f64>,
    ma: Vec<f64>,
    intercept: f64,
}

impl ArmaPolynomials {
    /// One-step prediction at `t` from observed `w` and past errors `e`.
    fn predict(&self, w: &[f64], e: &[f64], t: usize) -> f64 {
        let mu = self.intercept;
        let ar: f64 = self
            .ar
            .iter()
            .enumerate()
            .map(|(j, a)| a * (w[t - 1 - j] - mu))
            .sum();
        let ma: f64 = self
            .ma
            .iter()
            .enumerate()
            .filter(|(j, _)| *j < t)
            .map(|(j, m)| m * e[t - 1 - j])
            .sum();
        mu + ar + ma
    }

    /// Conditional residuals; the first `ar.len()` entries are zero.
    fn residuals(&self, w: &[f64]) -> Vec<f64> {
        let mut e = vec![0.0; w.len()];
        for t in self.ar.len()..w.len() {
            e[t] = w[t] - self.predict(w, &e, t);
        }
        e
    }

    fn css(&self, w: &[f64]) -> f64 {
        self.residuals(w)
            .iter()
            .skip(self.ar.len())
            .map(|e| e * e)
            .sum()
    }
}

impl Estimator for SarimaxEstimator {
    type Fitted = FittedSarimax;

    fn fit(&self, endog: &[f64], exog: &ExogMatrix) -> Result<FittedSarimax> {
        if endog.is_empty() {
            return Err(ForecastError::EmptyData);
        }
        if exog.nrows() != endog.len() {
            return Err(ForecastError::DimensionMismatch {
                expected: endog.len(),
                got: exog.nrows(),
            });
        }
        if endog.iter().any(|v| !v.is_finite()) {
            return Err(ForecastError::Numerical(
                "endogenous series contains non-finite values".into(),
            ));
        }

        // Fewer rows than regressors cannot be fitted; callers treat that like divergence.
        let regression = ols_fit(endog, exog.columns()).map_err(|err| match err {
            ForecastError::InsufficientHistory { needed, got } => ForecastError::Convergence(
                format!("{got} training rows cannot determine {needed} regression terms"),
            ),
            other => other,
        })?;
        let errors = regression.residuals(endog, exog.columns())?;

        let (_, seasonal_d, _) = self.seasonal_terms();
        let diff_poly = differencing_polynomial(self.order.d, seasonal_d, self.seasonal.period);
        let w = difference(&errors, &diff_poly);

        let layout = self.layout();
        let ar_span = layout.p + layout.sp * layout.period;
        let needed = ar_span + layout.len() + 1;
        if w.len() < needed {
            return Err(ForecastError::Convergence(format!(
                "{} observations after differencing, need at least {needed}",
                w.len()
            )));
        }

        let mean = w.iter().sum::<f64>() / w.len() as f64;
        let bounds = layout.bounds();
        let minimum = nelder_mead(
            |params| layout.unpack(params).css(&w),
            &layout.initial(mean),
            Some(&bounds),
            self.optimizer,
        );

        if !minimum.value.is_finite() || minimum.value == f64::MAX {
            return Err(ForecastError::Convergence(
                "conditional sum of squares is not finite".into(),
            ));
        }
        if !minimum.converged {
            debug!(
                iterations = minimum.iterations,
                "optimizer stopped at the iteration limit"
            );
        }

        let arma = layout.unpack(&minimum.point);
        let residuals = arma.residuals(&w);
        let n_eff = (w.len() - arma.ar.len()) as f64;
        let sigma2 = minimum.value / n_eff;

        debug!(
            model = %self,
            css = minimum.value,
            sigma2,
            iterations = minimum.iterations,
            "fitted regression errors"
        );

        Ok(FittedSarimax {
            name: self.to_string(),
            exog_names: exog.names().to_vec(),
            regression,
            params: minimum.point,
            arma,
            diff_poly,
            errors,
            w,
            residuals,
            sigma2,
        })
    }
}

/// A fitted regression-with-SARIMA-errors model.
#[derive(Debug, Clone)]
pub struct FittedSarimax {
    name: String,
    exog_names: Vec<String>,
    regression: OlsFit,
    params: Vec<f64>,
    arma: ArmaPolynomials,
    diff_poly: Vec<f64>,
    /// Regression errors over the training window.
    errors: Vec<f64>,
    /// Differenced regression errors.
    w: Vec<f64>,
    /// ARMA innovations on the differenced scale.
    residuals: Vec<f64>,
    sigma2: f64,
}

impl FittedSarimax {
    pub fn regression(&self) -> &OlsFit {
        &self.regression
    }

    /// Raw ARMA parameters: AR, seasonal AR, MA, seasonal MA, then the intercept if any.
    pub fn params(&self) -> &[f64] {
        &self.params
    }

    /// Innovation variance estimate.
    pub fn sigma2(&self) -> f64 {
        self.sigma2
    }

    pub fn exog_names(&self) -> &[String] {
        &self.exog_names
    }

    /// Regression-error forecasts for the `steps` days after the training window.
    fn error_forecast(&self, steps: usize) -> Vec<f64> {
        let n = self.w.len();
        let mut w = self.w.clone();
        let mut e = self.residuals.clone();
        for t in n..n + steps {
            let next = self.arma.predict(&w, &e, t);
            w.push(next);
            e.push(0.0);
        }
        integrate(&self.errors, &self.diff_poly, &w[n..])
    }
}

impl FittedModel for FittedSarimax {
    fn forecast(&self, steps: usize, future_exog: &ExogMatrix) -> Result<Vec<f64>> {
        if future_exog.nrows() != steps {
            return Err(ForecastError::DimensionMismatch {
                expected: steps,
                got: future_exog.nrows(),
            });
        }
        if future_exog.ncols() != self.exog_names.len() {
            return Err(ForecastError::DimensionMismatch {
                expected: self.exog_names.len(),
                got: future_exog.ncols(),
            });
        }

        self.error_forecast(steps)
            .into_iter()
            .enumerate()
            .map(|(h, error)| {
                let row = future_exog.row(h).unwrap_or_default();
                let mean = self.regression.predict_row(&row)?;
                let value = mean + error;
                if value.is_finite() {
                    Ok(value)
                } else {
                    Err(ForecastError::Numerical(format!(
                        "forecast at step {} is not finite",
                        h + 1
                    )))
                }
            })
            .collect()
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn no_exog(n: usize) -> ExogMatrix {
        ExogMatrix::from_rows(vec![], &vec![vec![]; n]).unwrap()
    }

    fn ar1_series(phi: f64, n: usize) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(42);
        let mut values = vec![0.0];
        for i in 1..n {
            let shock: f64 = rng.gen_range(-0.5..0.5);
            values.push(phi * values[i - 1] + shock);
        }
        values
    }

    #[test]
    fn display_names_orders() {
        let est = SarimaxEstimator::new(ArimaOrder::new(0, 1, 1), SeasonalOrder::new(0, 1, 1, 7));
        assert_eq!(est.to_string(), "SARIMAX(0,1,1)(0,1,1,7)");
    }

    #[test]
    fn lag_polynomials_expand_multiplicatively() {
        let layout = ParamLayout {
            p: 1,
            q: 1,
            sp: 1,
            sq: 1,
            period: 7,
            intercept: false,
        };
        // params: φ1, Φ1, θ1, Θ1
        let arma = layout.unpack(&[0.5, 0.4, 0.3, 0.2]);
        assert_eq!(arma.ar.len(), 8);
        assert_relative_eq!(arma.ar[0], 0.5);
        assert_relative_eq!(arma.ar[6], 0.4);
        assert_relative_eq!(arma.ar[7], -0.2);
        assert_eq!(arma.ma.len(), 8);
        assert_relative_eq!(arma.ma[0], 0.3);
        assert_relative_eq!(arma.ma[6], 0.2);
        assert_relative_eq!(arma.ma[7], 0.06);
    }

    #[test]
    fn recovers_ar1_coefficient() {
        let y = ar1_series(0.7, 200);
        let est = SarimaxEstimator::new(ArimaOrder::new(1, 0, 0), SeasonalOrder::none());
        let fitted = est.fit(&y, &no_exog(y.len())).unwrap();
        assert!(
            (fitted.params()[0] - 0.7).abs() < 0.15,
            "phi = {}",
            fitted.params()[0]
        );
        assert!(fitted.sigma2() > 0.0);
    }

    #[test]
    fn regression_coefficients_are_recovered() {
        let n = 60;
        let weekend: Vec<f64> = (0..n).map(|i| if i % 7 >= 5 { 1.0 } else { 0.0 }).collect();
        let y: Vec<f64> = weekend
            .iter()
            .enumerate()
            .map(|(i, w)| 2.0 + 0.8 * w + 0.01 * ((i * 31 % 17) as f64 - 8.0))
            .collect();
        let rows: Vec<Vec<f64>> = weekend.iter().map(|w| vec![*w]).collect();
        let exog = ExogMatrix::from_rows(vec!["is_weekend".into()], &rows).unwrap();

        let est = SarimaxEstimator::new(ArimaOrder::new(0, 0, 1), SeasonalOrder::none());
        let fitted = est.fit(&y, &exog).unwrap();
        assert_relative_eq!(fitted.regression().coefficients[0], 0.8, epsilon = 0.05);

        let future = ExogMatrix::from_rows(vec!["is_weekend".into()], &[vec![0.0], vec![1.0]])
            .unwrap();
        let forecast = fitted.forecast(2, &future).unwrap();
        assert!(forecast[1] - forecast[0] > 0.6);
    }

    #[test]
    fn differenced_model_continues_trend_level() {
        let y: Vec<f64> = (0..40).map(|i| 5.0 + 0.1 * i as f64).collect();
        let est = SarimaxEstimator::new(ArimaOrder::new(0, 1, 1), SeasonalOrder::none());
        let fitted = est.fit(&y, &no_exog(40)).unwrap();
        let forecast = fitted.forecast(1, &no_exog(1)).unwrap();
        // Without a drift term the level stays near the last observation.
        assert!((forecast[0] - y[39]).abs() < 0.5, "forecast = {}", forecast[0]);
    }

    #[test]
    fn seasonal_model_repeats_weekly_shape() {
        let week = [1.0, 1.2, 1.1, 1.3, 1.2, 2.0, 2.2];
        let y: Vec<f64> = week.iter().cycle().take(42).copied().collect();
        let est = SarimaxEstimator::new(ArimaOrder::new(0, 1, 1), SeasonalOrder::new(0, 1, 1, 7));
        let fitted = est.fit(&y, &no_exog(42)).unwrap();
        let forecast = fitted.forecast(7, &no_exog(7)).unwrap();
        for (f, w) in forecast.iter().zip(&week) {
            assert_relative_eq!(*f, *w, epsilon = 1e-6);
        }
    }

    #[test]
    fn repeated_one_step_calls_share_error_forecast() {
        let y = ar1_series(0.5, 50);
        let x: Vec<Vec<f64>> = (0..50).map(|i| vec![(i % 3) as f64]).collect();
        let exog = ExogMatrix::from_rows(vec!["x".into()], &x).unwrap();
        let est = SarimaxEstimator::new(ArimaOrder::new(1, 0, 0), SeasonalOrder::none());
        let fitted = est.fit(&y, &exog).unwrap();

        let at = |v: f64| {
            let row = ExogMatrix::from_rows(vec!["x".into()], &[vec![v]]).unwrap();
            fitted.forecast(1, &row).unwrap()[0]
        };
        let beta = fitted.regression().coefficients[0];
        assert_relative_eq!(at(2.0) - at(0.0), 2.0 * beta, epsilon = 1e-9);
        assert_relative_eq!(at(1.0), at(1.0));
    }

    #[test]
    fn short_series_fails_to_converge() {
        let y = vec![1.0; 10];
        let est = SarimaxEstimator::new(ArimaOrder::new(1, 1, 1), SeasonalOrder::new(1, 1, 1, 7));
        let err = est.fit(&y, &no_exog(10)).unwrap_err();
        assert!(matches!(err, ForecastError::Convergence(_)));
        assert!(err.is_model_failure());
    }

    #[test]
    fn underdetermined_regression_fails_to_converge() {
        let y: Vec<f64> = (0..4).map(|i| (i * i) as f64).collect();
        let x: Vec<Vec<f64>> = (0..4)
            .map(|i| vec![i as f64, (i % 2) as f64, (i * 3 % 4) as f64, (i * i) as f64])
            .collect();
        let names = (0..4).map(|i| format!("x{i}")).collect();
        let exog = ExogMatrix::from_rows(names, &x).unwrap();
        let est = SarimaxEstimator::new(ArimaOrder::new(0, 0, 0), SeasonalOrder::none());

        let err = est.fit(&y, &exog).unwrap_err();
        assert!(matches!(err, ForecastError::Convergence(_)));
        assert!(err.is_model_failure());
    }

    #[test]
    fn forecast_checks_exog_shape() {
        let y = ar1_series(0.5, 30);
        let est = SarimaxEstimator::new(ArimaOrder::new(1, 0, 0), SeasonalOrder::none());
        let fitted = est.fit(&y, &no_exog(30)).unwrap();
        assert!(matches!(
            fitted.forecast(2, &no_exog(1)),
            Err(ForecastError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn mismatched_training_rows_are_rejected() {
        let est = SarimaxEstimator::new(ArimaOrder::new(0, 1, 1), SeasonalOrder::none());
        assert!(matches!(
            est.fit(&[1.0, 2.0, 3.0], &no_exog(2)),
            Err(ForecastError::DimensionMismatch { .. })
        ));
    }
}

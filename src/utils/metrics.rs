//! Accuracy metrics for forecast evaluation.

use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How MAPE treats days with zero actual sales.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "floor")]
pub enum MapePolicy {
    /// Drop zero-actual days from the mean.
    ExcludeZeros,
    /// Replace zero actuals with the given floor before dividing.
    FloorZeros(f64),
}

impl Default for MapePolicy {
    fn default() -> Self {
        MapePolicy::ExcludeZeros
    }
}

/// Accuracy metrics for evaluating forecast performance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccuracyMetrics {
    /// Mean Absolute Error
    pub mae: f64,
    /// Mean Squared Error
    pub mse: f64,
    /// Root Mean Squared Error
    pub rmse: f64,
    /// Mean Absolute Percentage Error, `None` when no day qualifies under the policy.
    pub mape: Option<f64>,
}

impl AccuracyMetrics {
    /// Display band for MAPE; `None` when MAPE could not be computed.
    pub fn band(&self) -> Option<AccuracyBand> {
        self.mape.map(AccuracyBand::from_mape)
    }
}

/// Coarse accuracy label used in reports and the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AccuracyBand {
    VeryGood,
    Good,
    Acceptable,
    NeedsImprovement,
}

impl AccuracyBand {
    pub fn from_mape(mape: f64) -> Self {
        if mape < 10.0 {
            AccuracyBand::VeryGood
        } else if mape < 20.0 {
            AccuracyBand::Good
        } else if mape < 30.0 {
            AccuracyBand::Acceptable
        } else {
            AccuracyBand::NeedsImprovement
        }
    }
}

impl fmt::Display for AccuracyBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AccuracyBand::VeryGood => "very good",
            AccuracyBand::Good => "good",
            AccuracyBand::Acceptable => "acceptable",
            AccuracyBand::NeedsImprovement => "needs improvement",
        };
        f.write_str(label)
    }
}

/// Compute MAE, MSE, RMSE and MAPE over date-aligned sequences.
pub fn evaluate(actual: &[f64], predicted: &[f64], policy: MapePolicy) -> Result<AccuracyMetrics> {
    if actual.is_empty() || predicted.is_empty() {
        return Err(ForecastError::EmptyData);
    }
    if actual.len() != predicted.len() {
        return Err(ForecastError::DimensionMismatch {
            expected: actual.len(),
            got: predicted.len(),
        });
    }

    let n = actual.len() as f64;
    let errors: Vec<f64> = actual.iter().zip(predicted).map(|(a, p)| a - p).collect();

    let mae = errors.iter().map(|e| e.abs()).sum::<f64>() / n;
    let mse = errors.iter().map(|e| e * e).sum::<f64>() / n;

    Ok(AccuracyMetrics {
        mae,
        mse,
        rmse: mse.sqrt(),
        mape: mape(actual, predicted, policy),
    })
}

/// Mean absolute percentage error in percent.
pub fn mape(actual: &[f64], predicted: &[f64], policy: MapePolicy) -> Option<f64> {
    let ratios: Vec<f64> = actual
        .iter()
        .zip(predicted)
        .filter_map(|(&a, &p)| match policy {
            MapePolicy::ExcludeZeros if a == 0.0 => None,
            MapePolicy::ExcludeZeros => Some(((a - p) / a).abs()),
            MapePolicy::FloorZeros(floor) => {
                let a = if a == 0.0 { floor } else { a };
                Some(((a - p) / a).abs())
            }
        })
        .collect();

    if ratios.is_empty() {
        None
    } else {
        Some(100.0 * ratios.iter().sum::<f64>() / ratios.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn perfect_prediction_is_zero() {
        let actual = vec![3.0, 5.0, 0.0, 8.0];
        let metrics = evaluate(&actual, &actual, MapePolicy::ExcludeZeros).unwrap();
        assert_relative_eq!(metrics.mae, 0.0);
        assert_relative_eq!(metrics.rmse, 0.0);
        assert_relative_eq!(metrics.mape.unwrap(), 0.0);
        assert_eq!(metrics.band(), Some(AccuracyBand::VeryGood));
    }

    #[test]
    fn mape_excludes_zero_actuals() {
        let metrics =
            evaluate(&[0.0, 10.0, 20.0], &[5.0, 9.0, 22.0], MapePolicy::ExcludeZeros).unwrap();
        assert_relative_eq!(metrics.mape.unwrap(), 10.0, epsilon = 1e-10);
        // MAE still covers every day.
        assert_relative_eq!(metrics.mae, 8.0 / 3.0, epsilon = 1e-10);
    }

    #[test]
    fn mape_floor_policy_differs_on_zero_days() {
        let actual = [0.0, 10.0, 20.0];
        let predicted = [5.0, 9.0, 22.0];
        let floored = mape(&actual, &predicted, MapePolicy::FloorZeros(0.1)).unwrap();
        // |0.1 - 5| / 0.1 = 49, then 0.1, 0.1
        assert_relative_eq!(floored, 100.0 * (49.0 + 0.1 + 0.1) / 3.0, epsilon = 1e-9);
    }

    #[test]
    fn mape_is_none_when_every_actual_is_zero() {
        assert!(mape(&[0.0, 0.0], &[1.0, 2.0], MapePolicy::ExcludeZeros).is_none());
    }

    #[test]
    fn known_values() {
        let metrics = evaluate(
            &[1.0, 2.0, 3.0, 4.0, 5.0],
            &[1.5, 2.5, 2.5, 4.5, 4.5],
            MapePolicy::default(),
        )
        .unwrap();
        assert_relative_eq!(metrics.mae, 0.5, epsilon = 1e-10);
        assert_relative_eq!(metrics.mse, 0.25, epsilon = 1e-10);
        assert_relative_eq!(metrics.rmse, 0.5, epsilon = 1e-10);
    }

    #[test]
    fn shape_errors() {
        assert!(matches!(
            evaluate(&[], &[], MapePolicy::ExcludeZeros),
            Err(ForecastError::EmptyData)
        ));
        assert!(matches!(
            evaluate(&[1.0, 2.0], &[1.0], MapePolicy::ExcludeZeros),
            Err(ForecastError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn bands_follow_thresholds() {
        assert_eq!(AccuracyBand::from_mape(9.99), AccuracyBand::VeryGood);
        assert_eq!(AccuracyBand::from_mape(10.0), AccuracyBand::Good);
        assert_eq!(AccuracyBand::from_mape(25.0), AccuracyBand::Acceptable);
        assert_eq!(AccuracyBand::from_mape(30.0), AccuracyBand::NeedsImprovement);
        assert_eq!(AccuracyBand::NeedsImprovement.to_string(), "needs improvement");
    }
}

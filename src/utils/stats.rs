//! Statistical utility functions.

/// Quantile of a sample using linear interpolation between order statistics.
///
/// Matches the default `linear` method of numpy/pandas: the rank is
/// `q * (n - 1)` and the result interpolates between the two neighbouring
/// sorted values. Non-finite values are ignored.
///
/// # Example
/// ```
/// use vantedjo_forecast::utils::stats::quantile;
///
/// let q = quantile(&[1.0, 2.0, 3.0, 4.0, 5.0], 0.95).unwrap();
/// assert!((q - 4.8).abs() < 1e-12);
/// ```
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    if !(0.0..=1.0).contains(&q) {
        return None;
    }

    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(|a, b| a.total_cmp(b));

    let rank = q * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let weight = rank - lower as f64;

    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * weight)
}

/// Calculate the mean of a slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Round to a fixed number of decimal places.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

//! Differencing as a lag polynomial, so regular and seasonal orders compose.
//!
//! A polynomial `c` stands for `c[0] + c[1]·B + c[2]·B² + …` where `B` is the
//! backshift operator.

/// Product of two lag polynomials.
pub fn poly_mul(a: &[f64], b: &[f64]) -> Vec<f64> {
    if a.is_empty() || b.is_empty() {
        return Vec::new();
    }
    let mut out = vec![0.0; a.len() + b.len() - 1];
    for (i, &x) in a.iter().enumerate() {
        if x == 0.0 {
            continue;
        }
        for (j, &y) in b.iter().enumerate() {
            out[i + j] += x * y;
        }
    }
    out
}

/// `(1 - B)^d (1 - B^period)^seasonal_d`.
pub fn differencing_polynomial(d: usize, seasonal_d: usize, period: usize) -> Vec<f64> {
    let mut poly = vec![1.0];
    for _ in 0..d {
        poly = poly_mul(&poly, &[1.0, -1.0]);
    }
    if period > 0 {
        let mut seasonal = vec![0.0; period + 1];
        seasonal[0] = 1.0;
        seasonal[period] = -1.0;
        for _ in 0..seasonal_d {
            poly = poly_mul(&poly, &seasonal);
        }
    }
    poly
}

/// Apply a differencing polynomial; the output is `poly.len() - 1` shorter than the input.
pub fn difference(series: &[f64], poly: &[f64]) -> Vec<f64> {
    let order = poly.len().saturating_sub(1);
    if series.len() <= order {
        return Vec::new();
    }
    (order..series.len())
        .map(|t| poly.iter().enumerate().map(|(j, c)| c * series[t - j]).sum())
        .collect()
}

/// Undo [`difference`] for values following `history`.
///
/// Each future level is `w_t - Σ_{j≥1} poly[j]·y_{t-j}`, where earlier
/// levels come from `history` and then from the values already integrated.
pub fn integrate(history: &[f64], poly: &[f64], differenced: &[f64]) -> Vec<f64> {
    let mut levels = history.to_vec();
    for &w in differenced {
        let t = levels.len();
        let carried: f64 = poly
            .iter()
            .enumerate()
            .skip(1)
            .filter(|(j, _)| *j <= t)
            .map(|(j, c)| c * levels[t - j])
            .sum();
        levels.push(w - carried);
    }
    levels.split_off(history.len())
}

//! Summary statistics used by standardization and interval construction.

use statrs::distribution::{ContinuousCDF, Normal};

use crate::error::{AppError, Result};

/// Mean and population standard deviation (divide by `n`, not `n - 1`).
///
/// Returns `None` for an empty slice.
pub fn mean_std(values: &[f64]) -> Option<(f64, f64)> {
    if values.is_empty() {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    Some((mean, var.sqrt()))
}

/// Whether every value equals the first.
///
/// Compared on the values, not on a computed std, which rounding can leave
/// slightly above zero. An empty slice is not constant.
pub fn is_constant(values: &[f64]) -> bool {
    values
        .split_first()
        .is_some_and(|(first, rest)| rest.iter().all(|v| v == first))
}

/// Two-sided standard normal critical value `z` with `P(|Z| > z) = alpha`.
pub fn normal_critical_value(alpha: f64) -> Result<f64> {
    if !(alpha.is_finite() && alpha > 0.0 && alpha < 1.0) {
        return Err(AppError::InvalidArgument(format!(
            "alpha must be in (0, 1). Got {alpha}."
        )));
    }
    let normal = Normal::new(0.0, 1.0)
        .map_err(|e| AppError::InvalidArgument(format!("Normal distribution error: {e}")))?;
    Ok(normal.inverse_cdf(1.0 - alpha / 2.0))
}

//! Tempo factor decomposition for bounded time-stretch primitives.

use super::FitError;

/// Split `factor` into steps within `[min, max]` whose product is `factor`.
///
/// Boundary values are peeled off until the remainder is in range;
/// the remainder is appended last (`2.4` with max `2.0` → `[2.0, 1.2]`).
pub fn tempo_chain(factor: f64, min: f64, max: f64) -> Result<Vec<f64>, FitError> {
    if !factor.is_finite() || factor <= 0.0 {
        return Err(FitError::InvalidFactor(factor));
    }
    if !(min > 0.0 && min < 1.0 && max > 1.0) || !min.is_finite() || !max.is_finite() {
        return Err(FitError::InvalidRange { min, max });
    }

    let mut chain = Vec::new();
    let mut remainder = factor;

    while remainder > max {
        chain.push(max);
        remainder /= max;
    }
    while remainder < min {
        chain.push(min);
        remainder /= min;
    }
    chain.push(remainder);

    Ok(chain)
}

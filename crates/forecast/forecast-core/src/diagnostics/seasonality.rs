//! Lag-1 autocorrelation seasonality flag.

use crate::math::stats::lag_correlation;

/// Minimum autocorrelation magnitude considered significant
pub const SEASONALITY_THRESHOLD: f64 = 0.3;

/// Shorter series are never flagged as seasonal
pub const MIN_SEASONAL_SAMPLES: usize = 12;

pub fn lag1_autocorrelation(data: &[f64]) -> Option<f64> {
    lag_correlation(data, 1)
}

/// True iff `n >= 12` and `|lag-1 autocorrelation| > 0.3`.
///
/// A constant series has no defined autocorrelation and is not seasonal.
pub fn has_seasonality(data: &[f64]) -> bool {
    if data.len() < MIN_SEASONAL_SAMPLES {
        return false;
    }
    lag1_autocorrelation(data)
        .map(|r| r.abs() > SEASONALITY_THRESHOLD)
        .unwrap_or(false)
}

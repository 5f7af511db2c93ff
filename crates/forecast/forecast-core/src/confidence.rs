//! Prediction bands around point forecasts.

use serde::{Deserialize, Serialize};

/// Point forecast with a symmetric prediction band
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastWithConfidence {
    /// Point forecast
    pub forecast: Vec<f64>,
    /// Lower bound of the band
    pub lower: Vec<f64>,
    /// Upper bound of the band
    pub upper: Vec<f64>,
    /// Coverage level (e.g., 0.8 for 80%)
    pub confidence_level: f64,
}

impl ForecastWithConfidence {
    /// Create from point forecast and standard errors
    pub fn from_standard_errors(
        forecast: Vec<f64>,
        std_errors: &[f64],
        confidence_level: f64,
    ) -> Self {
        let z = z_score(confidence_level);

        let lower = forecast
            .iter()
            .zip(std_errors.iter())
            .map(|(&f, &se)| f - z * se)
            .collect();

        let upper = forecast
            .iter()
            .zip(std_errors.iter())
            .map(|(&f, &se)| f + z * se)
            .collect();

        Self {
            forecast,
            lower,
            upper,
            confidence_level,
        }
    }

    /// Create a band from in-sample residuals, widening with the horizon
    pub fn from_residuals(forecast: Vec<f64>, residuals: &[f64], confidence_level: f64) -> Self {
        let std_dev = if residuals.is_empty() {
            0.0
        } else {
            let n = residuals.len() as f64;
            let mean = residuals.iter().sum::<f64>() / n;
            (residuals.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n).sqrt()
        };

        let std_errors: Vec<f64> = (0..forecast.len())
            .map(|h| std_dev * ((h + 1) as f64).sqrt())
            .collect();

        Self::from_standard_errors(forecast, &std_errors, confidence_level)
    }
}

/// Two-sided normal quantile for a coverage level
pub fn z_score(confidence_level: f64) -> f64 {
    match confidence_level {
        x if x >= 0.99 => 2.576,
        x if x >= 0.95 => 1.96,
        x if x >= 0.90 => 1.645,
        x if x >= 0.80 => 1.282,
        x if x >= 0.50 => 0.674,
        _ => 1.282,
    }
}

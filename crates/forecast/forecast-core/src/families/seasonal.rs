//! Seasonal-additive decomposition forecaster
//!
//! Fits a linear trend `g(t)` on days since the first observation,
//! then multiplicative yearly and weekly Fourier terms:
//!
//! ```text
//! y(t) = g(t) * (1 + s_yearly(t) + s_weekly(t))
//! ```
//!
//! Values are scaled by their maximum magnitude before fitting, and the seasonal
//! coefficients are ridge-penalized so short series stay well-posed.

use std::f64::consts::PI;

use forecast_api::SeasonalConfig;
use forecast_spi::{
    ConfidenceKind, FittedState, ForecastError, ForecastModel, ForecastPoint, ForecastResult,
    ModelFamily, ModelHandle, Result, SeasonalFit, TrainingDataset,
};
use tracing::info;

use super::{check_predict, forecast_dates};
use crate::confidence::ForecastWithConfidence;
use crate::math::linalg::LeastSquares;

/// Fixed confidence scalar reported by this family
pub const SEASONAL_CONFIDENCE: f64 = 0.9;

/// Minimum observations for the seasonal family
pub const MIN_SAMPLES: usize = 3;

const YEARLY_PERIOD: f64 = 365.25;
const WEEKLY_PERIOD: f64 = 7.0;

/// Trend plus multiplicative Fourier seasonality
#[derive(Debug, Clone, Default)]
pub struct SeasonalForecaster {
    config: SeasonalConfig,
}

impl SeasonalForecaster {
    pub fn new(config: SeasonalConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SeasonalConfig {
        &self.config
    }

    fn fit(&self, dataset: &TrainingDataset) -> Result<SeasonalFit> {
        let origin = dataset.first_timestamp();
        let values = dataset.values();
        let days: Vec<f64> = dataset
            .timestamps()
            .iter()
            .map(|ts| (*ts - origin).num_days() as f64)
            .collect();

        let scale = values.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
        let scale = if scale > 0.0 { scale } else { 1.0 };
        let scaled: Vec<f64> = values.iter().map(|v| v / scale).collect();

        let trend_rows: Vec<Vec<f64>> = days.iter().map(|t| vec![1.0, *t]).collect();
        let trend = LeastSquares::fit(&trend_rows, &scaled)
            .ok_or_else(|| ForecastError::Training("trend regression is singular".to_string()))?;
        let (intercept, slope) = (trend.coefficients[0], trend.coefficients[1]);

        let yearly_order = self.config.yearly_order;
        let weekly_order = self.config.weekly_order;
        let width = 2 * (yearly_order + weekly_order);

        let seasonal_coefficients = if width == 0 {
            Vec::new()
        } else {
            let rows: Vec<Vec<f64>> = days
                .iter()
                .map(|t| {
                    let g = intercept + slope * t;
                    fourier_features(*t, yearly_order, weekly_order)
                        .into_iter()
                        .map(|f| g * f)
                        .collect()
                })
                .collect();
            let target: Vec<f64> = days
                .iter()
                .zip(scaled.iter())
                .map(|(t, y)| y - (intercept + slope * t))
                .collect();
            let penalty = vec![self.config.regularization.max(1e-9); width];
            LeastSquares::fit_penalized(&rows, &target, &penalty)
                .ok_or_else(|| {
                    ForecastError::Training("seasonal regression is singular".to_string())
                })?
                .coefficients
        };

        let mut fit = SeasonalFit {
            origin,
            scale,
            trend_intercept: intercept,
            trend_slope: slope,
            yearly_order,
            weekly_order,
            seasonal_coefficients,
            residuals: Vec::new(),
            interval_level: self.config.interval_level,
        };
        fit.residuals = days
            .iter()
            .zip(values.iter())
            .map(|(t, y)| y - evaluate(&fit, *t))
            .collect();

        if fit.residuals.iter().any(|r| !r.is_finite()) {
            return Err(ForecastError::Training(
                "seasonal fit produced non-finite residuals".to_string(),
            ));
        }
        Ok(fit)
    }
}

impl ForecastModel for SeasonalForecaster {
    fn family(&self) -> ModelFamily {
        ModelFamily::SeasonalAdditive
    }

    fn train(&self, dataset: &TrainingDataset) -> Result<ModelHandle> {
        if dataset.len() < MIN_SAMPLES {
            return Err(ForecastError::InsufficientData {
                required: MIN_SAMPLES,
                actual: dataset.len(),
            });
        }
        let fit = self.fit(dataset)?;
        info!(
            source = dataset.source(),
            trend_slope = fit.trend_slope,
            yearly_order = fit.yearly_order,
            weekly_order = fit.weekly_order,
            "seasonal model fitted"
        );
        Ok(ModelHandle::trained(FittedState::SeasonalAdditive(fit), dataset))
    }

    fn predict(&self, handle: &ModelHandle, horizon: usize) -> Result<ForecastResult> {
        check_predict(handle, ModelFamily::SeasonalAdditive, horizon)?;
        let FittedState::SeasonalAdditive(fit) = handle.state() else {
            return Err(ForecastError::Usage(
                "handle does not carry a seasonal fit".to_string(),
            ));
        };

        let dates = forecast_dates(handle, horizon)?;
        let forecast: Vec<f64> = dates
            .iter()
            .map(|date| evaluate(fit, (*date - fit.origin).num_days() as f64))
            .collect();
        let band =
            ForecastWithConfidence::from_residuals(forecast, &fit.residuals, fit.interval_level);

        let points = dates
            .into_iter()
            .enumerate()
            .map(|(i, timestamp)| ForecastPoint {
                timestamp,
                value: band.forecast[i],
                lower: Some(band.lower[i]),
                upper: Some(band.upper[i]),
            })
            .collect();

        Ok(ForecastResult {
            family: ModelFamily::SeasonalAdditive,
            model_used: handle.label(),
            points,
            confidence: SEASONAL_CONFIDENCE,
            confidence_kind: ConfidenceKind::Heuristic,
        })
    }
}

/// Yearly sin/cos pairs followed by weekly sin/cos pairs at day `t`.
fn fourier_features(t: f64, yearly_order: usize, weekly_order: usize) -> Vec<f64> {
    let mut features = Vec::with_capacity(2 * (yearly_order + weekly_order));
    for (period, order) in [(YEARLY_PERIOD, yearly_order), (WEEKLY_PERIOD, weekly_order)] {
        for k in 1..=order {
            let angle = 2.0 * PI * k as f64 * t / period;
            features.push(angle.sin());
            features.push(angle.cos());
        }
    }
    features
}

/// Fitted value on the original scale at day `t`.
fn evaluate(fit: &SeasonalFit, t: f64) -> f64 {
    let trend = fit.trend_intercept + fit.trend_slope * t;
    let seasonal: f64 = fourier_features(t, fit.yearly_order, fit.weekly_order)
        .iter()
        .zip(fit.seasonal_coefficients.iter())
        .map(|(f, beta)| f * beta)
        .sum();
    fit.scale * trend * (1.0 + seasonal)
}

//! Family-specific fitted state carried inside a [`ModelHandle`](super::ModelHandle).
//!
//! These are plain serializable parameter sets; the numerics that produce and
//! consume them live in `forecast-core`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{ForecastError, Result};

fn invalid(what: &str, detail: String) -> ForecastError {
    ForecastError::InvalidData(format!("{} state is inconsistent: {}", what, detail))
}

fn check_len(what: &str, field: &str, actual: usize, expected: usize) -> Result<()> {
    if actual != expected {
        return Err(invalid(
            what,
            format!("{} has {} values, expected {}", field, actual, expected),
        ));
    }
    Ok(())
}

/// Fitted state of a model handle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FittedState {
    /// Handle created but never trained
    Untrained,
    Autoregressive(ArimaFit),
    SeasonalAdditive(SeasonalFit),
    Recurrent(RecurrentFit),
}

impl FittedState {
    /// Check that the parameter shapes agree with each other, so prediction
    /// can index them without bounds failures.
    pub fn validate(&self) -> Result<()> {
        match self {
            FittedState::Untrained => Ok(()),
            FittedState::Autoregressive(fit) => fit.validate(),
            FittedState::SeasonalAdditive(fit) => fit.validate(),
            FittedState::Recurrent(fit) => fit.validate(),
        }
    }
}

/// ARIMA(p, d, q) fitted by conditional sum of squares.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArimaFit {
    pub p: usize,
    pub d: usize,
    pub q: usize,
    /// AR coefficients phi_1..phi_p
    pub ar: Vec<f64>,
    /// MA coefficients theta_1..theta_q
    pub ma: Vec<f64>,
    /// Mean of the differenced series (zero when d > 0)
    pub mean: f64,
    /// Innovation variance
    pub sigma2: f64,
    pub aic: f64,
    /// Differenced, mean-removed working series
    pub working: Vec<f64>,
    /// In-sample innovations aligned with `working`
    pub residuals: Vec<f64>,
    /// Last value of the series at each differencing level 0..d
    pub tails: Vec<f64>,
}

impl ArimaFit {
    pub fn validate(&self) -> Result<()> {
        const WHAT: &str = "ARIMA";
        check_len(WHAT, "ar", self.ar.len(), self.p)?;
        check_len(WHAT, "ma", self.ma.len(), self.q)?;
        check_len(WHAT, "tails", self.tails.len(), self.d)?;
        check_len(WHAT, "residuals", self.residuals.len(), self.working.len())?;
        if !(self.sigma2.is_finite() && self.sigma2 >= 0.0) {
            return Err(invalid(WHAT, format!("sigma2 is {}", self.sigma2)));
        }
        Ok(())
    }
}

/// Additive linear trend with multiplicative Fourier seasonality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonalFit {
    /// Day zero of the time axis
    pub origin: NaiveDate,
    /// Values are divided by this before fitting
    pub scale: f64,
    pub trend_intercept: f64,
    /// Trend change per day (scaled units)
    pub trend_slope: f64,
    pub yearly_order: usize,
    pub weekly_order: usize,
    /// Seasonal coefficients: yearly sin/cos pairs, then weekly sin/cos pairs
    pub seasonal_coefficients: Vec<f64>,
    /// In-sample residuals on the original scale
    pub residuals: Vec<f64>,
    /// Level of the prediction band
    pub interval_level: f64,
}

impl SeasonalFit {
    pub fn validate(&self) -> Result<()> {
        const WHAT: &str = "seasonal";
        check_len(
            WHAT,
            "seasonal_coefficients",
            self.seasonal_coefficients.len(),
            2 * (self.yearly_order + self.weekly_order),
        )?;
        if !(self.scale.is_finite() && self.scale != 0.0) {
            return Err(invalid(WHAT, format!("scale is {}", self.scale)));
        }
        Ok(())
    }
}

/// Weights of one LSTM layer; gate order is input, forget, cell, output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LstmWeights {
    pub input_size: usize,
    pub hidden_size: usize,
    /// Row-major `[4 * hidden_size, input_size + hidden_size]`
    pub weights: Vec<f64>,
    /// `[4 * hidden_size]`
    pub bias: Vec<f64>,
}

/// Weights of one fully connected layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseWeights {
    pub input_size: usize,
    pub output_size: usize,
    /// Row-major `[output_size, input_size]`
    pub weights: Vec<f64>,
    pub bias: Vec<f64>,
}

/// Stacked LSTM regressor trained on min-max scaled sliding windows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurrentFit {
    pub sequence_length: usize,
    pub scale_min: f64,
    pub scale_max: f64,
    pub lstm: Vec<LstmWeights>,
    pub dense: Vec<DenseWeights>,
    /// Last `sequence_length` training values, already scaled
    pub last_window: Vec<f64>,
    pub epochs: usize,
    pub train_loss: f64,
    pub validation_loss: Option<f64>,
    pub seed: u64,
}

impl RecurrentFit {
    /// Layers must chain from a single input feature to a single output.
    pub fn validate(&self) -> Result<()> {
        const WHAT: &str = "LSTM";
        if self.sequence_length == 0 {
            return Err(invalid(WHAT, "sequence_length is zero".to_string()));
        }
        check_len(WHAT, "last_window", self.last_window.len(), self.sequence_length)?;
        if self.lstm.is_empty() || self.dense.is_empty() {
            return Err(invalid(WHAT, "network has no layers".to_string()));
        }

        let mut width = 1;
        for (i, layer) in self.lstm.iter().enumerate() {
            let field = format!("lstm[{}]", i);
            if layer.input_size != width || layer.hidden_size == 0 {
                return Err(invalid(
                    WHAT,
                    format!(
                        "{} maps {} -> {} but receives {} inputs",
                        field, layer.input_size, layer.hidden_size, width
                    ),
                ));
            }
            let gates = 4 * layer.hidden_size;
            let weights = gates * (layer.input_size + layer.hidden_size);
            check_len(WHAT, &format!("{}.weights", field), layer.weights.len(), weights)?;
            check_len(WHAT, &format!("{}.bias", field), layer.bias.len(), gates)?;
            width = layer.hidden_size;
        }
        for (i, layer) in self.dense.iter().enumerate() {
            let field = format!("dense[{}]", i);
            if layer.input_size != width || layer.output_size == 0 {
                return Err(invalid(
                    WHAT,
                    format!(
                        "{} maps {} -> {} but receives {} inputs",
                        field, layer.input_size, layer.output_size, width
                    ),
                ));
            }
            let weights = layer.output_size * layer.input_size;
            check_len(WHAT, &format!("{}.weights", field), layer.weights.len(), weights)?;
            check_len(WHAT, &format!("{}.bias", field), layer.bias.len(), layer.output_size)?;
            width = layer.output_size;
        }
        if width != 1 {
            return Err(invalid(WHAT, format!("network emits {} outputs, expected 1", width)));
        }
        Ok(())
    }
}

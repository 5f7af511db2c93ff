//! Recurrent sequence forecaster
//!
//! Values are min-max scaled, cut into sliding windows of length
//! `L = min(max_sequence_length, n / 3)` and used to train a stacked LSTM to
//! predict the next value. Forecasting is an autoregressive rollout: each
//! prediction is appended to the window (dropping the oldest value) and fed back
//! in. The reported confidence is a fixed heuristic; no interval is produced
//! because single-step error compounds across the rollout.

mod network;

use forecast_api::RecurrentConfig;
use forecast_spi::{
    ConfidenceKind, FittedState, ForecastError, ForecastModel, ForecastPoint, ForecastResult,
    ModelFamily, ModelHandle, RecurrentFit, Result, TrainingDataset,
};
use rand::prelude::*;
use tracing::info;

use self::network::{Network, TrainingPlan};
use super::{check_predict, forecast_dates};
use crate::preprocessing::{denormalize, normalize};

/// Fixed confidence scalar reported by this family
pub const RECURRENT_CONFIDENCE: f64 = 0.85;

/// Fewest observations accepted before windowing is even attempted
pub const MIN_SAMPLES: usize = 3;

/// Stacked-LSTM forecaster
#[derive(Debug, Clone, Default)]
pub struct RecurrentForecaster {
    config: RecurrentConfig,
}

impl RecurrentForecaster {
    pub fn new(config: RecurrentConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RecurrentConfig {
        &self.config
    }

    /// Window length used for a series of `n` values.
    pub fn sequence_length(&self, n: usize) -> usize {
        self.config.max_sequence_length.min(n / 3)
    }
}

impl ForecastModel for RecurrentForecaster {
    fn family(&self) -> ModelFamily {
        ModelFamily::Recurrent
    }

    fn train(&self, dataset: &TrainingDataset) -> Result<ModelHandle> {
        let values = dataset.values();
        let n = values.len();
        if n < MIN_SAMPLES {
            return Err(ForecastError::InsufficientData {
                required: MIN_SAMPLES,
                actual: n,
            });
        }
        let sequence_length = self.sequence_length(n);
        let windows = n.saturating_sub(sequence_length);
        if sequence_length == 0 || windows < self.config.min_windows {
            return Err(ForecastError::Training(format!(
                "insufficient data: {} observations give {} windows of length {}, need at least {}",
                n, windows, sequence_length, self.config.min_windows
            )));
        }

        let (scaled, scale_min, scale_max) = normalize(&values);
        let inputs: Vec<Vec<f64>> = (0..windows)
            .map(|i| scaled[i..i + sequence_length].to_vec())
            .collect();
        let targets: Vec<f64> = (0..windows).map(|i| scaled[i + sequence_length]).collect();

        let split = ((windows as f64) * (1.0 - self.config.validation_split)).floor() as usize;
        let split = split.clamp(1, windows);

        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let mut network = Network::new(&mut rng, self.config.units, self.config.dense_units);
        let plan = TrainingPlan {
            epochs: self.config.epochs,
            batch_size: self.config.batch_size,
            learning_rate: self.config.learning_rate,
            dropout: self.config.dropout.clamp(0.0, 0.95),
        };
        let history = network.fit(
            &inputs[..split],
            &targets[..split],
            (&inputs[split..], &targets[split..]),
            plan,
            &mut rng,
        );

        let train_loss = history.final_loss();
        if !train_loss.is_finite() {
            return Err(ForecastError::Training(
                "LSTM training diverged to a non-finite loss".to_string(),
            ));
        }
        info!(
            source = dataset.source(),
            sequence_length,
            windows,
            epochs = self.config.epochs,
            train_loss,
            validation_loss = ?history.validation_loss,
            "LSTM trained"
        );

        let fit = RecurrentFit {
            sequence_length,
            scale_min,
            scale_max,
            lstm: network.lstm,
            dense: network.dense,
            last_window: scaled[n - sequence_length..].to_vec(),
            epochs: self.config.epochs,
            train_loss,
            validation_loss: history.validation_loss,
            seed: self.config.seed,
        };
        Ok(ModelHandle::trained(FittedState::Recurrent(fit), dataset))
    }

    fn predict(&self, handle: &ModelHandle, horizon: usize) -> Result<ForecastResult> {
        check_predict(handle, ModelFamily::Recurrent, horizon)?;
        let FittedState::Recurrent(fit) = handle.state() else {
            return Err(ForecastError::Usage("handle does not carry an LSTM fit".to_string()));
        };

        let dates = forecast_dates(handle, horizon)?;
        let mut window = fit.last_window.clone();
        let mut scaled = Vec::with_capacity(horizon);
        for _ in 0..horizon {
            let next = Network::predict(&fit.lstm, &fit.dense, &window);
            scaled.push(next);
            if !window.is_empty() {
                window.remove(0);
            }
            window.push(next);
        }
        let values = denormalize(&scaled, fit.scale_min, fit.scale_max);

        let points = dates
            .into_iter()
            .zip(values)
            .map(|(timestamp, value)| ForecastPoint {
                timestamp,
                value,
                lower: None,
                upper: None,
            })
            .collect();

        Ok(ForecastResult {
            family: ModelFamily::Recurrent,
            model_used: handle.label(),
            points,
            confidence: RECURRENT_CONFIDENCE,
            confidence_kind: ConfidenceKind::Heuristic,
        })
    }
}

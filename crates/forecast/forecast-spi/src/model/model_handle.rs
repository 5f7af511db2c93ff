//! Trained model handles.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::family::ModelFamily;
use crate::error::{ForecastError, Result};
use super::fitted_state::FittedState;
use super::time_series::{TimestampOrigin, TrainingDataset};

/// Reference to the training window a handle was fit on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingWindow {
    pub source: String,
    pub metric: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub samples: usize,
    pub origin: TimestampOrigin,
}

impl TrainingWindow {
    pub fn of(dataset: &TrainingDataset) -> Self {
        Self {
            source: dataset.source().to_string(),
            metric: dataset.metric().to_string(),
            start: dataset.first_timestamp(),
            end: dataset.last_timestamp(),
            samples: dataset.len(),
            origin: dataset.origin(),
        }
    }
}

/// Summary of the fitted parameters, safe to surface in envelopes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum ModelParams {
    Untrained,
    Autoregressive {
        order: (usize, usize, usize),
        aic: f64,
    },
    SeasonalAdditive {
        yearly_order: usize,
        weekly_order: usize,
        trend_slope: f64,
    },
    Recurrent {
        sequence_length: usize,
        epochs: usize,
        train_loss: f64,
        validation_loss: Option<f64>,
    },
}

/// Opaque fitted state plus its family tag and training window.
///
/// Owned by the training/prediction session; persisting a handle only reads it.
/// Deserializing checks that the state is internally consistent and matches
/// the family tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "HandleRepr")]
pub struct ModelHandle {
    family: ModelFamily,
    state: FittedState,
    window: Option<TrainingWindow>,
}

impl ModelHandle {
    /// A handle that has not been trained; predicting with it is a usage error.
    pub fn untrained(family: ModelFamily) -> Self {
        Self {
            family,
            state: FittedState::Untrained,
            window: None,
        }
    }

    /// Wrap a fitted state. The family tag is derived from the state.
    pub fn trained(state: FittedState, dataset: &TrainingDataset) -> Self {
        let family = state_family(&state).unwrap_or(ModelFamily::Autoregressive);
        Self {
            family,
            state,
            window: Some(TrainingWindow::of(dataset)),
        }
    }

    pub fn family(&self) -> ModelFamily {
        self.family
    }

    pub fn state(&self) -> &FittedState {
        &self.state
    }

    pub fn window(&self) -> Option<&TrainingWindow> {
        self.window.as_ref()
    }

    pub fn is_trained(&self) -> bool {
        !matches!(self.state, FittedState::Untrained) && self.window.is_some()
    }

    pub fn params(&self) -> ModelParams {
        match &self.state {
            FittedState::Untrained => ModelParams::Untrained,
            FittedState::Autoregressive(fit) => ModelParams::Autoregressive {
                order: (fit.p, fit.d, fit.q),
                aic: fit.aic,
            },
            FittedState::SeasonalAdditive(fit) => ModelParams::SeasonalAdditive {
                yearly_order: fit.yearly_order,
                weekly_order: fit.weekly_order,
                trend_slope: fit.trend_slope,
            },
            FittedState::Recurrent(fit) => ModelParams::Recurrent {
                sequence_length: fit.sequence_length,
                epochs: fit.epochs,
                train_loss: fit.train_loss,
                validation_loss: fit.validation_loss,
            },
        }
    }

    /// Human-readable model tag, e.g. `ARIMA(1,1,0)`.
    pub fn label(&self) -> String {
        match &self.state {
            FittedState::Untrained => format!("untrained {}", self.family),
            FittedState::Autoregressive(fit) => format!("ARIMA({},{},{})", fit.p, fit.d, fit.q),
            FittedState::SeasonalAdditive(_) => "SeasonalAdditive".to_string(),
            FittedState::Recurrent(_) => "LSTM".to_string(),
        }
    }
}

fn state_family(state: &FittedState) -> Option<ModelFamily> {
    match state {
        FittedState::Untrained => None,
        FittedState::Autoregressive(_) => Some(ModelFamily::Autoregressive),
        FittedState::SeasonalAdditive(_) => Some(ModelFamily::SeasonalAdditive),
        FittedState::Recurrent(_) => Some(ModelFamily::Recurrent),
    }
}

#[derive(Deserialize)]
struct HandleRepr {
    family: ModelFamily,
    state: FittedState,
    window: Option<TrainingWindow>,
}

impl TryFrom<HandleRepr> for ModelHandle {
    type Error = ForecastError;

    fn try_from(repr: HandleRepr) -> Result<Self> {
        if let Some(family) = state_family(&repr.state) {
            if family != repr.family {
                return Err(ForecastError::InvalidData(format!(
                    "handle tagged {} carries a {} state",
                    repr.family, family
                )));
            }
        }
        repr.state.validate()?;
        Ok(Self {
            family: repr.family,
            state: repr.state,
            window: repr.window,
        })
    }
}

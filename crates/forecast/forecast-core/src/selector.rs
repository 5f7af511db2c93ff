//! Model family selection.
//!
//! `auto` requests go through [`select_family`], a pure function of the sample
//! size, the two diagnostic flags and the capability set. Explicit requests are
//! honoured when the family is available and otherwise walk the family's fixed
//! fallback chain; every substitution is logged and recorded.

use std::fmt;

use forecast_api::ModelMode;
use forecast_spi::{Capabilities, ForecastError, ModelFamily, Result, TrainingDataset};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::diagnostics::Diagnostics;

/// Below this many samples the autoregressive family is preferred outright
pub const SMALL_SAMPLE_LIMIT: usize = 10;

/// From this many samples a non-stationary series goes to the recurrent family
pub const RECURRENT_MIN_SAMPLES: usize = 30;

/// Preference order once no rule has fired
const DEFAULT_ORDER: [ModelFamily; 3] = [
    ModelFamily::Autoregressive,
    ModelFamily::SeasonalAdditive,
    ModelFamily::Recurrent,
];

/// A substitution made because the requested family is not in this build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fallback {
    pub requested: ModelFamily,
    pub substituted: ModelFamily,
}

impl fmt::Display for Fallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} unavailable, used {}", self.requested, self.substituted)
    }
}

/// Outcome of selecting a family for one dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    pub family: ModelFamily,
    pub requested: ModelMode,
    pub fallback: Option<Fallback>,
    pub diagnostics: Diagnostics,
}

/// Pick a family for an `auto` request.
pub fn select_family(
    n: usize,
    is_stationary: bool,
    has_seasonality: bool,
    capabilities: &Capabilities,
) -> Result<ModelFamily> {
    if n < SMALL_SAMPLE_LIMIT && capabilities.supports(ModelFamily::Autoregressive) {
        return Ok(ModelFamily::Autoregressive);
    }
    if n >= RECURRENT_MIN_SAMPLES
        && capabilities.supports(ModelFamily::Recurrent)
        && !is_stationary
    {
        return Ok(ModelFamily::Recurrent);
    }
    if has_seasonality && capabilities.supports(ModelFamily::SeasonalAdditive) {
        return Ok(ModelFamily::SeasonalAdditive);
    }
    DEFAULT_ORDER
        .into_iter()
        .find(|family| capabilities.supports(*family))
        .ok_or_else(|| {
            ForecastError::Configuration(
                "no forecasting family is available in this build".to_string(),
            )
        })
}

/// Honour an explicit request, walking its fallback chain when unavailable.
pub fn resolve_explicit(
    requested: ModelFamily,
    capabilities: &Capabilities,
) -> Result<(ModelFamily, Option<Fallback>)> {
    if capabilities.supports(requested) {
        return Ok((requested, None));
    }
    requested
        .fallback_chain()
        .into_iter()
        .find(|family| capabilities.supports(*family))
        .map(|substituted| {
            (
                substituted,
                Some(Fallback {
                    requested,
                    substituted,
                }),
            )
        })
        .ok_or_else(|| {
            ForecastError::Configuration(format!(
                "requested family {} is unavailable and no fallback is available in this build",
                requested
            ))
        })
}

/// Selector bound to one capability set
#[derive(Debug, Clone)]
pub struct ModelSelector {
    capabilities: Capabilities,
}

impl ModelSelector {
    pub fn new(capabilities: Capabilities) -> Self {
        Self { capabilities }
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    pub fn select(&self, dataset: &TrainingDataset, mode: &ModelMode) -> Result<Selection> {
        let values = dataset.values();
        let diagnostics = Diagnostics::compute(&values, &self.capabilities);
        debug!(
            source = dataset.source(),
            samples = diagnostics.samples,
            has_seasonality = diagnostics.has_seasonality,
            is_stationary = diagnostics.is_stationary,
            "series diagnostics"
        );

        let (family, fallback) = match mode {
            ModelMode::Auto => (
                select_family(
                    diagnostics.samples,
                    diagnostics.is_stationary,
                    diagnostics.has_seasonality,
                    &self.capabilities,
                )?,
                None,
            ),
            ModelMode::Family(requested) => resolve_explicit(*requested, &self.capabilities)?,
        };

        if let Some(fallback) = &fallback {
            warn!(
                source = dataset.source(),
                requested = %fallback.requested,
                substituted = %fallback.substituted,
                "requested model family unavailable, falling back"
            );
        }
        info!(source = dataset.source(), family = %family, mode = %mode, "selected model family");

        Ok(Selection {
            family,
            requested: *mode,
            fallback,
            diagnostics,
        })
    }
}

impl Default for ModelSelector {
    fn default() -> Self {
        Self::new(crate::capabilities::detect_capabilities())
    }
}

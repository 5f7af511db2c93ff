//! JSON-serializable response envelopes.
//!
//! Every public orchestrator operation answers with a discriminated envelope:
//! `success: true` with data and metadata, or `success: false` with an error.

use forecast_spi::{ConfidenceKind, ForecastError, ModelFamily, ModelParams, TimestampOrigin};
use serde::{Deserialize, Serialize};

/// Forecast payload of a successful single-source run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastData {
    pub predicted_values: Vec<f64>,
    /// ISO dates, one per predicted value
    pub timestamps: Vec<String>,
    pub model_used: String,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lower_bounds: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upper_bounds: Option<Vec<f64>>,
}

/// Run metadata of a successful single-source run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastMetadata {
    pub processed_files: usize,
    /// Sample-size heuristic `min(0.95, 0.7 + n / 100)`
    pub confidence: f64,
    pub training_samples: usize,
    /// The family's own confidence scalar, read according to `confidence_kind`
    pub model_confidence: f64,
    pub confidence_kind: ConfidenceKind,
    pub family: ModelFamily,
    pub requested_mode: String,
    /// Set when the requested family was unavailable and another was substituted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<String>,
    pub timestamp_origin: TimestampOrigin,
    /// Undated values left out of an observed series
    #[serde(default, skip_serializing_if = "is_zero")]
    pub undated_dropped: usize,
    /// Real observation dates replaced by placeholder dates
    #[serde(default, skip_serializing_if = "is_zero")]
    pub dates_discarded: usize,
    pub has_seasonality: bool,
    pub is_stationary: bool,
}

fn is_zero(count: &usize) -> bool {
    *count == 0
}

/// Single-source envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastEnvelope {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<ForecastData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ForecastMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
}

impl ForecastEnvelope {
    pub fn success(data: ForecastData, metadata: ForecastMetadata, message: String) -> Self {
        Self {
            success: true,
            data: Some(data),
            metadata: Some(metadata),
            message: Some(message),
            error: None,
            error_kind: None,
        }
    }

    pub fn failure(error: &ForecastError) -> Self {
        Self {
            success: false,
            data: None,
            metadata: None,
            message: None,
            error: Some(error.to_string()),
            error_kind: Some(error.kind().to_string()),
        }
    }

    /// Failure that did not come from a typed error (e.g. a panicking pipeline).
    pub fn failure_message(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            metadata: None,
            message: None,
            error: Some(message.into()),
            error_kind: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }
}

/// One source's entry in a multi-source envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceOutcome {
    pub source: String,
    #[serde(flatten)]
    pub result: ForecastEnvelope,
}

/// Aggregate metadata of a multi-source run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiSourceMetadata {
    /// Sources in registration order
    pub sources: Vec<String>,
    pub total_files: usize,
    pub model_type: String,
    pub succeeded: usize,
    pub failed: usize,
}

/// Multi-source envelope; per-source failures live inside `data`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiSourceEnvelope {
    pub success: bool,
    /// Results in source-registration order
    pub data: Vec<SourceOutcome>,
    pub metadata: MultiSourceMetadata,
    pub message: String,
}

impl MultiSourceEnvelope {
    /// Result for one source, if it was registered
    pub fn get(&self, source: &str) -> Option<&ForecastEnvelope> {
        self.data
            .iter()
            .find(|outcome| outcome.source == source)
            .map(|outcome| &outcome.result)
    }
}

/// Metadata of a train-and-persist run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingMetadata {
    pub source: String,
    pub model_used: String,
    pub family: ModelFamily,
    pub training_samples: usize,
    pub confidence: f64,
    /// False when the trained model could not be saved
    pub persisted: bool,
    pub params: ModelParams,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<String>,
}

/// Train-and-persist envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingEnvelope {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<TrainingMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TrainingEnvelope {
    pub fn success(message: String, metadata: TrainingMetadata) -> Self {
        Self {
            success: true,
            message,
            metadata: Some(metadata),
            error: None,
        }
    }

    pub fn failure(source: &str, error: &ForecastError) -> Self {
        Self {
            success: false,
            message: format!("Failed to train a model for {}", source),
            metadata: None,
            error: Some(error.to_string()),
        }
    }
}

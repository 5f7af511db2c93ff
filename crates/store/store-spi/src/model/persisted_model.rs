//! Blob contents of a persisted model.

use forecast_spi::{ModelFamily, ModelHandle, TrainingDataset};
use serde::{Deserialize, Serialize};

/// Serialized handle plus dataset snapshot and caller metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedModel {
    pub source: String,
    pub family: ModelFamily,
    pub handle: ModelHandle,
    pub dataset: TrainingDataset,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// What `load` hands back
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedModel {
    pub handle: ModelHandle,
    pub dataset: TrainingDataset,
    pub metadata: serde_json::Value,
}

impl From<PersistedModel> for LoadedModel {
    fn from(model: PersistedModel) -> Self {
        Self {
            handle: model.handle,
            dataset: model.dataset,
            metadata: model.metadata,
        }
    }
}

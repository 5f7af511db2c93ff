//! Metadata index entries.

use chrono::{DateTime, Utc};
use forecast_spi::ModelFamily;
use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};

/// Index and blob key for a `(source, family)` pair, e.g. `modis_arima`.
pub fn model_key(source: &str, family: ModelFamily) -> String {
    format!("{}_{}", source, family)
}

/// Check that `source` can name a blob inside the models directory.
///
/// Accepts ASCII letters, digits, `-`, `_` and `.`, but never a leading `.`
/// or a `..` sequence.
pub fn validate_source(source: &str) -> Result<()> {
    let reason = if source.is_empty() {
        Some("name is empty")
    } else if source.contains("..") {
        Some("name contains '..'")
    } else if source.starts_with('.') {
        Some("name starts with '.'")
    } else if source
        .chars()
        .any(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
    {
        Some("name may only contain ASCII letters, digits, '-', '_' and '.'")
    } else {
        None
    };
    match reason {
        Some(reason) => Err(StoreError::InvalidSource {
            name: source.to_string(),
            reason: reason.to_string(),
        }),
        None => Ok(()),
    }
}

/// One entry of the shared metadata index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub source: String,
    pub family: ModelFamily,
    pub last_updated: DateTime<Utc>,
    pub training_samples: usize,
    /// Size of the blob in bytes
    pub file_size: u64,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl IndexEntry {
    pub fn key(&self) -> String {
        model_key(&self.source, self.family)
    }

    /// Age in whole days relative to `now`.
    pub fn age_days(&self, now: DateTime<Utc>) -> i64 {
        (now - self.last_updated).num_days()
    }
}

//! Model repository trait

use forecast_spi::{ModelFamily, ModelHandle, TrainingDataset};
use tracing::{info, warn};

use crate::error::Result;
use crate::model::{IndexEntry, LoadedModel, ModelListing, StoreStats};

/// Persistent store of trained models keyed by `(source, family)`.
///
/// Implementations keep one blob per key and a shared metadata index. Blobs are
/// written before the index on save and deleted before the index on delete, so
/// the only reachable inconsistency is an index entry whose blob is missing;
/// [`load`](ModelRepository::load) reports that state as not found.
pub trait ModelRepository: Send + Sync {
    /// Persist a handle, overwriting any previous record for the key.
    fn try_save(
        &self,
        source: &str,
        family: ModelFamily,
        handle: &ModelHandle,
        dataset: &TrainingDataset,
        metadata: serde_json::Value,
    ) -> Result<IndexEntry>;

    /// Persist a handle, logging instead of raising on failure.
    fn save(
        &self,
        source: &str,
        family: ModelFamily,
        handle: &ModelHandle,
        dataset: &TrainingDataset,
        metadata: serde_json::Value,
    ) -> bool {
        match self.try_save(source, family, handle, dataset, metadata) {
            Ok(entry) => {
                info!(
                    source,
                    family = %family,
                    file_size = entry.file_size,
                    training_samples = entry.training_samples,
                    "model saved"
                );
                true
            }
            Err(e) => {
                warn!(source, family = %family, error = %e, "failed to save model");
                false
            }
        }
    }

    /// `Ok(None)` when nothing (or only a dangling index entry) is stored.
    fn load(&self, source: &str, family: ModelFamily) -> Result<Option<LoadedModel>>;

    /// Index entry for the key, if any.
    fn info(&self, source: &str, family: ModelFamily) -> Option<IndexEntry>;

    /// Whether the blob for the key is present.
    fn exists(&self, source: &str, family: ModelFamily) -> bool;

    /// True iff a record exists and is at most `max_age_days` old.
    fn is_fresh(&self, source: &str, family: ModelFamily, max_age_days: i64) -> bool;

    /// Remove a record; `Ok(false)` when there was nothing to remove.
    fn delete(&self, source: &str, family: ModelFamily) -> Result<bool>;

    /// Remove every record older than `max_age_days`, returning how many went.
    fn cleanup(&self, max_age_days: i64) -> usize;

    fn list(&self) -> ModelListing;

    fn stats(&self) -> StoreStats;
}

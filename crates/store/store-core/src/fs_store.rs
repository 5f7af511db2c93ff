//! Filesystem-backed model repository.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Duration;
use forecast_spi::{ModelFamily, ModelHandle, TrainingDataset};
use serde::Serialize;
use store_api::StoreConfig;
use store_spi::{
    model_key, validate_source, Clock, IndexEntry, LoadedModel, ModelListing, ModelRepository,
    ModelSummary, PersistedModel, Result, StoreError, StoreStats, SystemClock,
};
use tracing::{debug, info, warn};

/// Name of the shared metadata index inside the models directory
pub const INDEX_FILE: &str = "model_metadata.json";

type Index = BTreeMap<String, IndexEntry>;

/// Borrowed form of [`PersistedModel`] used when writing
#[derive(Serialize)]
struct PersistedModelRef<'a> {
    source: &'a str,
    family: ModelFamily,
    handle: &'a ModelHandle,
    dataset: &'a TrainingDataset,
    metadata: &'a serde_json::Value,
}

/// JSON blob per key plus a shared index, guarded by one lock.
///
/// The index is read once at [`open`](FsModelStore::open) and flushed
/// synchronously after every mutation. The in-memory index only changes once
/// its flush succeeded, so it never lists a record the on-disk index lacks.
pub struct FsModelStore {
    dir: PathBuf,
    index: Mutex<Index>,
    clock: Arc<dyn Clock>,
}

impl FsModelStore {
    /// Open (creating if needed) the store described by `config`.
    pub fn open(config: &StoreConfig) -> Result<Self> {
        Self::open_dir(config.models_dir())
    }

    pub fn open_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|e| StoreError::io(&dir, e))?;

        let index_path = dir.join(INDEX_FILE);
        let index: Index = match fs::read_to_string(&index_path) {
            Ok(text) => serde_json::from_str(&text).map_err(|e| StoreError::Corrupt {
                key: INDEX_FILE.to_string(),
                reason: e.to_string(),
            })?,
            Err(e) if e.kind() == ErrorKind::NotFound => Index::new(),
            Err(e) => return Err(StoreError::io(&index_path, e)),
        };
        info!(dir = %dir.display(), models = index.len(), "model store opened");

        Ok(Self {
            dir,
            index: Mutex::new(index),
            clock: Arc::new(SystemClock),
        })
    }

    /// Replace the time source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Blob location for `(source, family)`, refusing names that would
    /// leave the models directory.
    pub fn blob_path(&self, source: &str, family: ModelFamily) -> Result<PathBuf> {
        validate_source(source)?;
        Ok(self.dir.join(format!("{}.json", model_key(source, family))))
    }

    fn lock(&self) -> MutexGuard<'_, Index> {
        self.index.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn flush(&self, index: &Index) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(index)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        write_atomic(&self.dir.join(INDEX_FILE), &bytes)
    }

    /// Blob first, then the index entry.
    fn remove_locked(&self, index: &mut Index, source: &str, family: ModelFamily) -> Result<bool> {
        let had_blob = match self.blob_path(source, family) {
            Ok(path) => match fs::remove_file(&path) {
                Ok(()) => true,
                Err(e) if e.kind() == ErrorKind::NotFound => false,
                Err(e) => return Err(StoreError::io(&path, e)),
            },
            // An index entry with an unusable name never had a blob of its own
            Err(e) => {
                warn!(source, error = %e, "dropping index entry without a valid blob path");
                false
            }
        };

        let key = model_key(source, family);
        let Some(entry) = index.remove(&key) else {
            return Ok(had_blob);
        };
        if let Err(e) = self.flush(index) {
            index.insert(key, entry);
            return Err(e);
        }
        Ok(true)
    }
}

impl ModelRepository for FsModelStore {
    fn try_save(
        &self,
        source: &str,
        family: ModelFamily,
        handle: &ModelHandle,
        dataset: &TrainingDataset,
        metadata: serde_json::Value,
    ) -> Result<IndexEntry> {
        let record = PersistedModelRef {
            source,
            family,
            handle,
            dataset,
            metadata: &metadata,
        };
        let bytes =
            serde_json::to_vec(&record).map_err(|e| StoreError::Serialization(e.to_string()))?;

        let path = self.blob_path(source, family)?;
        let mut index = self.lock();
        write_atomic(&path, &bytes)?;

        let entry = IndexEntry {
            source: source.to_string(),
            family,
            last_updated: self.clock.now(),
            training_samples: dataset.len(),
            file_size: bytes.len() as u64,
            metadata,
        };
        let key = entry.key();
        let previous = index.insert(key.clone(), entry.clone());
        if let Err(e) = self.flush(&index) {
            match previous {
                Some(previous) => index.insert(key.clone(), previous),
                None => index.remove(&key),
            };
            // Leaves at worst an index entry whose blob is missing
            if let Err(remove) = fs::remove_file(&path) {
                warn!(
                    key = %key,
                    error = %remove,
                    "failed to remove blob after index write failure"
                );
            }
            return Err(e);
        }
        debug!(key = %entry.key(), bytes = entry.file_size, "model blob written");
        Ok(entry)
    }

    fn load(&self, source: &str, family: ModelFamily) -> Result<Option<LoadedModel>> {
        let path = self.blob_path(source, family)?;
        let key = model_key(source, family);
        let index = self.lock();
        if !index.contains_key(&key) {
            return Ok(None);
        }

        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!(key = %key, "index references a missing blob, treating as not found");
                return Ok(None);
            }
            Err(e) => return Err(StoreError::io(&path, e)),
        };
        drop(index);

        let record: PersistedModel =
            serde_json::from_str(&text).map_err(|e| StoreError::Corrupt {
                key: key.clone(),
                reason: e.to_string(),
            })?;
        if record.source != source || record.family != family {
            return Err(StoreError::Corrupt {
                key,
                reason: format!(
                    "blob holds {} instead",
                    model_key(&record.source, record.family)
                ),
            });
        }
        debug!(key = %key, "model loaded");
        Ok(Some(record.into()))
    }

    fn info(&self, source: &str, family: ModelFamily) -> Option<IndexEntry> {
        self.lock().get(&model_key(source, family)).cloned()
    }

    fn exists(&self, source: &str, family: ModelFamily) -> bool {
        self.blob_path(source, family)
            .map(|path| path.is_file())
            .unwrap_or(false)
    }

    fn is_fresh(&self, source: &str, family: ModelFamily, max_age_days: i64) -> bool {
        let Some(entry) = self.info(source, family) else {
            return false;
        };
        if !self.exists(source, family) {
            return false;
        }
        self.clock.now() - entry.last_updated <= Duration::days(max_age_days)
    }

    fn delete(&self, source: &str, family: ModelFamily) -> Result<bool> {
        validate_source(source)?;
        let mut index = self.lock();
        let removed = self.remove_locked(&mut index, source, family)?;
        if removed {
            info!(source, family = %family, "model deleted");
        }
        Ok(removed)
    }

    fn cleanup(&self, max_age_days: i64) -> usize {
        let mut index = self.lock();
        let now = self.clock.now();
        let threshold = Duration::days(max_age_days);
        let stale: Vec<(String, ModelFamily)> = index
            .values()
            .filter(|entry| now - entry.last_updated > threshold)
            .map(|entry| (entry.source.clone(), entry.family))
            .collect();

        let mut removed = 0;
        for (source, family) in stale {
            match self.remove_locked(&mut index, &source, family) {
                Ok(_) => removed += 1,
                Err(e) => warn!(
                    source = %source,
                    family = %family,
                    error = %e,
                    "failed to remove stale model"
                ),
            }
        }
        info!(removed, max_age_days, "model cleanup finished");
        removed
    }

    fn list(&self) -> ModelListing {
        let index = self.lock();
        let mut listing = ModelListing::new();
        for entry in index.values() {
            listing.entry(entry.source.clone()).or_default().insert(
                entry.family,
                ModelSummary {
                    last_updated: entry.last_updated,
                    training_samples: entry.training_samples,
                    file_size: entry.file_size,
                    exists: self.exists(&entry.source, entry.family),
                },
            );
        }
        listing
    }

    fn stats(&self) -> StoreStats {
        StoreStats::from_entries(self.lock().values())
    }
}

/// Write through a sibling temp file and rename into place.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, bytes).map_err(|e| StoreError::io(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| {
        let _ = fs::remove_file(&tmp);
        StoreError::io(path, e)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::{NaiveDate, Utc};
    use forecast_spi::{ArimaFit, FittedState};

    const ARIMA: ModelFamily = ModelFamily::Autoregressive;

    fn fixture(values: &[f64]) -> (ModelHandle, TrainingDataset) {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let dataset = TrainingDataset::daily("NDVI", "modis", start, values).unwrap();
        let state = FittedState::Autoregressive(ArimaFit {
            p: 0,
            d: 1,
            q: 0,
            ar: vec![],
            ma: vec![],
            mean: 0.0,
            sigma2: 0.01,
            aic: -3.0,
            working: vec![0.0; values.len() - 1],
            residuals: vec![0.0; values.len() - 1],
            tails: vec![values[values.len() - 1]],
        });
        (ModelHandle::trained(state, &dataset), dataset)
    }

    fn save(store: &FsModelStore, source: &str) -> IndexEntry {
        let (handle, dataset) = fixture(&[0.1, 0.2, 0.3]);
        store
            .try_save(source, ARIMA, &handle, &dataset, serde_json::Value::Null)
            .unwrap()
    }

    /// Replace the index file with a non-empty directory so renames onto it fail.
    fn block_index(dir: &Path) {
        let index = dir.join(INDEX_FILE);
        if index.is_file() {
            fs::remove_file(&index).unwrap();
        }
        fs::create_dir(&index).unwrap();
        fs::write(index.join("keep"), "x").unwrap();
    }

    #[test]
    fn test_save_writes_blob_and_index() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsModelStore::open_dir(dir.path()).unwrap();
        let (handle, dataset) = fixture(&[0.1, 0.2, 0.3]);

        let entry = store
            .try_save("modis", ARIMA, &handle, &dataset, serde_json::json!({"k": 1}))
            .unwrap();
        assert_eq!(entry.training_samples, 3);
        assert!(dir.path().join("modis_arima.json").is_file());
        assert!(dir.path().join(INDEX_FILE).is_file());
        assert_eq!(
            fs::metadata(dir.path().join("modis_arima.json")).unwrap().len(),
            entry.file_size
        );
    }

    #[test]
    fn test_index_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let (handle, dataset) = fixture(&[0.1, 0.2, 0.3]);
        {
            let store = FsModelStore::open_dir(dir.path()).unwrap();
            assert!(store.save("modis", ARIMA, &handle, &dataset, serde_json::Value::Null));
        }
        let store = FsModelStore::open_dir(dir.path()).unwrap();
        assert!(store.info("modis", ARIMA).is_some());
        let loaded = store.load("modis", ARIMA).unwrap().unwrap();
        assert_eq!(loaded.handle, handle);
        assert_eq!(loaded.dataset, dataset);
    }

    #[test]
    fn test_corrupt_index_fails_open() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(INDEX_FILE), "[[[").unwrap();
        assert!(matches!(
            FsModelStore::open_dir(dir.path()),
            Err(StoreError::Corrupt { .. })
        ));
    }

    #[test]
    fn test_missing_key_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsModelStore::open_dir(dir.path()).unwrap();
        assert!(store.load("alos", ModelFamily::Recurrent).unwrap().is_none());
        assert!(!store.exists("alos", ModelFamily::Recurrent));
        assert!(!store.delete("alos", ModelFamily::Recurrent).unwrap());
    }

    #[test]
    fn test_blob_for_other_key_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsModelStore::open_dir(dir.path()).unwrap();
        save(&store, "modis");
        save(&store, "alos");
        fs::copy(
            dir.path().join("modis_arima.json"),
            dir.path().join("alos_arima.json"),
        )
        .unwrap();
        assert!(matches!(
            store.load("alos", ARIMA),
            Err(StoreError::Corrupt { .. })
        ));
    }

    #[test]
    fn test_delete_removes_blob_then_entry() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsModelStore::open_dir(dir.path()).unwrap();
        save(&store, "modis");

        assert!(store.delete("modis", ARIMA).unwrap());
        assert!(!store.exists("modis", ARIMA));
        assert!(store.info("modis", ARIMA).is_none());
        assert_eq!(store.stats().total_models, 0);
    }

    #[test]
    fn test_failed_index_write_leaves_no_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsModelStore::open_dir(dir.path()).unwrap();
        block_index(dir.path());
        let (handle, dataset) = fixture(&[0.1, 0.2, 0.3]);

        assert!(!store.save("modis", ARIMA, &handle, &dataset, serde_json::Value::Null));
        assert!(store.info("modis", ARIMA).is_none());
        assert!(!store.is_fresh("modis", ARIMA, 7));
        assert!(!store.exists("modis", ARIMA));
        assert_eq!(store.stats().total_models, 0);
        assert!(store.list().is_empty());
        assert!(!dir.path().join("modis_arima.json").exists());
        assert!(!dir.path().join("model_metadata.json.tmp").exists());
    }

    #[test]
    fn test_failed_resave_keeps_previous_entry_without_blob() {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let store = FsModelStore::open_dir(dir.path())
            .unwrap()
            .with_clock(clock.clone());
        let first = save(&store, "modis");
        clock.advance(Duration::days(1));
        block_index(dir.path());

        let (handle, dataset) = fixture(&[0.1, 0.2, 0.3, 0.4]);
        let result = store.try_save("modis", ARIMA, &handle, &dataset, serde_json::Value::Null);
        assert!(matches!(result, Err(StoreError::Io { .. })));
        assert_eq!(store.info("modis", ARIMA), Some(first));
        assert!(!store.exists("modis", ARIMA));
        assert!(store.load("modis", ARIMA).unwrap().is_none());
    }

    #[test]
    fn test_failed_index_write_on_delete_keeps_entry() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsModelStore::open_dir(dir.path()).unwrap();
        let entry = save(&store, "modis");
        block_index(dir.path());

        assert!(matches!(
            store.delete("modis", ARIMA),
            Err(StoreError::Io { .. })
        ));
        assert_eq!(store.info("modis", ARIMA), Some(entry));
        assert!(!store.exists("modis", ARIMA));
        assert!(store.load("modis", ARIMA).unwrap().is_none());
        assert_eq!(store.stats().total_models, 1);
    }

    #[test]
    fn test_source_names_cannot_leave_models_dir() {
        let root = tempfile::tempdir().unwrap();
        let models = root.path().join("models");
        let store = FsModelStore::open_dir(&models).unwrap();
        let (handle, dataset) = fixture(&[0.1, 0.2, 0.3]);

        assert!(!store.save("../escaped", ARIMA, &handle, &dataset, serde_json::Value::Null));
        assert!(matches!(
            store.try_save("../escaped", ARIMA, &handle, &dataset, serde_json::Value::Null),
            Err(StoreError::InvalidSource { .. })
        ));
        assert!(!root.path().join("escaped_arima.json").exists());
        assert_eq!(fs::read_dir(&models).unwrap().count(), 0);

        fs::write(root.path().join("outside_arima.json"), "{}").unwrap();
        assert!(matches!(
            store.load("../outside", ARIMA),
            Err(StoreError::InvalidSource { .. })
        ));
        assert!(matches!(
            store.delete("../outside", ARIMA),
            Err(StoreError::InvalidSource { .. })
        ));
        assert!(root.path().join("outside_arima.json").is_file());
        assert!(!store.exists("../outside", ARIMA));
        assert!(!store.is_fresh("../outside", ARIMA, 7));
        assert!(store.blob_path("a/b", ARIMA).is_err());
    }

    #[test]
    fn test_list_reports_missing_blobs() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsModelStore::open_dir(dir.path()).unwrap();
        let (handle, dataset) = fixture(&[0.1, 0.2, 0.3]);
        let seasonal = ModelFamily::SeasonalAdditive;
        store
            .try_save("modis", ARIMA, &handle, &dataset, serde_json::Value::Null)
            .unwrap();
        store
            .try_save("modis", seasonal, &handle, &dataset, serde_json::Value::Null)
            .unwrap();
        fs::remove_file(dir.path().join("modis_seasonal.json")).unwrap();

        let listing = store.list();
        let modis = &listing["modis"];
        assert!(modis[&ARIMA].exists);
        assert!(!modis[&seasonal].exists);
        assert_eq!(modis[&ARIMA].training_samples, 3);
    }

    #[test]
    fn test_cleanup_keeps_fresh_records() {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let store = FsModelStore::open_dir(dir.path())
            .unwrap()
            .with_clock(clock.clone());

        save(&store, "modis");
        clock.advance(Duration::days(5));
        save(&store, "alos");
        clock.advance(Duration::days(3));

        assert_eq!(store.cleanup(7), 1);
        assert!(store.info("modis", ARIMA).is_none());
        assert!(store.is_fresh("alos", ARIMA, 7));
    }
}

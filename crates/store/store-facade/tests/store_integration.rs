//! Integration tests for the model store
//!
//! Real handles from every family are saved, reloaded and aged.

use std::fs;
use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use forecast_facade::{
    model_for, ForecastConfig, ModelFamily, ModelHandle, ModelMode, Orchestrator,
    RecurrentConfig, SourceFile, SourcePayload, StaticSource, TrainingDataset,
};
use store_facade::{FsModelStore, ManualClock, ModelRepository, StoreConfig, StoreError, INDEX_FILE};

fn config() -> ForecastConfig {
    ForecastConfig::default().recurrent(RecurrentConfig::compact().with_seed(3))
}

fn dataset(n: usize) -> TrainingDataset {
    let start = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
    let values: Vec<f64> = (0..n)
        .map(|i| 0.3 + 0.004 * i as f64 + 0.04 * (i as f64 * 0.9).sin())
        .collect();
    TrainingDataset::daily("NDVI", "modis", start, &values).unwrap()
}

fn train(family: ModelFamily, ds: &TrainingDataset) -> ModelHandle {
    model_for(family, &config()).unwrap().train(ds).unwrap()
}

fn open(dir: &tempfile::TempDir) -> (FsModelStore, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::default());
    let store = FsModelStore::open(&StoreConfig::new(dir.path()))
        .unwrap()
        .with_clock(clock.clone());
    (store, clock)
}

#[test]
fn test_round_trip_predicts_identically() {
    let dir = tempfile::tempdir().unwrap();
    let (store, _) = open(&dir);
    let ds = dataset(45);

    for family in ModelFamily::ALL {
        let handle = train(family, &ds);
        let model = model_for(family, &config()).unwrap();
        let before = model.predict(&handle, 7).unwrap();

        assert!(store.save("modis", family, &handle, &ds, serde_json::json!({"note": "rt"})));
        let loaded = store.load("modis", family).unwrap().unwrap();
        assert_eq!(loaded.dataset, ds);
        assert_eq!(loaded.metadata["note"], "rt");

        let after = model.predict(&loaded.handle, 7).unwrap();
        assert_eq!(after.timestamps(), before.timestamps());
        for (a, b) in after.values().iter().zip(before.values().iter()) {
            assert!((a - b).abs() < 1e-6, "{}: {} vs {}", family, a, b);
        }
    }
}

#[test]
fn test_second_save_only_moves_last_updated() {
    let dir = tempfile::tempdir().unwrap();
    let (store, clock) = open(&dir);
    let ds = dataset(20);
    let handle = train(ModelFamily::Autoregressive, &ds);

    let first = store
        .try_save("modis", ModelFamily::Autoregressive, &handle, &ds, serde_json::Value::Null)
        .unwrap();
    clock.advance(Duration::minutes(5));
    let second = store
        .try_save("modis", ModelFamily::Autoregressive, &handle, &ds, serde_json::Value::Null)
        .unwrap();

    assert!(second.last_updated > first.last_updated);
    assert_eq!(second.training_samples, first.training_samples);
    assert_eq!(second.file_size, first.file_size);
    assert_eq!(store.stats().total_models, 1);
}

#[test]
fn test_load_returns_latest_state() {
    let dir = tempfile::tempdir().unwrap();
    let (store, _) = open(&dir);
    let old = dataset(20);
    let new = dataset(30);

    let family = ModelFamily::Autoregressive;
    store
        .try_save("modis", family, &train(family, &old), &old, serde_json::Value::Null)
        .unwrap();
    store
        .try_save("modis", family, &train(family, &new), &new, serde_json::Value::Null)
        .unwrap();

    let loaded = store.load("modis", ModelFamily::Autoregressive).unwrap().unwrap();
    assert_eq!(loaded.dataset.len(), 30);
    assert_eq!(loaded.handle.window().unwrap().samples, 30);
    assert_eq!(store.info("modis", ModelFamily::Autoregressive).unwrap().training_samples, 30);
}

#[test]
fn test_freshness_and_cleanup() {
    let dir = tempfile::tempdir().unwrap();
    let (store, clock) = open(&dir);
    let ds = dataset(12);
    let handle = train(ModelFamily::Autoregressive, &ds);

    store
        .try_save("modis", ModelFamily::Autoregressive, &handle, &ds, serde_json::Value::Null)
        .unwrap();
    assert!(store.is_fresh("modis", ModelFamily::Autoregressive, 7));

    clock.advance(Duration::days(8));
    assert!(!store.is_fresh("modis", ModelFamily::Autoregressive, 7));

    assert_eq!(store.cleanup(7), 1);
    assert!(store.load("modis", ModelFamily::Autoregressive).unwrap().is_none());
    assert!(!dir.path().join("modis_arima.json").exists());
    assert_eq!(store.cleanup(7), 0);
}

#[test]
fn test_missing_blob_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let (store, _) = open(&dir);
    let ds = dataset(12);
    let handle = train(ModelFamily::SeasonalAdditive, &ds);
    store
        .try_save("alos", ModelFamily::SeasonalAdditive, &handle, &ds, serde_json::Value::Null)
        .unwrap();

    fs::remove_file(dir.path().join("alos_seasonal.json")).unwrap();

    assert!(store.info("alos", ModelFamily::SeasonalAdditive).is_some());
    assert!(store.load("alos", ModelFamily::SeasonalAdditive).unwrap().is_none());
    assert!(!store.is_fresh("alos", ModelFamily::SeasonalAdditive, 7));
}

#[test]
fn test_corrupt_blob_is_persistence_error() {
    let dir = tempfile::tempdir().unwrap();
    let (store, _) = open(&dir);
    let ds = dataset(12);
    let handle = train(ModelFamily::Autoregressive, &ds);
    store
        .try_save("modis", ModelFamily::Autoregressive, &handle, &ds, serde_json::Value::Null)
        .unwrap();

    fs::write(dir.path().join("modis_arima.json"), b"{\"source\": \"modis\", \"fam").unwrap();

    let err = store.load("modis", ModelFamily::Autoregressive).unwrap_err();
    assert!(matches!(err, StoreError::Corrupt { .. }));
    assert_eq!(err.kind(), "PersistenceError");
}

#[test]
fn test_delete_list_and_stats() {
    let dir = tempfile::tempdir().unwrap();
    let (store, _) = open(&dir);
    let ds = dataset(15);

    for (source, family) in [
        ("modis", ModelFamily::Autoregressive),
        ("modis", ModelFamily::SeasonalAdditive),
        ("alos", ModelFamily::Autoregressive),
    ] {
        store
            .try_save(source, family, &train(family, &ds), &ds, serde_json::Value::Null)
            .unwrap();
    }

    let stats = store.stats();
    assert_eq!(stats.total_models, 3);
    assert_eq!(stats.sources, vec!["alos", "modis"]);
    assert_eq!(stats.models_by_source["modis"], 2);
    assert!(stats.total_size_bytes > 0);

    assert!(store.delete("modis", ModelFamily::SeasonalAdditive).unwrap());
    assert!(!store.delete("modis", ModelFamily::SeasonalAdditive).unwrap());

    let listing = store.list();
    assert_eq!(listing["modis"].len(), 1);
    assert!(listing["modis"][&ModelFamily::Autoregressive].exists);
    assert_eq!(listing["alos"][&ModelFamily::Autoregressive].training_samples, 15);

    // The index on disk agrees after reopening
    let reopened = FsModelStore::open_dir(dir.path()).unwrap();
    assert_eq!(reopened.stats().total_models, 2);
    assert!(dir.path().join(INDEX_FILE).is_file());
}

#[test]
fn test_orchestrator_train_persists_through_store() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FsModelStore::open_dir(dir.path()).unwrap());
    let files = (0..6)
        .map(|i| SourceFile::new().with_metric("NDVI", 0.2 + 0.01 * i as f64))
        .collect();
    let orchestrator = Orchestrator::new(config())
        .with_repository(store.clone())
        .with_source(StaticSource::new("modis", SourcePayload::new(files)))
        .unwrap()
        .with_source(StaticSource::new(
            "alos",
            SourcePayload::new(vec![SourceFile::new().with_metric("NDVI", 0.2)]),
        ))
        .unwrap();

    let envelope = orchestrator.train_source("modis", &ModelMode::Auto);
    assert!(envelope.success);
    let metadata = envelope.metadata.unwrap();
    assert!(metadata.persisted);
    assert!(store.exists("modis", metadata.family));

    // n < 3 never reaches the store
    let failed = orchestrator.train_source("alos", &ModelMode::Auto);
    assert!(!failed.success);
    assert!(store.list().get("alos").is_none());
    assert_eq!(store.stats().total_models, 1);
}

#[test]
fn test_blob_with_inconsistent_state_is_persistence_error() {
    let dir = tempfile::tempdir().unwrap();
    let (store, _) = open(&dir);
    let ds = dataset(45);

    let cases = [
        (ModelFamily::Recurrent, "lstm", "/handle/state/lstm/0/weights"),
        (ModelFamily::Autoregressive, "arima", "/handle/state/residuals"),
    ];
    for (family, name, pointer) in cases {
        let handle = train(family, &ds);
        assert!(store.save("modis", family, &handle, &ds, serde_json::Value::Null));

        let path = dir.path().join(format!("modis_{}.json", name));
        let mut blob: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        *blob.pointer_mut(pointer).unwrap() = serde_json::json!([0.1, 0.2]);
        fs::write(&path, serde_json::to_string(&blob).unwrap()).unwrap();

        let err = store.load("modis", family).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }), "{}: {}", name, err);
        assert_eq!(err.kind(), "PersistenceError");
    }
}

#[test]
fn test_path_like_source_is_rejected() {
    let root = tempfile::tempdir().unwrap();
    let models = root.path().join("models");
    let store = FsModelStore::open(&StoreConfig::new(models.clone())).unwrap();
    let ds = dataset(12);
    let handle = train(ModelFamily::Autoregressive, &ds);

    for source in ["../escaped", "nested/name", ""] {
        let err = store
            .try_save(source, ModelFamily::Autoregressive, &handle, &ds, serde_json::Value::Null)
            .unwrap_err();
        assert_eq!(err.kind(), "UsageError");
    }
    assert!(!root.path().join("escaped_arima.json").exists());
    assert!(store.list().is_empty());
}

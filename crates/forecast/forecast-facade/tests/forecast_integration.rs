//! Integration tests for the forecasting families
//!
//! Every family is driven through the `ForecastModel` contract.

use chrono::{Days, NaiveDate};
use forecast_facade::{
    model_for, ForecastConfig, ForecastError, ForecastModel, ModelFamily, ModelHandle,
    RecurrentConfig, TrainingDataset,
};

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
}

fn series(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| {
            let phase = i as f64 * 2.0 * std::f64::consts::PI / 7.0;
            0.4 + 0.002 * i as f64 + 0.05 * phase.sin()
        })
        .collect()
}

fn dataset(values: &[f64]) -> TrainingDataset {
    TrainingDataset::daily("NDVI", "modis", start(), values).unwrap()
}

fn config() -> ForecastConfig {
    ForecastConfig::default().recurrent(RecurrentConfig::compact().with_seed(7))
}

fn model(family: ModelFamily) -> Box<dyn ForecastModel> {
    model_for(family, &config()).unwrap()
}

#[test]
fn test_every_family_forecasts_daily_after_last_sample() {
    let ds = dataset(&series(60));
    let last = ds.last_timestamp();

    for family in ModelFamily::ALL {
        let model = model(family);
        let handle = model.train(&ds).unwrap();
        assert_eq!(handle.family(), family);

        for horizon in [1, 5, 30] {
            let result = model.predict(&handle, horizon).unwrap();
            assert_eq!(result.len(), horizon, "{} horizon {}", family, horizon);
            assert_eq!(result.iso_timestamps().len(), horizon);

            let dates = result.timestamps();
            assert_eq!(dates[0], last.checked_add_days(Days::new(1)).unwrap());
            for pair in dates.windows(2) {
                assert_eq!(pair[1], pair[0].checked_add_days(Days::new(1)).unwrap());
            }
            assert!(result.values().iter().all(|v| v.is_finite()));
        }
    }
}

#[test]
fn test_fewer_than_three_samples_is_insufficient_data() {
    for family in ModelFamily::ALL {
        for n in 0..3 {
            let ds = TrainingDataset::daily("NDVI", "modis", start(), &series(n));
            let Ok(ds) = ds else {
                // An empty dataset is already rejected at construction
                continue;
            };
            let err = model(family).train(&ds).unwrap_err();
            assert!(
                matches!(err, ForecastError::InsufficientData { .. }),
                "{} with n={} gave {:?}",
                family,
                n,
                err
            );
        }
    }
}

#[test]
fn test_untrained_handle_is_usage_error() {
    for family in ModelFamily::ALL {
        let err = model(family)
            .predict(&ModelHandle::untrained(family), 3)
            .unwrap_err();
        assert!(matches!(err, ForecastError::Usage(_)));
    }
}

#[test]
fn test_confidence_conventions_stay_distinct() {
    use forecast_facade::ConfidenceKind;

    let ds = dataset(&series(60));
    let arima = model(ModelFamily::Autoregressive);
    let result = arima.predict(&arima.train(&ds).unwrap(), 3).unwrap();
    assert_eq!(result.confidence_kind, ConfidenceKind::IntervalLevel);
    assert_eq!(result.confidence, 0.8);
    assert!(result.lower_bounds().is_some());

    let seasonal = model(ModelFamily::SeasonalAdditive);
    let result = seasonal.predict(&seasonal.train(&ds).unwrap(), 3).unwrap();
    assert_eq!(result.confidence_kind, ConfidenceKind::Heuristic);
    assert_eq!(result.confidence, 0.9);
    assert!(result.upper_bounds().is_some());

    let lstm = model(ModelFamily::Recurrent);
    let result = lstm.predict(&lstm.train(&ds).unwrap(), 3).unwrap();
    assert_eq!(result.confidence_kind, ConfidenceKind::Heuristic);
    assert_eq!(result.confidence, 0.85);
    assert!(result.lower_bounds().is_none());
}

#[test]
fn test_arima_is_deterministic() {
    let ds = dataset(&series(40));
    let model = model(ModelFamily::Autoregressive);
    let a = model.predict(&model.train(&ds).unwrap(), 5).unwrap();
    let b = model.predict(&model.train(&ds).unwrap(), 5).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_recurrent_is_reproducible_under_seed() {
    let ds = dataset(&series(40));
    let model = model(ModelFamily::Recurrent);
    let a = model.predict(&model.train(&ds).unwrap(), 4).unwrap();
    let b = model.predict(&model.train(&ds).unwrap(), 4).unwrap();
    assert_eq!(a.values(), b.values());
}

#[test]
fn test_recurrent_needs_five_windows() {
    // L = min(10, 7 / 3) = 2, five windows need seven samples
    let model = model(ModelFamily::Recurrent);
    assert!(model.train(&dataset(&series(7))).is_ok());
    let err = model.train(&dataset(&series(6))).unwrap_err();
    assert!(matches!(err, ForecastError::Training(_)));
}

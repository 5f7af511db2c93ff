//! Flattening a collaborator's per-file payload into a training dataset.

use std::collections::BTreeMap;

use chrono::{Days, NaiveDate};
use forecast_spi::{
    DataSource, ForecastError, Result, SourcePayload, TimeSeriesPoint, TimestampOrigin,
    TrainingDataset,
};
use tracing::{debug, warn};

/// How far the flattened series departs from the payload's own dates
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateCoverage {
    /// Undated values left out of an otherwise observed series
    pub undated_dropped: usize,
    /// Real observation dates replaced by placeholder dates
    pub dates_discarded: usize,
}

/// Flattened dataset plus its date coverage
#[derive(Debug, Clone, PartialEq)]
pub struct Flattened {
    pub dataset: TrainingDataset,
    pub coverage: DateCoverage,
}

/// A dataset together with how many files produced it
#[derive(Debug, Clone, PartialEq)]
pub struct Extracted {
    pub dataset: TrainingDataset,
    pub processed_files: usize,
    pub coverage: DateCoverage,
}

/// Load `source` and flatten its payload.
pub fn extract(source: &dyn DataSource, placeholder_start: NaiveDate) -> Result<Extracted> {
    let payload = source.load()?;
    let flattened = flatten(source.name(), source.metric(), &payload, placeholder_start)?;
    Ok(Extracted {
        dataset: flattened.dataset,
        processed_files: payload.processed_files(),
        coverage: flattened.coverage,
    })
}

/// Collect every finite `mean_value` of one metric across the payload's files.
///
/// When more values carry an observation date than not, the undated ones are
/// dropped and the dataset is `Observed` (same-day values are averaged).
/// Otherwise a placeholder daily series starting at `placeholder_start` is
/// synthesized and the dataset is flagged `Synthesized`. Either way the
/// returned [`DateCoverage`] counts what was given up.
pub fn flatten(
    source: &str,
    metric: Option<&str>,
    payload: &SourcePayload,
    placeholder_start: NaiveDate,
) -> Result<Flattened> {
    let metric = match metric {
        Some(m) => m.to_string(),
        None => first_metric(payload).ok_or(ForecastError::InsufficientData {
            required: 3,
            actual: 0,
        })?,
    };

    let mut observations: Vec<(Option<NaiveDate>, f64)> = Vec::new();
    for file in &payload.files {
        let Some(value) = file.metrics.get(&metric).and_then(|block| block.mean_value) else {
            continue;
        };
        if !value.is_finite() {
            debug!(source, metric = %metric, "skipping non-finite mean_value");
            continue;
        }
        observations.push((file.observed_on, value));
    }

    if observations.is_empty() {
        return Err(ForecastError::InsufficientData {
            required: 3,
            actual: 0,
        });
    }

    let dated = observations.iter().filter(|(date, _)| date.is_some()).count();
    let undated = observations.len() - dated;

    if dated > undated {
        if undated > 0 {
            warn!(
                source,
                metric = %metric,
                dated,
                undated,
                "dropping undated values from a mostly dated series"
            );
        }
        let mut by_date: BTreeMap<NaiveDate, (f64, usize)> = BTreeMap::new();
        for (date, value) in observations.iter().filter_map(|(d, v)| d.map(|d| (d, *v))) {
            let entry = by_date.entry(date).or_insert((0.0, 0));
            entry.0 += value;
            entry.1 += 1;
        }
        let points = by_date
            .into_iter()
            .map(|(date, (sum, count))| {
                TimeSeriesPoint::new(date, sum / count as f64, &metric, source)
            })
            .collect();
        return Ok(Flattened {
            dataset: TrainingDataset::new(points, TimestampOrigin::Observed)?,
            coverage: DateCoverage {
                undated_dropped: undated,
                dates_discarded: 0,
            },
        });
    }

    warn!(
        source,
        metric = %metric,
        points = observations.len(),
        dates_discarded = dated,
        start = %placeholder_start,
        "too few per-observation dates, synthesizing a placeholder daily series"
    );
    let points = observations
        .iter()
        .enumerate()
        .map(|(i, (_, value))| {
            let date = placeholder_start
                .checked_add_days(Days::new(i as u64))
                .ok_or_else(|| {
                    ForecastError::InvalidData(format!(
                        "placeholder date {} days after {} is out of range",
                        i, placeholder_start
                    ))
                })?;
            Ok(TimeSeriesPoint::new(date, *value, &metric, source))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Flattened {
        dataset: TrainingDataset::new(points, TimestampOrigin::Synthesized)?,
        coverage: DateCoverage {
            undated_dropped: 0,
            dates_discarded: dated,
        },
    })
}

/// First metric name (in key order) that carries a `mean_value` anywhere.
fn first_metric(payload: &SourcePayload) -> Option<String> {
    payload
        .files
        .iter()
        .flat_map(|file| file.metrics.iter())
        .find(|(_, block)| block.mean_value.is_some())
        .map(|(name, _)| name.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use forecast_spi::SourceFile;

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, day).unwrap()
    }

    #[test]
    fn test_undated_files_get_placeholder_dates() {
        let payload = SourcePayload::new(vec![
            SourceFile::new().with_metric("NDVI", 0.5),
            SourceFile::new().with_metric("NDVI", 0.6),
            SourceFile::new().with_metric("NDVI", 0.7),
        ]);
        let ds = flatten("modis", Some("NDVI"), &payload, start()).unwrap().dataset;
        assert_eq!(ds.origin(), TimestampOrigin::Synthesized);
        assert_eq!(ds.values(), vec![0.5, 0.6, 0.7]);
        assert_eq!(ds.first_timestamp(), start());
        assert_eq!(ds.last_timestamp(), NaiveDate::from_ymd_opt(2020, 1, 3).unwrap());
    }

    #[test]
    fn test_dated_files_keep_real_dates_sorted_and_averaged() {
        let payload = SourcePayload::new(vec![
            SourceFile::new().observed_on(date(3)).with_metric("NDVI", 0.9),
            SourceFile::new().observed_on(date(1)).with_metric("NDVI", 0.1),
            SourceFile::new().observed_on(date(1)).with_metric("NDVI", 0.3),
        ]);
        let ds = flatten("modis", None, &payload, start()).unwrap().dataset;
        assert_eq!(ds.origin(), TimestampOrigin::Observed);
        assert_eq!(ds.timestamps(), vec![date(1), date(3)]);
        assert!((ds.values()[0] - 0.2).abs() < 1e-12);
        assert_eq!(ds.values()[1], 0.9);
    }

    #[test]
    fn test_evenly_split_payload_is_synthesized() {
        let payload = SourcePayload::new(vec![
            SourceFile::new().observed_on(date(1)).with_metric("NDVI", 0.1),
            SourceFile::new().with_metric("NDVI", 0.2),
        ]);
        let flattened = flatten("modis", Some("NDVI"), &payload, start()).unwrap();
        assert_eq!(flattened.dataset.origin(), TimestampOrigin::Synthesized);
        assert_eq!(flattened.dataset.len(), 2);
        assert_eq!(
            flattened.coverage,
            DateCoverage {
                undated_dropped: 0,
                dates_discarded: 1
            }
        );
    }

    #[test]
    fn test_mostly_dated_payload_drops_undated_values() {
        let payload = SourcePayload::new(vec![
            SourceFile::new().observed_on(date(1)).with_metric("NDVI", 0.1),
            SourceFile::new().observed_on(date(2)).with_metric("NDVI", 0.2),
            SourceFile::new().with_metric("NDVI", 0.9),
            SourceFile::new().observed_on(date(4)).with_metric("NDVI", 0.4),
        ]);
        let flattened = flatten("modis", Some("NDVI"), &payload, start()).unwrap();
        assert_eq!(flattened.dataset.origin(), TimestampOrigin::Observed);
        assert_eq!(flattened.dataset.timestamps(), vec![date(1), date(2), date(4)]);
        assert_eq!(flattened.dataset.values(), vec![0.1, 0.2, 0.4]);
        assert_eq!(flattened.coverage.undated_dropped, 1);
        assert_eq!(flattened.coverage.dates_discarded, 0);
    }

    #[test]
    fn test_fully_dated_payload_gives_up_nothing() {
        let payload = SourcePayload::new(vec![
            SourceFile::new().observed_on(date(1)).with_metric("NDVI", 0.1),
            SourceFile::new().observed_on(date(2)).with_metric("NDVI", 0.2),
        ]);
        let flattened = flatten("modis", Some("NDVI"), &payload, start()).unwrap();
        assert_eq!(flattened.coverage, DateCoverage::default());
    }

    #[test]
    fn test_metric_blocks_without_mean_are_skipped() {
        let mut file = SourceFile::new();
        file.metrics.insert("NDVI".to_string(), Default::default());
        let payload = SourcePayload::new(vec![
            file,
            SourceFile::new().with_metric("NDVI", 0.4),
            SourceFile::new().with_metric("NDVI", f64::NAN),
            SourceFile::new().with_metric("EVI", 0.8),
        ]);
        let ds = flatten("modis", Some("NDVI"), &payload, start()).unwrap().dataset;
        assert_eq!(ds.values(), vec![0.4]);
    }

    #[test]
    fn test_metric_defaults_to_first_available() {
        let payload = SourcePayload::new(vec![SourceFile::new()
            .with_metric("T2M", 281.0)
            .with_metric("PRECTOT", 2.5)]);
        let ds = flatten("merra", None, &payload, start()).unwrap().dataset;
        // BTreeMap order: PRECTOT before T2M
        assert_eq!(ds.metric(), "PRECTOT");
    }

    #[test]
    fn test_no_values_is_insufficient_data() {
        let payload = SourcePayload::new(vec![SourceFile::new().named("empty.hdf")]);
        let err = flatten("modis", Some("NDVI"), &payload, start()).unwrap_err();
        assert_eq!(
            err,
            ForecastError::InsufficientData {
                required: 3,
                actual: 0
            }
        );
        assert!(flatten("modis", None, &SourcePayload::default(), start()).is_err());
    }
}

//! Time-stamped observations and validated training datasets.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{ForecastError, Result};

/// A single observation of one metric from one source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesPoint {
    /// Observation date (daily resolution)
    pub timestamp: NaiveDate,
    /// Observed value
    pub value: f64,
    /// Metric name, e.g. "NDVI"
    pub metric: String,
    /// Source tag, e.g. "modis"
    pub source: String,
}

impl TimeSeriesPoint {
    pub fn new(timestamp: NaiveDate, value: f64, metric: &str, source: &str) -> Self {
        Self {
            timestamp,
            value,
            metric: metric.to_string(),
            source: source.to_string(),
        }
    }
}

/// Where the dataset's timestamps came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimestampOrigin {
    /// Every point carried a genuine observation date
    Observed,
    /// Dates are a placeholder daily series; temporal fidelity is not real
    Synthesized,
}

impl TimestampOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimestampOrigin::Observed => "observed",
            TimestampOrigin::Synthesized => "synthesized",
        }
    }
}

/// Ordered observations of a single metric.
///
/// Invariants: non-empty, one metric, strictly increasing timestamps, finite values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "DatasetRepr")]
pub struct TrainingDataset {
    metric: String,
    source: String,
    origin: TimestampOrigin,
    points: Vec<TimeSeriesPoint>,
}

impl TrainingDataset {
    /// Validate and wrap a sequence of points.
    pub fn new(points: Vec<TimeSeriesPoint>, origin: TimestampOrigin) -> Result<Self> {
        let first = points
            .first()
            .ok_or(ForecastError::InsufficientData {
                required: 1,
                actual: 0,
            })?;
        let metric = first.metric.clone();
        let source = first.source.clone();

        for (i, point) in points.iter().enumerate() {
            if point.metric != metric {
                return Err(ForecastError::InvalidData(format!(
                    "mixed metrics in one dataset: '{}' and '{}'",
                    metric, point.metric
                )));
            }
            if !point.value.is_finite() {
                return Err(ForecastError::InvalidData(format!(
                    "non-finite value at {}",
                    point.timestamp
                )));
            }
            if i > 0 && point.timestamp <= points[i - 1].timestamp {
                return Err(ForecastError::InvalidData(format!(
                    "timestamps must be strictly increasing: {} follows {}",
                    point.timestamp,
                    points[i - 1].timestamp
                )));
            }
        }

        Ok(Self {
            metric,
            source,
            origin,
            points,
        })
    }

    /// Build a dataset of observed points from parallel date/value slices.
    pub fn from_values(
        metric: &str,
        source: &str,
        dates: &[NaiveDate],
        values: &[f64],
    ) -> Result<Self> {
        if dates.len() != values.len() {
            return Err(ForecastError::InvalidData(format!(
                "{} dates for {} values",
                dates.len(),
                values.len()
            )));
        }
        let points = dates
            .iter()
            .zip(values)
            .map(|(&date, &value)| TimeSeriesPoint::new(date, value, metric, source))
            .collect();
        Self::new(points, TimestampOrigin::Observed)
    }

    /// Build a daily dataset starting at `start`.
    pub fn daily(metric: &str, source: &str, start: NaiveDate, values: &[f64]) -> Result<Self> {
        let dates: Vec<NaiveDate> = (0..values.len())
            .map(|i| start + chrono::Duration::days(i as i64))
            .collect();
        Self::from_values(metric, source, &dates, values)
    }

    pub fn metric(&self) -> &str {
        &self.metric
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn origin(&self) -> TimestampOrigin {
        self.origin
    }

    pub fn points(&self) -> &[TimeSeriesPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }

    pub fn timestamps(&self) -> Vec<NaiveDate> {
        self.points.iter().map(|p| p.timestamp).collect()
    }

    pub fn first_timestamp(&self) -> NaiveDate {
        self.points[0].timestamp
    }

    pub fn last_timestamp(&self) -> NaiveDate {
        self.points[self.points.len() - 1].timestamp
    }
}

/// Wire form of [`TrainingDataset`]; re-validated on deserialization.
#[derive(Deserialize)]
struct DatasetRepr {
    metric: String,
    source: String,
    origin: TimestampOrigin,
    points: Vec<TimeSeriesPoint>,
}

impl TryFrom<DatasetRepr> for TrainingDataset {
    type Error = ForecastError;

    fn try_from(repr: DatasetRepr) -> Result<Self> {
        let dataset = Self::new(repr.points, repr.origin)?;
        if dataset.metric != repr.metric || dataset.source != repr.source {
            return Err(ForecastError::InvalidData(format!(
                "dataset header {}/{} does not match its points",
                repr.source, repr.metric
            )));
        }
        Ok(dataset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    #[test]
    fn test_dataset_accepts_increasing_points() {
        let dates = [date(1), date(2), date(5)];
        let ds = TrainingDataset::from_values("NDVI", "modis", &dates, &[0.1, 0.2, 0.3]).unwrap();
        assert_eq!(ds.len(), 3);
        assert_eq!(ds.metric(), "NDVI");
        assert_eq!(ds.source(), "modis");
        assert_eq!(ds.first_timestamp(), date(1));
        assert_eq!(ds.last_timestamp(), date(5));
        assert_eq!(ds.origin(), TimestampOrigin::Observed);
    }

    #[test]
    fn test_dataset_rejects_duplicate_timestamps() {
        let dates = [date(1), date(1)];
        let result = TrainingDataset::from_values("NDVI", "modis", &dates, &[0.1, 0.2]);
        assert!(matches!(result, Err(ForecastError::InvalidData(_))));
    }

    #[test]
    fn test_dataset_rejects_decreasing_timestamps() {
        let dates = [date(3), date(2)];
        let result = TrainingDataset::from_values("NDVI", "modis", &dates, &[0.1, 0.2]);
        assert!(result.is_err());
    }

    #[test]
    fn test_dataset_rejects_mixed_metrics() {
        let points = vec![
            TimeSeriesPoint::new(date(1), 0.1, "NDVI", "modis"),
            TimeSeriesPoint::new(date(2), 0.2, "EVI", "modis"),
        ];
        let result = TrainingDataset::new(points, TimestampOrigin::Observed);
        assert!(matches!(result, Err(ForecastError::InvalidData(_))));
    }

    #[test]
    fn test_dataset_rejects_nan() {
        let dates = [date(1), date(2)];
        let result = TrainingDataset::from_values("NDVI", "modis", &dates, &[0.1, f64::NAN]);
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_dataset_is_insufficient() {
        let result = TrainingDataset::new(Vec::new(), TimestampOrigin::Observed);
        assert!(matches!(
            result,
            Err(ForecastError::InsufficientData { required: 1, actual: 0 })
        ));
    }

    #[test]
    fn test_daily_constructor() {
        let ds = TrainingDataset::daily("T2M", "merra", date(1), &[280.0, 281.0, 279.5]).unwrap();
        assert_eq!(ds.timestamps(), vec![date(1), date(2), date(3)]);
        assert_eq!(ds.values(), vec![280.0, 281.0, 279.5]);
    }

    #[test]
    fn test_deserialization_revalidates() {
        let ds = TrainingDataset::daily("NDVI", "modis", date(1), &[0.1, 0.2]).unwrap();
        let json = serde_json::to_string(&ds).unwrap();
        let back: TrainingDataset = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ds);

        let empty = r#"{"metric":"NDVI","source":"modis","origin":"observed","points":[]}"#;
        assert!(serde_json::from_str::<TrainingDataset>(empty).is_err());
    }
}

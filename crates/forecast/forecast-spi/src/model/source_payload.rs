//! Payload handed over by a data-extraction collaborator.
//!
//! The shape mirrors what raster/NetCDF/HDF loaders produce: a list of files,
//! each exposing named metric blocks that carry at least a `mean_value`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Everything one source produced for a forecasting run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourcePayload {
    /// Number of files the loader processed; defaults to `files.len()`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_files: Option<usize>,
    /// Per-file metric summaries
    #[serde(default)]
    pub files: Vec<SourceFile>,
}

impl SourcePayload {
    pub fn new(files: Vec<SourceFile>) -> Self {
        Self {
            total_files: None,
            files,
        }
    }

    pub fn with_total_files(mut self, total: usize) -> Self {
        self.total_files = Some(total);
        self
    }

    /// Files reported as processed by the loader.
    pub fn processed_files(&self) -> usize {
        self.total_files.unwrap_or(self.files.len())
    }
}

/// Summary of one input file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Genuine observation date, when the loader could recover one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_on: Option<NaiveDate>,
    /// Named metric blocks (vegetation indices, climate variables, bands)
    #[serde(default)]
    pub metrics: BTreeMap<String, MetricBlock>,
}

impl SourceFile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn observed_on(mut self, date: NaiveDate) -> Self {
        self.observed_on = Some(date);
        self
    }

    pub fn with_metric(mut self, metric: &str, mean_value: f64) -> Self {
        self.metrics.insert(metric.to_string(), MetricBlock::mean(mean_value));
        self
    }
}

/// One metric block inside a file. Extra loader fields are kept verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricBlock {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mean_value: Option<f64>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl MetricBlock {
    pub fn mean(value: f64) -> Self {
        Self {
            mean_value: Some(value),
            extra: BTreeMap::new(),
        }
    }
}

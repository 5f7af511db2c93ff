//! Ready-made [`DataSource`] implementations.

use std::fs;
use std::path::{Path, PathBuf};

use forecast_spi::{DataSource, ForecastError, Result, SourcePayload};

/// A payload held in memory
#[derive(Debug, Clone)]
pub struct StaticSource {
    name: String,
    metric: Option<String>,
    payload: SourcePayload,
}

impl StaticSource {
    pub fn new(name: &str, payload: SourcePayload) -> Self {
        Self {
            name: name.to_string(),
            metric: None,
            payload,
        }
    }

    pub fn with_metric(mut self, metric: &str) -> Self {
        self.metric = Some(metric.to_string());
        self
    }
}

impl DataSource for StaticSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn metric(&self) -> Option<&str> {
        self.metric.as_deref()
    }

    fn load(&self) -> Result<SourcePayload> {
        Ok(self.payload.clone())
    }
}

/// A payload read from a JSON file on every load
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    name: String,
    path: PathBuf,
    metric: Option<String>,
}

impl JsonFileSource {
    pub fn new(name: &str, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.to_string(),
            path: path.into(),
            metric: None,
        }
    }

    /// Source named after the file stem, e.g. `modis.json` becomes `modis`.
    pub fn from_path(path: impl Into<PathBuf>) -> Option<Self> {
        let path = path.into();
        let name = path.file_stem()?.to_str()?.to_string();
        Some(Self {
            name,
            path,
            metric: None,
        })
    }

    pub fn with_metric(mut self, metric: &str) -> Self {
        self.metric = Some(metric.to_string());
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DataSource for JsonFileSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn metric(&self) -> Option<&str> {
        self.metric.as_deref()
    }

    fn load(&self) -> Result<SourcePayload> {
        let text = fs::read_to_string(&self.path).map_err(|e| ForecastError::Extraction {
            source_name: self.name.clone(),
            reason: format!("{}: {}", self.path.display(), e),
        })?;
        serde_json::from_str(&text).map_err(|e| ForecastError::Extraction {
            source_name: self.name.clone(),
            reason: format!("{}: {}", self.path.display(), e),
        })
    }
}

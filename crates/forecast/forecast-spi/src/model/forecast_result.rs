//! Forecast output of a single family.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::family::ModelFamily;

/// How a family's confidence scalar should be read.
///
/// The families disagree on what "confidence" means; the label keeps the
/// conventions apart instead of pretending they are comparable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceKind {
    /// The scalar is the nominal coverage of the returned bounds
    IntervalLevel,
    /// The scalar is a fixed per-family constant with no statistical meaning
    Heuristic,
}

/// One forecast step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub timestamp: NaiveDate,
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lower: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upper: Option<f64>,
}

/// Ordered forecast plus the model tag and a family-specific confidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResult {
    pub family: ModelFamily,
    pub model_used: String,
    pub points: Vec<ForecastPoint>,
    pub confidence: f64,
    pub confidence_kind: ConfidenceKind,
}

impl ForecastResult {
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

    /// Timestamps formatted as ISO dates (`YYYY-MM-DD`).
    pub fn iso_timestamps(&self) -> Vec<String> {
        self.points
            .iter()
            .map(|p| p.timestamp.format("%Y-%m-%d").to_string())
            .collect()
    }

    /// Lower bounds, if every step carries one.
    pub fn lower_bounds(&self) -> Option<Vec<f64>> {
        self.points.iter().map(|p| p.lower).collect()
    }

    /// Upper bounds, if every step carries one.
    pub fn upper_bounds(&self) -> Option<Vec<f64>> {
        self.points.iter().map(|p| p.upper).collect()
    }
}

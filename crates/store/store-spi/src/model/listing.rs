//! Read-only aggregations over the metadata index.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use forecast_spi::ModelFamily;
use serde::{Deserialize, Serialize};

use super::index_entry::IndexEntry;

/// Per-model line of a listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSummary {
    pub last_updated: DateTime<Utc>,
    pub training_samples: usize,
    pub file_size: u64,
    /// Whether the blob is present on disk
    pub exists: bool,
}

/// Listing grouped `source -> family -> summary`
pub type ModelListing = BTreeMap<String, BTreeMap<ModelFamily, ModelSummary>>;

/// Totals over every indexed model
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreStats {
    pub total_models: usize,
    pub total_size_bytes: u64,
    pub total_size_mb: f64,
    pub sources: Vec<String>,
    pub families: Vec<ModelFamily>,
    pub models_by_source: BTreeMap<String, usize>,
}

impl StoreStats {
    pub fn from_entries<'a>(entries: impl IntoIterator<Item = &'a IndexEntry>) -> Self {
        let mut stats = StoreStats::default();
        for entry in entries {
            stats.total_models += 1;
            stats.total_size_bytes += entry.file_size;
            *stats.models_by_source.entry(entry.source.clone()).or_insert(0) += 1;
            if !stats.families.contains(&entry.family) {
                stats.families.push(entry.family);
            }
        }
        stats.families.sort();
        stats.sources = stats.models_by_source.keys().cloned().collect();
        stats.total_size_mb =
            (stats.total_size_bytes as f64 / (1024.0 * 1024.0) * 100.0).round() / 100.0;
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(source: &str, family: ModelFamily, size: u64) -> IndexEntry {
        IndexEntry {
            source: source.to_string(),
            family,
            last_updated: Utc::now(),
            training_samples: 10,
            file_size: size,
            metadata: serde_json::Value::Null,
        }
    }

    #[test]
    fn test_stats_from_entries() {
        let entries = vec![
            entry("modis", ModelFamily::Autoregressive, 1024 * 1024),
            entry("modis", ModelFamily::Recurrent, 1024 * 1024),
            entry("alos", ModelFamily::Autoregressive, 512 * 1024),
        ];
        let stats = StoreStats::from_entries(&entries);
        assert_eq!(stats.total_models, 3);
        assert_eq!(stats.total_size_bytes, 2_621_440);
        assert_eq!(stats.total_size_mb, 2.5);
        assert_eq!(stats.sources, vec!["alos", "modis"]);
        assert_eq!(
            stats.families,
            vec![ModelFamily::Autoregressive, ModelFamily::Recurrent]
        );
        assert_eq!(stats.models_by_source["modis"], 2);
    }

    #[test]
    fn test_empty_stats() {
        let stats = StoreStats::from_entries(std::iter::empty());
        assert_eq!(stats, StoreStats::default());
    }
}

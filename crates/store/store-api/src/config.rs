//! Store configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Directory used when none is configured
pub const DEFAULT_MODELS_DIR: &str = "models/saved_models";

/// Records older than this many days are stale
pub const DEFAULT_MAX_AGE_DAYS: i64 = 7;

/// Environment variable overriding the models directory
pub const MODELS_DIR_ENV: &str = "BLOOMCAST_MODELS_DIR";

/// Where models live and how long they stay fresh
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    pub models_dir: PathBuf,
    pub max_age_days: i64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            models_dir: PathBuf::from(DEFAULT_MODELS_DIR),
            max_age_days: DEFAULT_MAX_AGE_DAYS,
        }
    }
}

impl StoreConfig {
    pub fn new(models_dir: impl Into<PathBuf>) -> Self {
        Self {
            models_dir: models_dir.into(),
            ..Default::default()
        }
    }

    pub fn with_max_age_days(mut self, days: i64) -> Self {
        self.max_age_days = days.max(0);
        self
    }

    pub fn models_dir(&self) -> &Path {
        &self.models_dir
    }
}

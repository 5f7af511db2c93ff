//! Model Store Consumer API
//!
//! Store configuration plus re-exports from the SPI.

mod config;

pub use config::{StoreConfig, DEFAULT_MAX_AGE_DAYS, DEFAULT_MODELS_DIR, MODELS_DIR_ENV};

pub use store_spi::{
    model_key, Clock, IndexEntry, LoadedModel, ModelListing, ModelRepository, ModelSummary,
    Result, StoreError, StoreStats, SystemClock,
};

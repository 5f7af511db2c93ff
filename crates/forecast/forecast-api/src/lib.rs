//! Forecast Consumer API
//!
//! Consumer configurations and response envelopes for the forecasting core.
//!
//! This crate provides:
//! - Configuration types for the selector, each family and the orchestrator
//! - JSON-serializable success/failure envelopes
//! - Re-exports from SPI for convenience

mod config;
mod envelope;

pub use config::{ArimaConfig, ForecastConfig, Horizon, ModelMode, RecurrentConfig, SeasonalConfig};
pub use envelope::{
    ForecastData, ForecastEnvelope, ForecastMetadata, MultiSourceEnvelope, MultiSourceMetadata,
    SourceOutcome, TrainingEnvelope, TrainingMetadata,
};

// Re-export SPI types
pub use forecast_spi::{
    Capabilities, ConfidenceKind, DataSource, ForecastError, ForecastModel, ForecastResult,
    ModelFamily, ModelHandle, ModelParams, Result, SourcePayload, TimeSeriesPoint,
    TimestampOrigin, TrainingDataset,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        ArimaConfig, ForecastConfig, ForecastEnvelope, Horizon, ModelMode, MultiSourceEnvelope,
        RecurrentConfig, SeasonalConfig, TrainingEnvelope,
    };
    pub use forecast_spi::{
        Capabilities, DataSource, ForecastError, ForecastModel, ForecastResult, ModelFamily,
        ModelHandle, Result, SourcePayload, TrainingDataset,
    };
}

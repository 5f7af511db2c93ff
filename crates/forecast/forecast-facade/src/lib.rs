//! Forecast Facade
//!
//! High-level API for forecasting pipelines. Re-exports all public types
//! from the forecast stack for convenient usage.

// Re-export everything from API (which includes SPI)
pub use forecast_api::*;

// Explicit re-exports for documentation
pub use forecast_api::prelude;

// Re-export core modules for direct access
pub use forecast_core::{
    capabilities, diagnostics, extract, families, orchestrator, selector, sources,
};

// Re-export core types at root
pub use forecast_core::{
    detect_capabilities, model_for, sample_confidence, select_family, ArimaForecaster,
    DateCoverage, Diagnostics, Extracted, Fallback, ForecastWithConfidence, JsonFileSource,
    ModelSelector, Orchestrator, RecurrentForecaster, SeasonalForecaster, Selection,
    SourceForecast, StaticSource, TrainedSource,
};

// Re-export SPI model types not surfaced by the API
pub use forecast_spi::{ForecastPoint, MetricBlock, SourceFile};

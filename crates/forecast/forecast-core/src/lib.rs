//! Forecast Core
//!
//! Model families, series diagnostics, family selection, payload extraction
//! and the orchestrator that ties them into per-source pipelines.
//!
//! Families are compiled in behind the `autoregressive`, `seasonal` and
//! `recurrent` features (all on by default); [`detect_capabilities`] reports
//! which ones this build carries.

pub mod capabilities;
pub mod confidence;
pub mod diagnostics;
pub mod extract;
pub mod families;
pub mod math;
pub mod orchestrator;
pub mod preprocessing;
pub mod selector;
pub mod sources;

// Re-export SPI types for implementations
pub use forecast_spi::{
    Capabilities, DataSource, ForecastError, ForecastModel, ForecastResult, ModelFamily,
    ModelHandle, Result, TrainingDataset,
};

// Re-export main types
pub use capabilities::detect_capabilities;
pub use confidence::ForecastWithConfidence;
pub use diagnostics::Diagnostics;
pub use extract::{extract, flatten, DateCoverage, Extracted, Flattened};
pub use families::model_for;
pub use orchestrator::{sample_confidence, Orchestrator, SourceForecast, TrainedSource};
pub use selector::{select_family, Fallback, ModelSelector, Selection};
pub use sources::{JsonFileSource, StaticSource};

#[cfg(feature = "autoregressive")]
pub use families::arima::ArimaForecaster;
#[cfg(feature = "recurrent")]
pub use families::recurrent::RecurrentForecaster;
#[cfg(feature = "seasonal")]
pub use families::seasonal::SeasonalForecaster;

//! Forecast Service Provider Interface
//!
//! Defines the data model shared by every forecasting family, the error
//! taxonomy, and the contracts implemented by model families and data sources.

pub mod contract;
pub mod error;
pub mod model;

// Re-export all public items at crate root for convenience
pub use contract::{DataSource, ForecastModel};
pub use error::{ForecastError, Result};
pub use model::{
    ArimaFit, Capabilities, ConfidenceKind, DenseWeights, FittedState, ForecastPoint,
    ForecastResult, LstmWeights, MetricBlock, ModelFamily, ModelHandle, ModelParams,
    RecurrentFit, SeasonalFit, SourceFile, SourcePayload, TimeSeriesPoint, TimestampOrigin,
    TrainingDataset, TrainingWindow,
};

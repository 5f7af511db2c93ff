//! Model module containing data structures

mod family;
mod fitted_state;
mod forecast_result;
mod model_handle;
mod source_payload;
mod time_series;

pub use family::{Capabilities, ModelFamily};
pub use fitted_state::{ArimaFit, DenseWeights, FittedState, LstmWeights, RecurrentFit, SeasonalFit};
pub use forecast_result::{ConfidenceKind, ForecastPoint, ForecastResult};
pub use model_handle::{ModelHandle, ModelParams, TrainingWindow};
pub use source_payload::{MetricBlock, SourceFile, SourcePayload};
pub use time_series::{TimeSeriesPoint, TimestampOrigin, TrainingDataset};

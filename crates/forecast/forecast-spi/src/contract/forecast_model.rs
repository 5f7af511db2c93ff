//! Unified training/prediction contract for forecasting families

use crate::error::Result;
use crate::model::{ForecastResult, ModelFamily, ModelHandle, TrainingDataset};

/// Common contract for every forecasting family.
///
/// Training never mutates the implementor: everything learned lives in the
/// returned [`ModelHandle`], so a failed fit leaves no partial state behind.
///
/// # Example
///
/// ```rust,ignore
/// use forecast_spi::ForecastModel;
///
/// fn forecast<M: ForecastModel>(
///     model: &M,
///     data: &TrainingDataset,
///     horizon: usize,
/// ) -> forecast_spi::Result<ForecastResult> {
///     let handle = model.train(data)?;
///     model.predict(&handle, horizon)
/// }
/// ```
pub trait ForecastModel: Send + Sync {
    /// Family implemented by this model
    fn family(&self) -> ModelFamily;

    /// Fit the family to a dataset.
    ///
    /// Fails with `InsufficientData` below three points and `Training` when the
    /// family cannot fit what it was given.
    fn train(&self, dataset: &TrainingDataset) -> Result<ModelHandle>;

    /// Forecast `horizon` daily steps past the handle's training window.
    ///
    /// Fails with `Usage` for an untrained handle, a handle of another family,
    /// or a zero horizon.
    fn predict(&self, handle: &ModelHandle, horizon: usize) -> Result<ForecastResult>;
}

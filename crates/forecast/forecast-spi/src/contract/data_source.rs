//! Trait for data-extraction collaborators

use crate::error::Result;
use crate::model::SourcePayload;

/// A registered source of time-stamped metric summaries.
///
/// How the payload was produced (HDF, NetCDF, GeoTIFF, a database) is the
/// collaborator's business; the forecasting core only sees the payload.
pub trait DataSource: Send + Sync {
    /// Registration name, e.g. "modis"
    fn name(&self) -> &str;

    /// Metric to forecast; `None` picks the first metric found in the payload
    fn metric(&self) -> Option<&str> {
        None
    }

    /// Load the current payload
    fn load(&self) -> Result<SourcePayload>;
}

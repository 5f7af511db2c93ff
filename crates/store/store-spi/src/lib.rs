//! Model Store Service Provider Interface
//!
//! Records, errors and contracts for persisting trained model handles keyed by
//! `(source, family)`.

pub mod contract;
pub mod error;
pub mod model;

pub use contract::{Clock, ModelRepository, SystemClock};
pub use error::{Result, StoreError};
pub use model::{
    model_key, validate_source, IndexEntry, LoadedModel, ModelListing, ModelSummary,
    PersistedModel, StoreStats,
};

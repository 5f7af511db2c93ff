//! Model module containing persisted records and read-only aggregations

mod index_entry;
mod listing;
mod persisted_model;

pub use index_entry::{model_key, validate_source, IndexEntry};
pub use listing::{ModelListing, ModelSummary, StoreStats};
pub use persisted_model::{LoadedModel, PersistedModel};

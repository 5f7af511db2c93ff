//! Model Store Facade
//!
//! Re-exports the store contracts, configuration and the filesystem
//! implementation.

pub use store_api::*;

pub use store_core::{FsModelStore, ManualClock, INDEX_FILE};

pub use store_spi::PersistedModel;

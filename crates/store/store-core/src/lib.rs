//! Model Store Core
//!
//! [`FsModelStore`] keeps one JSON blob per `(source, family)` plus a shared
//! `model_metadata.json` index in a single directory.

mod clock;
mod fs_store;

pub use clock::ManualClock;
pub use fs_store::{FsModelStore, INDEX_FILE};

//! Error module containing error types and result aliases

mod store_error;

pub use store_error::StoreError;

/// Result type for store operations
pub type Result<T> = std::result::Result<T, StoreError>;

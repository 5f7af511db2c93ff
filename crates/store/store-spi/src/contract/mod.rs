//! Contract module containing trait definitions for model persistence

mod clock;
mod model_repository;

pub use clock::{Clock, SystemClock};
pub use model_repository::ModelRepository;

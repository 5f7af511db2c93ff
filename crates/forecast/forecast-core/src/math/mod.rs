//! Small dense numerics shared by the diagnostics and the model families.

pub mod linalg;
pub mod stats;

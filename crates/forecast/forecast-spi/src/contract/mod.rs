//! Contract module containing trait definitions for forecast operations

mod data_source;
mod forecast_model;

pub use data_source::DataSource;
pub use forecast_model::ForecastModel;

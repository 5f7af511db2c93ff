//! Series diagnostics consumed by the model selector.

mod seasonality;
mod stationarity;

pub use seasonality::{
    has_seasonality, lag1_autocorrelation, MIN_SEASONAL_SAMPLES, SEASONALITY_THRESHOLD,
};
pub use stationarity::{
    adf_test, is_stationary, AdfResult, MIN_STATIONARITY_SAMPLES, STATIONARITY_P_VALUE,
};

use forecast_spi::Capabilities;
use serde::{Deserialize, Serialize};

/// Flags and statistics computed once per training dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    pub samples: usize,
    pub has_seasonality: bool,
    pub is_stationary: bool,
    pub lag1_autocorrelation: Option<f64>,
    /// `None` when the test could not run or is not available
    pub adf_p_value: Option<f64>,
}

impl Diagnostics {
    pub fn compute(values: &[f64], capabilities: &Capabilities) -> Self {
        let adf_p_value = if capabilities.has_stationarity_test() {
            adf_test(values).map(|r| r.p_value)
        } else {
            None
        };
        Self {
            samples: values.len(),
            has_seasonality: has_seasonality(values),
            is_stationary: is_stationary(values, capabilities),
            lag1_autocorrelation: lag1_autocorrelation(values),
            adf_p_value,
        }
    }
}

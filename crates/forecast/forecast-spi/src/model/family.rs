//! Forecasting families and the build's capability set.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::error::ForecastError;

/// The closed set of forecasting families.
///
/// Declaration order is the deterministic preference order used whenever the
/// selector has to fall back to "first available".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelFamily {
    /// ARIMA grid search scored by AIC
    Autoregressive,
    /// Additive trend with multiplicative yearly and weekly seasonality
    SeasonalAdditive,
    /// Stacked LSTM with autoregressive rollout
    Recurrent,
}

impl ModelFamily {
    /// All families in preference order.
    pub const ALL: [ModelFamily; 3] = [
        ModelFamily::Autoregressive,
        ModelFamily::SeasonalAdditive,
        ModelFamily::Recurrent,
    ];

    /// Stable short name, used in persistence keys and on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelFamily::Autoregressive => "arima",
            ModelFamily::SeasonalAdditive => "seasonal",
            ModelFamily::Recurrent => "lstm",
        }
    }

    /// Documented substitution order when this family is requested but not available.
    pub fn fallback_chain(&self) -> [ModelFamily; 2] {
        match self {
            ModelFamily::Autoregressive => [ModelFamily::SeasonalAdditive, ModelFamily::Recurrent],
            ModelFamily::SeasonalAdditive => [ModelFamily::Autoregressive, ModelFamily::Recurrent],
            ModelFamily::Recurrent => [ModelFamily::Autoregressive, ModelFamily::SeasonalAdditive],
        }
    }
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelFamily {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "arima" | "autoregressive" => Ok(ModelFamily::Autoregressive),
            "seasonal" | "seasonal_additive" | "seasonal-additive" | "prophet" => {
                Ok(ModelFamily::SeasonalAdditive)
            }
            "lstm" | "recurrent" => Ok(ModelFamily::Recurrent),
            other => Err(ForecastError::UnknownFamily(other.to_string())),
        }
    }
}

/// Which families (and the stationarity test backend) this build can run.
///
/// Computed once at startup and threaded into the selector; never probed ad hoc.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    families: BTreeSet<ModelFamily>,
    stationarity_test: bool,
}

impl Capabilities {
    /// Every family plus the stationarity test.
    pub fn all() -> Self {
        Self {
            families: ModelFamily::ALL.into_iter().collect(),
            stationarity_test: true,
        }
    }

    /// Nothing available.
    pub fn none() -> Self {
        Self {
            families: BTreeSet::new(),
            stationarity_test: false,
        }
    }

    /// Exactly the given families; the stationarity test ships with the
    /// autoregressive backend.
    pub fn only(families: &[ModelFamily]) -> Self {
        let families: BTreeSet<ModelFamily> = families.iter().copied().collect();
        let stationarity_test = families.contains(&ModelFamily::Autoregressive);
        Self {
            families,
            stationarity_test,
        }
    }

    pub fn with_family(mut self, family: ModelFamily) -> Self {
        self.families.insert(family);
        self
    }

    pub fn without_family(mut self, family: ModelFamily) -> Self {
        self.families.remove(&family);
        self
    }

    pub fn with_stationarity_test(mut self, available: bool) -> Self {
        self.stationarity_test = available;
        self
    }

    pub fn supports(&self, family: ModelFamily) -> bool {
        self.families.contains(&family)
    }

    pub fn has_stationarity_test(&self) -> bool {
        self.stationarity_test
    }

    pub fn is_empty(&self) -> bool {
        self.families.is_empty()
    }

    /// Available families in preference order.
    pub fn families(&self) -> impl Iterator<Item = ModelFamily> + '_ {
        self.families.iter().copied()
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::all()
    }
}

//! Forecasting configuration types.

use chrono::NaiveDate;
use forecast_spi::{ForecastError, ModelFamily, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Requested family: let the selector decide, or ask for one explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ModelMode {
    #[default]
    Auto,
    Family(ModelFamily),
}

impl ModelMode {
    pub fn parse(s: &str) -> Result<Self> {
        s.parse()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelMode::Auto => "auto",
            ModelMode::Family(family) => family.as_str(),
        }
    }
}

impl FromStr for ModelMode {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self> {
        if s.trim().eq_ignore_ascii_case("auto") {
            return Ok(ModelMode::Auto);
        }
        s.parse::<ModelFamily>().map(ModelMode::Family)
    }
}

impl fmt::Display for ModelMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for ModelMode {
    type Error = ForecastError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<ModelMode> for String {
    fn from(mode: ModelMode) -> Self {
        mode.as_str().to_string()
    }
}

/// Number of daily steps to forecast, bounded to `1..=Horizon::MAX`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub struct Horizon(usize);

impl Horizon {
    pub const MAX: usize = 30;

    pub fn new(steps: usize) -> Result<Self> {
        if steps == 0 || steps > Self::MAX {
            return Err(ForecastError::Usage(format!(
                "horizon must be between 1 and {}, got {}",
                Self::MAX,
                steps
            )));
        }
        Ok(Self(steps))
    }

    pub fn steps(&self) -> usize {
        self.0
    }
}

impl Default for Horizon {
    fn default() -> Self {
        Self(5)
    }
}

impl TryFrom<usize> for Horizon {
    type Error = ForecastError;

    fn try_from(value: usize) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Horizon> for usize {
    fn from(h: Horizon) -> Self {
        h.0
    }
}

/// Autoregressive grid-search configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArimaConfig {
    /// Largest AR order tried
    pub max_p: usize,
    /// Largest differencing order tried
    pub max_d: usize,
    /// Largest MA order tried
    pub max_q: usize,
    /// Order retried when every grid combination fails
    pub fallback_order: (usize, usize, usize),
    /// Coverage of the returned bounds; also reported as the confidence scalar
    pub interval_level: f64,
}

impl Default for ArimaConfig {
    fn default() -> Self {
        Self {
            max_p: 2,
            max_d: 1,
            max_q: 2,
            fallback_order: (1, 1, 1),
            interval_level: 0.8,
        }
    }
}

/// Seasonal-additive decomposition configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonalConfig {
    /// Fourier pairs for the yearly component
    pub yearly_order: usize,
    /// Fourier pairs for the weekly component
    pub weekly_order: usize,
    /// Ridge penalty on the seasonal coefficients
    pub regularization: f64,
    /// Coverage of the prediction band
    pub interval_level: f64,
}

impl Default for SeasonalConfig {
    fn default() -> Self {
        Self {
            yearly_order: 4,
            weekly_order: 3,
            regularization: 1.0,
            interval_level: 0.8,
        }
    }
}

/// Recurrent-sequence configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurrentConfig {
    /// Upper bound on the sliding-window length
    pub max_sequence_length: usize,
    /// Fewer windows than this fails training
    pub min_windows: usize,
    /// Units in each of the two LSTM layers
    pub units: usize,
    /// Units in the hidden dense layer
    pub dense_units: usize,
    pub dropout: f64,
    pub epochs: usize,
    pub batch_size: usize,
    /// Trailing share of windows held out for validation
    pub validation_split: f64,
    pub learning_rate: f64,
    /// Seed for weight initialization, shuffling and dropout
    pub seed: u64,
}

impl Default for RecurrentConfig {
    fn default() -> Self {
        Self {
            max_sequence_length: 10,
            min_windows: 5,
            units: 50,
            dense_units: 25,
            dropout: 0.2,
            epochs: 50,
            batch_size: 32,
            validation_split: 0.2,
            learning_rate: 0.001,
            seed: 42,
        }
    }
}

impl RecurrentConfig {
    /// Smaller network for quick runs
    pub fn compact() -> Self {
        Self {
            units: 8,
            dense_units: 4,
            epochs: 10,
            ..Default::default()
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs.max(1);
        self
    }
}

/// Top-level configuration for the orchestrator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastConfig {
    /// Default family request
    pub mode: ModelMode,
    /// Default forecast horizon
    pub horizon: Horizon,
    pub arima: ArimaConfig,
    pub seasonal: SeasonalConfig,
    pub recurrent: RecurrentConfig,
    /// First date of the placeholder series used when a source has no real dates
    pub placeholder_start: NaiveDate,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            mode: ModelMode::Auto,
            horizon: Horizon::default(),
            arima: ArimaConfig::default(),
            seasonal: SeasonalConfig::default(),
            recurrent: RecurrentConfig::default(),
            placeholder_start: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or_default(),
        }
    }
}

impl ForecastConfig {
    pub fn mode(mut self, mode: ModelMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn horizon(mut self, horizon: Horizon) -> Self {
        self.horizon = horizon;
        self
    }

    pub fn arima(mut self, arima: ArimaConfig) -> Self {
        self.arima = arima;
        self
    }

    pub fn seasonal(mut self, seasonal: SeasonalConfig) -> Self {
        self.seasonal = seasonal;
        self
    }

    pub fn recurrent(mut self, recurrent: RecurrentConfig) -> Self {
        self.recurrent = recurrent;
        self
    }

    pub fn placeholder_start(mut self, start: NaiveDate) -> Self {
        self.placeholder_start = start;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_mode_parse() {
        assert_eq!(ModelMode::parse("auto").unwrap(), ModelMode::Auto);
        assert_eq!(ModelMode::parse("AUTO").unwrap(), ModelMode::Auto);
        assert_eq!(
            ModelMode::parse("lstm").unwrap(),
            ModelMode::Family(ModelFamily::Recurrent)
        );
        assert_eq!(
            ModelMode::parse("prophet").unwrap(),
            ModelMode::Family(ModelFamily::SeasonalAdditive)
        );
        assert!(matches!(
            ModelMode::parse("gbm"),
            Err(ForecastError::UnknownFamily(_))
        ));
    }

    #[test]
    fn test_model_mode_serde_as_string() {
        let json = serde_json::to_string(&ModelMode::Family(ModelFamily::Autoregressive)).unwrap();
        assert_eq!(json, "\"arima\"");
        let mode: ModelMode = serde_json::from_str("\"auto\"").unwrap();
        assert_eq!(mode, ModelMode::Auto);
        assert!(serde_json::from_str::<ModelMode>("\"nope\"").is_err());
    }

    #[test]
    fn test_horizon_bounds() {
        assert!(Horizon::new(0).is_err());
        assert!(Horizon::new(31).is_err());
        assert_eq!(Horizon::new(1).unwrap().steps(), 1);
        assert_eq!(Horizon::new(30).unwrap().steps(), 30);
        assert_eq!(Horizon::default().steps(), 5);
        assert!(serde_json::from_str::<Horizon>("45").is_err());
    }

    #[test]
    fn test_default_config() {
        let config = ForecastConfig::default();
        assert_eq!(config.mode, ModelMode::Auto);
        assert_eq!(config.arima.fallback_order, (1, 1, 1));
        assert_eq!(config.arima.interval_level, 0.8);
        assert_eq!(config.recurrent.units, 50);
        assert_eq!(config.recurrent.epochs, 50);
        assert_eq!(config.recurrent.batch_size, 32);
        assert_eq!(
            config.placeholder_start,
            NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()
        );
    }

    #[test]
    fn test_config_builder_and_serde() {
        let config = ForecastConfig::default()
            .mode(ModelMode::Family(ModelFamily::SeasonalAdditive))
            .horizon(Horizon::new(7).unwrap())
            .recurrent(RecurrentConfig::compact().with_seed(7));
        let json = serde_json::to_string(&config).unwrap();
        let back: ForecastConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
        assert_eq!(back.recurrent.seed, 7);
    }
}

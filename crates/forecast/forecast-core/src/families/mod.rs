//! Forecasting family implementations.
//!
//! Each family is compiled in behind its cargo feature; [`model_for`] maps a
//! [`ModelFamily`] to a boxed [`ForecastModel`] configured from a
//! [`ForecastConfig`].

#[cfg(feature = "autoregressive")]
pub mod arima;
#[cfg(feature = "recurrent")]
pub mod recurrent;
#[cfg(feature = "seasonal")]
pub mod seasonal;

use chrono::{Days, NaiveDate};
use forecast_api::ForecastConfig;
use forecast_spi::{ForecastError, ForecastModel, ModelFamily, ModelHandle, Result};

/// Instantiate the model for `family`.
pub fn model_for(family: ModelFamily, config: &ForecastConfig) -> Result<Box<dyn ForecastModel>> {
    match family {
        #[cfg(feature = "autoregressive")]
        ModelFamily::Autoregressive => {
            Ok(Box::new(arima::ArimaForecaster::new(config.arima.clone())))
        }
        #[cfg(feature = "seasonal")]
        ModelFamily::SeasonalAdditive => Ok(Box::new(seasonal::SeasonalForecaster::new(
            config.seasonal.clone(),
        ))),
        #[cfg(feature = "recurrent")]
        ModelFamily::Recurrent => Ok(Box::new(recurrent::RecurrentForecaster::new(
            config.recurrent.clone(),
        ))),
        #[allow(unreachable_patterns)]
        other => Err(ForecastError::Configuration(format!(
            "model family {} is not compiled into this build",
            other
        ))),
    }
}

/// Common preconditions of `predict`: trained handle of the right family, non-zero horizon.
pub(crate) fn check_predict(
    handle: &ModelHandle,
    family: ModelFamily,
    horizon: usize,
) -> Result<()> {
    if !handle.is_trained() {
        return Err(ForecastError::Usage(format!(
            "cannot predict with an untrained {} handle",
            handle.family()
        )));
    }
    if handle.family() != family {
        return Err(ForecastError::Usage(format!(
            "handle was trained by the {} family, not {}",
            handle.family(),
            family
        )));
    }
    if horizon == 0 {
        return Err(ForecastError::Usage("horizon must be at least 1".to_string()));
    }
    handle.state().validate()
}

/// The `horizon` daily dates following the handle's last training timestamp.
pub(crate) fn forecast_dates(handle: &ModelHandle, horizon: usize) -> Result<Vec<NaiveDate>> {
    let end = handle
        .window()
        .map(|w| w.end)
        .ok_or_else(|| ForecastError::Usage("handle has no training window".to_string()))?;
    (1..=horizon as u64)
        .map(|step| {
            end.checked_add_days(Days::new(step)).ok_or_else(|| {
                ForecastError::Usage(format!(
                    "forecast date {} days after {} is out of range",
                    step, end
                ))
            })
        })
        .collect()
}

#[cfg(all(test, feature = "full"))]
mod tests {
    use super::*;

    #[test]
    fn test_model_for_every_family() {
        let config = ForecastConfig::default();
        for family in ModelFamily::ALL {
            let model = model_for(family, &config).unwrap();
            assert_eq!(model.family(), family);
        }
    }

    #[test]
    fn test_check_predict_rejects_untrained() {
        let handle = ModelHandle::untrained(ModelFamily::Autoregressive);
        let err = check_predict(&handle, ModelFamily::Autoregressive, 3).unwrap_err();
        assert!(matches!(err, ForecastError::Usage(_)));
    }
}

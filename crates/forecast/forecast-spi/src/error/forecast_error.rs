//! Forecast error types

use thiserror::Error;

/// Errors that can occur while extracting, selecting, training or predicting.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ForecastError {
    /// Too few observations to train anything
    #[error("Insufficient data: need at least {required} points, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    /// No forecasting family can serve the request in this build
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A family failed to fit the training data
    #[error("Training failed: {0}")]
    Training(String),

    /// The caller misused a model (untrained handle, wrong family, zero horizon)
    #[error("Usage error: {0}")]
    Usage(String),

    /// The dataset violates its ordering or value invariants
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// The requested source is not registered
    #[error("Unknown data source: {0}")]
    UnknownSource(String),

    /// The requested family name is not recognised
    #[error("Unknown model family '{0}': expected auto, arima, seasonal or lstm")]
    UnknownFamily(String),

    /// The collaborator failed to hand over its payload
    #[error("Extraction from '{source_name}' failed: {reason}")]
    Extraction { source_name: String, reason: String },
}

impl ForecastError {
    /// Short taxonomy label used in envelopes and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ForecastError::InsufficientData { .. } => "InsufficientDataError",
            ForecastError::Configuration(_) => "ConfigurationError",
            ForecastError::Training(_) => "TrainingError",
            ForecastError::Usage(_) => "UsageError",
            ForecastError::InvalidData(_) => "InvalidDataError",
            ForecastError::UnknownSource(_) => "UnknownSourceError",
            ForecastError::UnknownFamily(_) => "ConfigurationError",
            ForecastError::Extraction { .. } => "ExtractionError",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_data_error_message() {
        let error = ForecastError::InsufficientData {
            required: 3,
            actual: 2,
        };
        assert_eq!(
            error.to_string(),
            "Insufficient data: need at least 3 points, got 2"
        );
        assert_eq!(error.kind(), "InsufficientDataError");
    }

    #[test]
    fn test_configuration_error_message() {
        let error = ForecastError::Configuration("no forecasting family available".to_string());
        assert_eq!(
            error.to_string(),
            "Configuration error: no forecasting family available"
        );
        assert_eq!(error.kind(), "ConfigurationError");
    }

    #[test]
    fn test_training_and_usage_kinds() {
        assert_eq!(ForecastError::Training("x".into()).kind(), "TrainingError");
        assert_eq!(ForecastError::Usage("x".into()).kind(), "UsageError");
    }

    #[test]
    fn test_unknown_family_lists_accepted_names() {
        let error = ForecastError::UnknownFamily("xgboost".to_string());
        assert!(error.to_string().contains("xgboost"));
        assert!(error.to_string().contains("arima"));
    }

    #[test]
    fn test_extraction_error_names_source() {
        let error = ForecastError::Extraction {
            source_name: "merra".to_string(),
            reason: "file unreadable".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Extraction from 'merra' failed: file unreadable"
        );
    }

    #[test]
    fn test_error_is_clone_and_eq() {
        let error = ForecastError::Usage("model is not trained".to_string());
        assert_eq!(error.clone(), error);
    }
}

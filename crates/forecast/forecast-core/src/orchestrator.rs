//! Per-source forecasting pipelines and the multi-source fan-out.
//!
//! Every public operation answers with an envelope. Errors raised anywhere in a
//! source pipeline (extraction, selection, training, prediction) and panics
//! inside it are converted into a failure entry for that source only.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use forecast_api::{
    ForecastConfig, ForecastData, ForecastEnvelope, ForecastMetadata, Horizon, ModelMode,
    MultiSourceEnvelope, MultiSourceMetadata, SourceOutcome, TrainingEnvelope, TrainingMetadata,
};
use forecast_spi::{
    Capabilities, DataSource, ForecastError, ForecastResult, ModelHandle, Result, TrainingDataset,
};
use rayon::prelude::*;
use store_spi::ModelRepository;
use tracing::{debug, error, info, warn};

use crate::extract::{extract, DateCoverage};
use crate::families::model_for;
use crate::selector::{ModelSelector, Selection};

/// Fewest samples any pipeline will train on
pub const MIN_TRAINING_SAMPLES: usize = 3;

/// Sample-size confidence heuristic: `min(0.95, 0.7 + n / 100)`.
pub fn sample_confidence(samples: usize) -> f64 {
    (0.7 + samples as f64 / 100.0).min(0.95)
}

/// A trained handle plus everything learnt on the way to it
#[derive(Debug, Clone)]
pub struct TrainedSource {
    pub dataset: TrainingDataset,
    pub processed_files: usize,
    pub coverage: DateCoverage,
    pub selection: Selection,
    pub handle: ModelHandle,
}

/// Typed outcome of one successful source pipeline
#[derive(Debug, Clone)]
pub struct SourceForecast {
    pub trained: TrainedSource,
    pub result: ForecastResult,
}

impl SourceForecast {
    /// Sample-size heuristic for this forecast.
    pub fn confidence(&self) -> f64 {
        sample_confidence(self.trained.dataset.len())
    }

    pub fn into_envelope(self, source: &str) -> ForecastEnvelope {
        let confidence = self.confidence();
        let SourceForecast { trained, result } = self;
        let horizon = result.len();
        let data = ForecastData {
            predicted_values: result.values(),
            timestamps: result.iso_timestamps(),
            model_used: result.model_used.clone(),
            source: source.to_string(),
            lower_bounds: result.lower_bounds(),
            upper_bounds: result.upper_bounds(),
        };
        let metadata = ForecastMetadata {
            processed_files: trained.processed_files,
            confidence,
            training_samples: trained.dataset.len(),
            model_confidence: result.confidence,
            confidence_kind: result.confidence_kind,
            family: result.family,
            requested_mode: trained.selection.requested.to_string(),
            fallback: trained.selection.fallback.map(|f| f.to_string()),
            timestamp_origin: trained.dataset.origin(),
            undated_dropped: trained.coverage.undated_dropped,
            dates_discarded: trained.coverage.dates_discarded,
            has_seasonality: trained.selection.diagnostics.has_seasonality,
            is_stationary: trained.selection.diagnostics.is_stationary,
        };
        let message = format!(
            "{}-step forecast generated successfully using {} model.",
            horizon, result.model_used
        );
        ForecastEnvelope::success(data, metadata, message)
    }
}

/// Registry of data sources plus the selector, family configuration and an
/// optional model repository.
pub struct Orchestrator {
    sources: Vec<Arc<dyn DataSource>>,
    selector: ModelSelector,
    config: ForecastConfig,
    repository: Option<Arc<dyn ModelRepository>>,
}

impl Orchestrator {
    pub fn new(config: ForecastConfig) -> Self {
        Self {
            sources: Vec::new(),
            selector: ModelSelector::default(),
            config,
            repository: None,
        }
    }

    /// Restrict (or widen) the families the selector may pick.
    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.selector = ModelSelector::new(capabilities);
        self
    }

    pub fn with_repository(mut self, repository: Arc<dyn ModelRepository>) -> Self {
        self.repository = Some(repository);
        self
    }

    pub fn with_source(mut self, source: impl DataSource + 'static) -> Result<Self> {
        self.register(Arc::new(source))?;
        Ok(self)
    }

    /// Add a source; names must be unique.
    pub fn register(&mut self, source: Arc<dyn DataSource>) -> Result<()> {
        if self.sources.iter().any(|s| s.name() == source.name()) {
            return Err(ForecastError::Configuration(format!(
                "data source '{}' is already registered",
                source.name()
            )));
        }
        debug!(source = source.name(), "registered data source");
        self.sources.push(source);
        Ok(())
    }

    /// Names in registration order.
    pub fn sources(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    pub fn config(&self) -> &ForecastConfig {
        &self.config
    }

    pub fn selector(&self) -> &ModelSelector {
        &self.selector
    }

    fn source(&self, name: &str) -> Result<&Arc<dyn DataSource>> {
        self.sources
            .iter()
            .find(|s| s.name() == name)
            .ok_or_else(|| ForecastError::UnknownSource(name.to_string()))
    }

    /// Extract, select and train for one source.
    pub fn train_handle(&self, name: &str, mode: &ModelMode) -> Result<TrainedSource> {
        let source = self.source(name)?;
        let extracted = extract(source.as_ref(), self.config.placeholder_start)?;
        let dataset = extracted.dataset;
        if dataset.len() < MIN_TRAINING_SAMPLES {
            return Err(ForecastError::InsufficientData {
                required: MIN_TRAINING_SAMPLES,
                actual: dataset.len(),
            });
        }

        let selection = self.selector.select(&dataset, mode)?;
        let model = model_for(selection.family, &self.config)?;
        let handle = model.train(&dataset)?;
        info!(
            source = name,
            model = %handle.label(),
            samples = dataset.len(),
            "model trained"
        );

        Ok(TrainedSource {
            dataset,
            processed_files: extracted.processed_files,
            coverage: extracted.coverage,
            selection,
            handle,
        })
    }

    /// Extract, select, train and predict, returning typed results.
    pub fn forecast_source(
        &self,
        name: &str,
        mode: &ModelMode,
        horizon: Horizon,
    ) -> Result<SourceForecast> {
        let trained = self.train_handle(name, mode)?;
        let model = model_for(trained.handle.family(), &self.config)?;
        let result = model.predict(&trained.handle, horizon.steps())?;
        Ok(SourceForecast { trained, result })
    }

    /// Forecast one source; errors become a failure envelope.
    pub fn predict_source(
        &self,
        name: &str,
        mode: &ModelMode,
        horizon: Horizon,
    ) -> ForecastEnvelope {
        match self.forecast_source(name, mode, horizon) {
            Ok(forecast) => forecast.into_envelope(name),
            Err(e) => {
                warn!(source = name, kind = e.kind(), error = %e, "forecast failed");
                ForecastEnvelope::failure(&e)
            }
        }
    }

    /// Forecast every registered source.
    ///
    /// Pipelines run concurrently on the rayon pool. Results keep registration
    /// order, and a failing or panicking source is recorded without touching
    /// the others.
    pub fn predict_all(&self, mode: &ModelMode, horizon: Horizon) -> MultiSourceEnvelope {
        let outcomes: Vec<SourceOutcome> = self
            .sources
            .par_iter()
            .map(|source| {
                let name = source.name();
                let run = AssertUnwindSafe(|| self.predict_source(name, mode, horizon));
                let result = catch_unwind(run).unwrap_or_else(|panic| {
                    let reason = panic_message(panic.as_ref());
                    error!(source = name, reason = %reason, "source pipeline panicked");
                    ForecastEnvelope::failure_message(format!(
                        "pipeline for {} panicked: {}",
                        name, reason
                    ))
                });
                SourceOutcome {
                    source: name.to_string(),
                    result,
                }
            })
            .collect();

        let succeeded = outcomes.iter().filter(|o| o.result.success).count();
        let failed = outcomes.len() - succeeded;
        let total_files = outcomes
            .iter()
            .filter_map(|o| o.result.metadata.as_ref())
            .map(|m| m.processed_files)
            .sum();
        info!(succeeded, failed, mode = %mode, "multi-source forecast finished");

        MultiSourceEnvelope {
            success: succeeded > 0,
            message: format!(
                "Forecasts generated for {} of {} sources using {} model selection.",
                succeeded,
                outcomes.len(),
                mode
            ),
            metadata: MultiSourceMetadata {
                sources: self.sources.iter().map(|s| s.name().to_string()).collect(),
                total_files,
                model_type: mode.to_string(),
                succeeded,
                failed,
            },
            data: outcomes,
        }
    }

    /// Train one source and persist the handle.
    ///
    /// A failed save is reported as `persisted: false`; the training itself
    /// still counts as a success.
    pub fn train_source(&self, name: &str, mode: &ModelMode) -> TrainingEnvelope {
        let trained = match self.train_handle(name, mode) {
            Ok(trained) => trained,
            Err(e) => {
                warn!(source = name, kind = e.kind(), error = %e, "training failed");
                return TrainingEnvelope::failure(name, &e);
            }
        };

        let family = trained.handle.family();
        let model_used = trained.handle.label();
        let confidence = sample_confidence(trained.dataset.len());
        let params = trained.handle.params();
        let fallback = trained.selection.fallback.map(|f| f.to_string());

        let persisted = match &self.repository {
            Some(repository) => repository.save(
                name,
                family,
                &trained.handle,
                &trained.dataset,
                serde_json::json!({
                    "model_used": model_used,
                    "confidence": confidence,
                    "params": params,
                    "timestamp_origin": trained.dataset.origin(),
                }),
            ),
            None => {
                debug!(source = name, "no model repository configured, skipping persistence");
                false
            }
        };

        let message = if persisted {
            format!("Model trained and saved for {} using {}.", name, model_used)
        } else {
            format!("Model trained for {} using {} but not saved.", name, model_used)
        };
        TrainingEnvelope::success(
            message,
            TrainingMetadata {
                source: name.to_string(),
                model_used,
                family,
                training_samples: trained.dataset.len(),
                confidence,
                persisted,
                params,
                fallback,
            },
        )
    }

    /// Like [`predict_source`](Self::predict_source), bounded by `deadline`.
    ///
    /// The pipeline runs on its own thread. When the deadline passes the caller
    /// gets a failure envelope and the thread is left to finish on its own.
    pub fn predict_source_with_deadline(
        self: &Arc<Self>,
        name: &str,
        mode: &ModelMode,
        horizon: Horizon,
        deadline: Duration,
    ) -> ForecastEnvelope {
        let (tx, rx) = mpsc::channel();
        let orchestrator = Arc::clone(self);
        let owned_name = name.to_string();
        let mode = *mode;
        let spawned = thread::Builder::new()
            .name(format!("forecast-{}", name))
            .spawn(move || {
                let envelope = orchestrator.predict_source(&owned_name, &mode, horizon);
                // The receiver is gone once the deadline has passed.
                let _ = tx.send(envelope);
            });
        if let Err(e) = spawned {
            error!(source = name, error = %e, "failed to spawn forecast thread");
            return ForecastEnvelope::failure_message(format!(
                "could not start forecast for {}: {}",
                name, e
            ));
        }

        match rx.recv_timeout(deadline) {
            Ok(envelope) => envelope,
            Err(mpsc::RecvTimeoutError::Timeout) => {
                warn!(
                    source = name,
                    deadline_ms = deadline.as_millis() as u64,
                    "forecast abandoned after deadline"
                );
                ForecastEnvelope::failure_message(format!(
                    "forecast for {} did not finish within {} ms",
                    name,
                    deadline.as_millis()
                ))
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                error!(source = name, "forecast thread exited without a result");
                ForecastEnvelope::failure_message(format!("forecast for {} aborted", name))
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

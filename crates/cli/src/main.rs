//! # bloomcast
//!
//! Command-line interface for forecasting per-source metric series and
//! managing persisted models.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use forecast_facade::{
    ForecastConfig, Horizon, JsonFileSource, ModelFamily, ModelMode, Orchestrator,
};
use serde::Serialize;
use store_facade::{
    FsModelStore, ModelRepository, StoreConfig, DEFAULT_MAX_AGE_DAYS, DEFAULT_MODELS_DIR,
};
use tracing::{debug, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(name = "bloomcast")]
#[command(about = "Forecast vegetation and climate metrics per data source", long_about = None)]
struct Cli {
    /// Directory of source payloads, one `<source>.json` per source
    #[arg(long, global = true, env = "BLOOMCAST_SOURCES_DIR", default_value = "data/sources")]
    sources_dir: PathBuf,

    /// Directory holding persisted models
    #[arg(long, global = true, env = "BLOOMCAST_MODELS_DIR", default_value = DEFAULT_MODELS_DIR)]
    models_dir: PathBuf,

    /// JSON file with a forecasting configuration (family settings, placeholder start)
    #[arg(long, global = true, env = "BLOOMCAST_CONFIG")]
    config: Option<PathBuf>,

    /// Metric to forecast (default: first metric found in each payload)
    #[arg(long, global = true)]
    metric: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Forecast one source
    Predict {
        /// Source name (file stem inside the sources directory)
        source: String,

        /// Model family (auto, arima, seasonal, lstm)
        #[arg(short, long, default_value = "auto")]
        model: String,

        /// Number of daily steps to forecast (1-30)
        #[arg(short = 'n', long, default_value = "5")]
        horizon: usize,

        /// Abandon the forecast after this many seconds
        #[arg(long)]
        deadline_secs: Option<u64>,

        /// Output file (optional)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Forecast every source in the sources directory
    PredictAll {
        /// Model family (auto, arima, seasonal, lstm)
        #[arg(short, long, default_value = "auto")]
        model: String,

        /// Number of daily steps to forecast (1-30)
        #[arg(short = 'n', long, default_value = "5")]
        horizon: usize,

        /// Output file (optional)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Train a model for one source and persist it
    Train {
        /// Source name (file stem inside the sources directory)
        source: String,

        /// Model family (auto, arima, seasonal, lstm)
        #[arg(short, long, default_value = "auto")]
        model: String,
    },

    /// Inspect or prune persisted models
    Models {
        #[command(subcommand)]
        command: ModelsCommand,
    },
}

#[derive(Subcommand)]
enum ModelsCommand {
    /// List persisted models grouped by source and family
    List,

    /// Totals over the persisted models
    Stats,

    /// Delete one persisted model
    Delete {
        source: String,
        /// Model family (arima, seasonal, lstm)
        family: String,
    },

    /// Delete models older than the given age
    Cleanup {
        #[arg(long, default_value_t = DEFAULT_MAX_AGE_DAYS)]
        max_age_days: i64,
    },
}

/// Load the forecasting configuration, if one was given
fn load_config(path: Option<&Path>) -> Result<ForecastConfig> {
    let Some(path) = path else {
        return Ok(ForecastConfig::default());
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("invalid config {}", path.display()))
}

/// One JSON source per `*.json` file, in file-name order
fn discover_sources(dir: &Path, metric: Option<&str>) -> Result<Vec<JsonFileSource>> {
    let mut paths: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("failed to read sources directory {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    paths.sort();

    let sources: Vec<JsonFileSource> = paths
        .into_iter()
        .filter_map(JsonFileSource::from_path)
        .map(|source| match metric {
            Some(metric) => source.with_metric(metric),
            None => source,
        })
        .collect();
    debug!(dir = %dir.display(), count = sources.len(), "discovered sources");
    Ok(sources)
}

fn build_orchestrator(cli: &Cli, store: Option<Arc<FsModelStore>>) -> Result<Orchestrator> {
    let mut orchestrator = Orchestrator::new(load_config(cli.config.as_deref())?);
    if let Some(store) = store {
        orchestrator = orchestrator.with_repository(store);
    }
    for source in discover_sources(&cli.sources_dir, cli.metric.as_deref())? {
        orchestrator.register(Arc::new(source))?;
    }
    Ok(orchestrator)
}

fn open_store(cli: &Cli) -> Result<FsModelStore> {
    FsModelStore::open(&StoreConfig::new(&cli.models_dir))
        .with_context(|| format!("failed to open model store at {}", cli.models_dir.display()))
}

/// Write a JSON document to file or stdout
fn write_json<T: Serialize>(value: &T, output: Option<&PathBuf>) -> Result<()> {
    if let Some(path) = output {
        let mut file =
            File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
        serde_json::to_writer_pretty(&mut file, value)?;
        info!(path = %path.display(), "results written");
    } else {
        println!("{}", serde_json::to_string_pretty(value)?);
    }
    Ok(())
}

fn run_predict(
    cli: &Cli,
    source: &str,
    model: &str,
    horizon: usize,
    deadline_secs: Option<u64>,
    output: Option<&PathBuf>,
) -> Result<()> {
    let mode = ModelMode::parse(model)?;
    let horizon = Horizon::new(horizon)?;
    let orchestrator = Arc::new(build_orchestrator(cli, None)?);

    let envelope = match deadline_secs {
        Some(secs) => orchestrator.predict_source_with_deadline(
            source,
            &mode,
            horizon,
            Duration::from_secs(secs),
        ),
        None => orchestrator.predict_source(source, &mode, horizon),
    };
    write_json(&envelope, output)?;

    if !envelope.success {
        bail!(
            "forecast for {} failed: {}",
            source,
            envelope.error.as_deref().unwrap_or("unknown error")
        );
    }
    Ok(())
}

fn run_predict_all(cli: &Cli, model: &str, horizon: usize, output: Option<&PathBuf>) -> Result<()> {
    let mode = ModelMode::parse(model)?;
    let horizon = Horizon::new(horizon)?;
    let orchestrator = build_orchestrator(cli, None)?;
    if orchestrator.sources().is_empty() {
        bail!("no source payloads found in {}", cli.sources_dir.display());
    }

    let envelope = orchestrator.predict_all(&mode, horizon);
    write_json(&envelope, output)?;

    if !envelope.success {
        bail!("every source failed to forecast");
    }
    Ok(())
}

fn run_train(cli: &Cli, source: &str, model: &str) -> Result<()> {
    let mode = ModelMode::parse(model)?;
    let store = Arc::new(open_store(cli)?);
    let orchestrator = build_orchestrator(cli, Some(store))?;

    let envelope = orchestrator.train_source(source, &mode);
    write_json(&envelope, None)?;

    if !envelope.success {
        bail!("{}", envelope.message);
    }
    Ok(())
}

fn run_models(cli: &Cli, command: &ModelsCommand) -> Result<()> {
    let store = open_store(cli)?;
    match command {
        ModelsCommand::List => write_json(&store.list(), None),
        ModelsCommand::Stats => write_json(&store.stats(), None),
        ModelsCommand::Delete { source, family } => {
            let family: ModelFamily = family.parse()?;
            let deleted = store.delete(source, family)?;
            write_json(
                &serde_json::json!({
                    "success": deleted,
                    "message": if deleted {
                        format!("Model {} for {} deleted", family, source)
                    } else {
                        format!("No {} model stored for {}", family, source)
                    },
                }),
                None,
            )
        }
        ModelsCommand::Cleanup { max_age_days } => {
            let removed = store.cleanup(*max_age_days);
            write_json(
                &serde_json::json!({
                    "success": true,
                    "removed": removed,
                    "max_age_days": max_age_days,
                }),
                None,
            )
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Predict {
            source,
            model,
            horizon,
            deadline_secs,
            output,
        } => run_predict(cli, source, model, *horizon, *deadline_secs, output.as_ref()),

        Commands::PredictAll {
            model,
            horizon,
            output,
        } => run_predict_all(cli, model, *horizon, output.as_ref()),

        Commands::Train { source, model } => run_train(cli, source, model),

        Commands::Models { command } => run_models(cli, command),
    }
}

fn main() {
    // Load .env file (optional - won't fail if missing)
    dotenvy::dotenv().ok();

    // Logs go to stderr so stdout stays valid JSON
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bloomcast=info,forecast_core=info,store_core=info".into()),
        )
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(&cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

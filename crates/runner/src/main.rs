mod metrics;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pipelines_core::config::LogFormat;
use pipelines_core::{
    load_config, validate_config, CycleContext, CycleDriver, CycleReport, ExecutionPlatform,
    LoggingRelay, MetadataStore, OrchestratorError, PipelineConfig, RemoteStorage, SanitizedConfig,
    SqliteMetadataStore, TapisClient, TapisFiles, TapisJobs,
};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    // Logging is configured from the file, so load failures go to stderr.
    let (config_path, config) = match load() {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Fatal error: {:#}", e);
            std::process::exit(1);
        }
    };

    init_logging(config.logging.format);
    info!(version = VERSION, "Loaded configuration from {:?}", config_path);

    if let Err(e) = run(config).await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

fn load() -> Result<(PathBuf, PipelineConfig)> {
    let config_path = std::env::var("PIPELINE_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("pipeline.toml"));

    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;
    Ok((config_path, config))
}

async fn run(config: PipelineConfig) -> Result<()> {
    validate_config(&config).context("Configuration validation failed")?;

    // Fingerprint the redacted config so runs can be correlated with deployments
    let sanitized = SanitizedConfig::from(&config);
    let config_json = serde_json::to_string(&sanitized).unwrap_or_default();
    let config_hash = format!("{:x}", Sha256::digest(config_json.as_bytes()));
    info!(
        pipeline = %config.pipeline_name,
        outbox_kind = config.remote_outbox.kind(),
        outbox = %config.remote_outbox.file_url(config.remote_outbox.path()),
        job_kind = config.job.kind(),
        app_id = config.job.app_id(),
        config_hash = &config_hash[..16],
        "Configuration validated"
    );
    info!("Database path: {:?}", config.database.path);

    let store: Arc<dyn MetadataStore> = Arc::new(
        SqliteMetadataStore::new(&config.database.path)
            .context("Failed to open metadata store")?,
    );

    let client = TapisClient::new(&config.tapis).context("Failed to create Tapis client")?;
    info!("Using Tapis tenant at {}", config.tapis.base_url);
    let storage: Arc<dyn RemoteStorage> = Arc::new(TapisFiles::new(client.clone()));
    let execution: Arc<dyn ExecutionPlatform> = Arc::new(TapisJobs::new(client));

    let ctx = CycleContext::new(
        config.identity(),
        config.cycle.clone(),
        store,
        storage,
        execution,
    );
    let driver = CycleDriver::new(ctx, Arc::new(LoggingRelay));
    let textfile = config.metrics.textfile_path.clone();

    match config.cycle.interval() {
        None => {
            let result = driver.run_cycle().await;
            export_metrics(textfile.as_deref(), &result);
            result.context("Cycle aborted")?;
        }
        Some(interval) => {
            driver
                .run_loop(interval, shutdown_signal(), |result| {
                    export_metrics(textfile.as_deref(), result)
                })
                .await;
        }
    }

    info!("Shutdown complete");
    Ok(())
}

fn init_logging(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());

    match format {
        LogFormat::Text => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }
}

fn export_metrics(path: Option<&Path>, result: &Result<CycleReport, OrchestratorError>) {
    metrics::observe_cycle(result);

    if let Some(path) = path {
        if let Err(e) = metrics::write_textfile(path) {
            warn!("Failed to write metrics textfile: {:#}", e);
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}

//! Body-fat estimator service
//!
//! Resolves the artifact bundle once at startup (cache or training), picks a
//! chat provider, then serves the HTTP API until interrupted.

use anyhow::{Context, Result};
use bodyfat_server::{api, config::ServerConfig};
use estimator_lib::{
    artifacts::{ArtifactCache, ArtifactStore, FsArtifactStore},
    chat::ChatAdapter,
    health::{components, HealthRegistry},
    observability::{ServiceMetrics, StructuredLogger},
    predictor::{BodyFatPredictor, ModelTrainer, TrainerConfig},
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting bodyfat-server");

    let config = ServerConfig::load()?;
    info!(
        instance = %config.instance_name,
        dataset = %config.dataset_path.display(),
        artifact_dir = %config.artifact_dir.display(),
        "Service configured"
    );

    let health_registry = HealthRegistry::new();
    health_registry.register(components::ARTIFACTS).await;
    health_registry.register(components::PREDICTOR).await;
    health_registry.register(components::CHAT).await;

    let metrics = ServiceMetrics::new();
    let logger = StructuredLogger::new(&config.instance_name);

    // Artifact bundle: exactly one per process, resolved before serving
    let store = Arc::new(FsArtifactStore::new(&config.artifact_dir));
    let location = store.describe();
    let cache = Arc::new(ArtifactCache::new(
        store,
        &config.dataset_path,
        ModelTrainer::new(TrainerConfig::default()),
    ));

    let loader = Arc::clone(&cache);
    let loaded = tokio::task::spawn_blocking(move || loader.load_or_train())
        .await
        .context("Artifact loading task panicked")?;
    let loaded = match loaded {
        Ok(loaded) => loaded,
        Err(e) => {
            health_registry
                .set_unhealthy(components::ARTIFACTS, e.to_string())
                .await;
            return Err(e).context("No usable artifacts and training failed");
        }
    };
    api::record_loaded_bundle(&loaded, &location, &logger, &metrics);
    let fingerprint = loaded.bundle.short_fingerprint().to_string();

    let predictor = Arc::new(BodyFatPredictor::with_output_config(
        loaded.bundle,
        config.output_config(),
    ));

    let chat = ChatAdapter::from_config(&config.chat_config(), logger.clone());
    if !chat.is_available() {
        let reasons = chat.diagnostics().join("; ");
        warn!(reasons = %reasons, "Chat disabled, replies will report the service as unavailable");
        health_registry.set_degraded(components::CHAT, reasons).await;
    }

    let app_state = Arc::new(api::AppState::new(
        predictor,
        chat,
        cache,
        health_registry.clone(),
        metrics,
        logger.clone(),
    ));

    health_registry.set_ready(true).await;

    let bind = config.bind_addr();
    logger.log_startup(SERVICE_VERSION, &fingerprint, &bind);

    let shutdown_logger = logger.clone();
    api::serve(&bind, app_state, async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
        shutdown_logger.log_shutdown("SIGINT received");
    })
    .await?;

    info!("Shutting down");
    Ok(())
}

//! Confera Signaling Daemon
//!
//! Hosts the real-time consultation core as a single process:
//! - Call session state machine over the shared document store
//! - Free-trial countdown and chat gating services
//! - Background authorities: missed-call timeout, trial sweep, retention

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::info;

use docstore::{DocumentStore, MemoryStore, StoreBackend, StoreConfig};
use media::{MediaTransport, MockMediaEngine};
use signaling::CallSignaling;
use telemetry::{health, init_tracing_from_env};
use trial::{FreeTrialService, TrialConfig};
use worker::{WorkerConfig, WorkerScheduler};

/// Application configuration.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
struct Config {
    #[serde(default)]
    store: StoreConfig,

    #[serde(default)]
    trial: TrialConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    init_tracing_from_env();

    info!("Starting Confera signaling daemon v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = load_config()?;

    // Initialize the document store backend
    let store: Arc<dyn DocumentStore> = match config.store.backend {
        StoreBackend::Memory => Arc::new(MemoryStore::with_config(&config.store)),
    };

    // The mock media engine stands in for the real transport SDK; call
    // screens drive it through the same capability trait.
    let media_engine = Arc::new(MockMediaEngine::new());

    // Check health and update status
    check_health(store.as_ref(), media_engine.as_ref()).await;

    // Construct the services consumers are handed references to
    let call_signaling = Arc::new(CallSignaling::new(store.clone()));
    let trial_service = Arc::new(FreeTrialService::new(store.clone(), config.trial.clone()));

    // Start background authority workers
    let scheduler = Arc::new(WorkerScheduler::new(
        WorkerConfig::default(),
        store.clone(),
        call_signaling.clone(),
    ));
    let worker_handles = scheduler.start();

    info!("Signaling core ready");

    // Run until asked to stop
    shutdown_signal().await;

    info!("Shutting down...");

    for handle in worker_handles {
        handle.abort();
    }
    trial_service.shutdown();

    info!("Shutdown complete");
    Ok(())
}

/// Load configuration from files and environment.
fn load_config() -> Result<Config> {
    let config = config::Config::builder()
        // Start with defaults
        .add_source(config::Config::try_from(&Config::default())?)
        // Load from config file if exists
        .add_source(
            config::File::with_name("config/default")
                .required(false)
                .format(config::FileFormat::Toml),
        )
        // Override with environment variables
        .add_source(
            config::Environment::default()
                .separator("__")
                .prefix("CONFERA")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build configuration")?;

    config
        .try_deserialize()
        .context("Failed to deserialize configuration")
}

/// Check component health on startup.
async fn check_health(store: &dyn DocumentStore, media_engine: &MockMediaEngine) {
    if docstore::health::check_connection(store).await {
        health().store.set_healthy();
        info!("Document store: healthy");
    } else {
        health().store.set_unhealthy("Probe roundtrip failed");
        tracing::error!("Document store: unhealthy");
    }

    match media_engine.initialize().await {
        Ok(()) => {
            health().media.set_healthy();
            info!("Media engine: healthy (mock transport)");
        }
        Err(e) => {
            health().media.set_unhealthy(e.to_string());
            tracing::error!("Media engine: unhealthy: {}", e);
        }
    }
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            info!("Received terminate signal");
        }
    }
}

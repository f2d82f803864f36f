use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use albumwatch_core::{
    load_config, validate_config, AcquisitionClient, Config, DownloadOrchestrator, JobStore,
    LidarrClient, SqliteJobStore, SqliteSyncQueue, SyncQueue,
};
use albumwatch_server::{api::create_router, state::AppState};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("albumwatch {} starting", VERSION);

    // Determine config path
    let config_path = std::env::var("ALBUMWATCH_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("Database path: {:?}", config.database.path);

    let orchestrator = build_orchestrator(&config)?;
    if let Some(ref orch) = orchestrator {
        orch.on_unavailable_album(|album| {
            warn!(
                album_ref = %album.album_ref,
                user_id = ?album.user_id,
                "Album unavailable: '{}' by {} ({})",
                album.album_title, album.artist_name, album.reason
            );
            Ok(())
        })
        .await;
        orch.start().await;
        info!("Download orchestrator started");
    }

    // Create app state
    let state = Arc::new(AppState::new(config.clone(), orchestrator.clone()));

    // Create router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // Stop orchestrator if running
    if let Some(ref orch) = orchestrator {
        info!("Stopping orchestrator...");
        orch.shutdown().await;
        info!("Orchestrator stopped");
    }

    info!("Server shut down");
    Ok(())
}

/// Wire the orchestrator to its collaborators, if enabled.
fn build_orchestrator(config: &Config) -> Result<Option<DownloadOrchestrator>> {
    if !config.orchestrator.enabled {
        info!("Orchestrator disabled in config");
        return Ok(None);
    }

    // validate_config guarantees this when the orchestrator is enabled
    let acquisition_config = config
        .acquisition
        .clone()
        .context("Orchestrator enabled without an [acquisition] section")?;

    info!("Initializing acquisition client at {}", acquisition_config.url);
    let acquisition: Arc<dyn AcquisitionClient> = Arc::new(
        LidarrClient::new(acquisition_config).context("Failed to create acquisition client")?,
    );

    let jobs: Arc<dyn JobStore> = Arc::new(
        SqliteJobStore::new(&config.database.path).context("Failed to create job store")?,
    );
    info!("Job store initialized");

    let sync_queue: Arc<dyn SyncQueue> = Arc::new(
        SqliteSyncQueue::new(&config.database.path).context("Failed to create sync queue")?,
    );
    info!("Sync queue initialized");

    Ok(Some(DownloadOrchestrator::new(
        config.orchestrator.clone(),
        acquisition,
        jobs,
        sync_queue,
    )))
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
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
}

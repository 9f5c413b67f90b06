use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use custodian_core::{
    create_event_system, load_config, validate_config, EventStore, LifecycleEvent,
    LifecycleStores, SqliteEventStore,
};
use custodian_server::api::create_router;
use custodian_server::state::{build_lifecycle, AppState};

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

    // Determine config path
    let config_path = std::env::var("CUSTODIAN_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("Access method: {:?}", config.access.method);
    info!("Database path: {:?}", config.database.path);

    // Compute config hash for the event log
    let config_json = serde_json::to_string(&config).unwrap_or_default();
    let config_hash = format!("{:x}", Sha256::digest(config_json.as_bytes()));
    let config_hash_short = &config_hash[..16];

    // Record stores share one database file
    let stores = LifecycleStores::sqlite(&config.database.path)
        .context("Failed to open lifecycle stores")?;
    info!("Lifecycle stores initialized");

    let event_store: Arc<dyn EventStore> = Arc::new(
        SqliteEventStore::new(&config.database.path).context("Failed to create event store")?,
    );
    info!("Event store initialized");

    // Create event system
    let (event_handle, event_writer) =
        create_event_system(Arc::clone(&event_store), config.notifications.buffer_size);

    // Spawn event writer task
    let writer_handle = tokio::spawn(event_writer.run());

    event_handle
        .emit(LifecycleEvent::ServiceStarted {
            version: VERSION.to_string(),
            config_hash: config_hash_short.to_string(),
        })
        .await;
    info!("Emitted ServiceStarted event");

    let lifecycle = build_lifecycle(&config, stores, event_handle.clone())
        .context("Failed to create access control")?;

    if config.workflow.reconcile_on_startup {
        // Blocking store access; keep it off the runtime threads.
        let reconciler = lifecycle.clone();
        let report = tokio::task::spawn_blocking(move || reconciler.reconciler().run())
            .await
            .context("Reconciliation task panicked")?;
        match report {
            Ok(report) => info!(
                assets_checked = report.assets_checked,
                assets_changed = report.assets_changed,
                tickets_repaired = report.tickets_repaired,
                "Startup reconciliation finished"
            ),
            Err(e) => warn!("Startup reconciliation failed: {}", e),
        }
    } else {
        info!("Startup reconciliation disabled in config");
    }

    // Create app state
    let state = Arc::new(AppState::new(config.clone(), lifecycle, event_store));

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

    // Emit ServiceStopped event
    info!("Server shutting down...");
    event_handle
        .emit(LifecycleEvent::ServiceStopped {
            reason: "graceful_shutdown".to_string(),
        })
        .await;

    // The router (and the lifecycle inside it) was dropped when serve returned;
    // dropping the last handle closes the writer's channel.
    drop(event_handle);

    // Wait for writer to finish processing remaining events
    let _ = writer_handle.await;
    info!("Event writer stopped");

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

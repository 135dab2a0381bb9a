//! Page Resolver - public page resolution with scheduled expiration
//!
//! Standalone server backed by the in-memory store and cache.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use page_resolver::api::create_router;
use page_resolver::clock::{Clock, SystemClock};
use page_resolver::kv::MemoryKv;
use page_resolver::store::MemoryStore;
use page_resolver::{spawn_kv_purge_task, spawn_sweep_task, AppState, Config};

/// Main entry point for the page resolver server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Build store, cache and clock, seeding the store if configured
/// 4. Start the expiration sweep and cache purge tasks
/// 5. Serve HTTP until SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "page_resolver=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Page Resolver");

    let config = Config::from_env();
    info!(
        "Configuration loaded: port={}, cache_max_entries={}, sweep_interval={}s, purge_interval={}s",
        config.server_port, config.cache_max_entries, config.sweep_interval, config.purge_interval
    );

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let store = match &config.seed_path {
        Some(path) => {
            let store = MemoryStore::load_fixture_file(path).await?;
            info!("Store seeded from {}", path.display());
            store
        }
        None => MemoryStore::new(),
    };
    let kv = MemoryKv::new(config.cache_max_entries, clock.clone());

    let state = AppState::new(Arc::new(store), Arc::new(kv.clone()), clock);

    let tasks = vec![
        spawn_sweep_task(state.engine.clone(), config.sweep_interval),
        spawn_kv_purge_task(kv, config.purge_interval),
    ];
    info!("Background tasks started");

    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(tasks))
        .await
        .context("serving HTTP")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM), then aborts the background
/// tasks.
async fn shutdown_signal(tasks: Vec<JoinHandle<()>>) {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!("Failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }

    for task in tasks {
        task.abort();
    }
    warn!("Background tasks aborted");
}

//! Redis Cache Provider - HTTP gateway
//!
//! Serves the cache provider over a small REST API, backed by Redis or by
//! the in-memory store.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use redis_cache_provider::{
    api::{create_router, AppState},
    config::Backend,
    spawn_cleanup_task, ConnectionResolver, MemoryStore, StoreClient,
};

/// Main entry point for the cache gateway.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Resolve the store (Redis connection or in-memory store)
/// 4. Start background TTL cleanup task for the in-memory store
/// 5. Create Axum router with all endpoints
/// 6. Start HTTP server on configured port
/// 7. Handle graceful shutdown on SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "redis_cache_provider=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Redis Cache Provider gateway");

    let resolver = ConnectionResolver::global();
    let config = resolver.config();
    info!(
        "Configuration loaded: backend={:?}, lock_stripes={}, port={}, cleanup_interval={}s",
        config.backend, config.lock_stripes, config.server_port, config.cleanup_interval
    );

    let (store, cleanup_handle): (Arc<dyn StoreClient>, Option<JoinHandle<()>>) =
        match config.backend {
            Backend::Memory => {
                let store = Arc::new(MemoryStore::new());
                let handle = spawn_cleanup_task(store.clone(), config.cleanup_interval);
                info!("Background cleanup task started");
                (store as Arc<dyn StoreClient>, Some(handle))
            }
            Backend::Redis => match resolver.store().await {
                Ok(store) => (store as Arc<dyn StoreClient>, None),
                Err(e) => {
                    error!("Failed to resolve store: {}", e);
                    return Err(e.into());
                }
            },
        };
    info!("Store {} ready", store.name());

    let state = AppState::from_config(config, store);
    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cleanup_handle))
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
///
/// On shutdown signal, aborts the cleanup task and allows graceful shutdown.
async fn shutdown_signal(cleanup_handle: Option<JoinHandle<()>>) {
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
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }

    if let Some(handle) = cleanup_handle {
        handle.abort();
        warn!("Cleanup task aborted");
    }
}

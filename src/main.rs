//! Cache Relay - A read-through cache server
//!
//! Serves values through a local cache and broadcasts invalidations so every
//! instance drops stale copies after an update.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cache_relay::api::create_router;
use cache_relay::messaging::{InMemoryBroker, Subscriber};
use cache_relay::source::SampleSource;
use cache_relay::{spawn_cleanup_task, spawn_invalidation_listener, AppState, Config};

/// Main entry point for the cache server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Wire store, primary source and broker into the service
/// 4. Subscribe to the invalidation topic and start the listener
/// 5. Start the TTL cleanup task when a TTL is configured
/// 6. Serve HTTP until SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cache_relay=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Cache Relay server");

    let config = Config::from_env();
    info!(
        "Configuration loaded: instance={}, cache={}, topic={}, max_entries={}, entry_ttl={}s, port={}",
        config.instance_id,
        config.cache_name,
        config.invalidation_topic,
        config.max_entries,
        config.entry_ttl,
        config.server_port
    );

    let broker = Arc::new(InMemoryBroker::new(config.channel_capacity));
    let state = AppState::from_config(&config, Arc::new(SampleSource::new()), broker.clone());

    let subscription = broker
        .subscribe(&config.invalidation_topic)
        .await
        .context("failed to subscribe to the invalidation topic")?;
    let mut background = vec![spawn_invalidation_listener(state.service.clone(), subscription)];

    if config.ttl().is_some() {
        background.push(spawn_cleanup_task(state.store.clone(), config.cleanup_interval));
    }

    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(background))
        .await
        .context("server error")?;

    broker.close().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM), then stops background tasks.
async fn shutdown_signal(background: Vec<JoinHandle<()>>) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
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
                warn!("Failed to install SIGTERM handler: {}", e);
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

    for handle in background {
        handle.abort();
    }
    warn!("Background tasks aborted");
}

//! Position Sync Server - authoritative multiplayer position server
//!
//! This is the main entry point for the server. It handles:
//! - WebSocket connections for real-time position sync
//! - The fixed-rate snapshot broadcast loop
//! - A health endpoint for monitoring

use std::net::SocketAddr;

use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use position_sync_server::game::run_broadcast_loop;
use position_sync_server::util::time::init_server_time;
use position_sync_server::{build_router, AppState, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize tracing
    init_tracing(&config.log_level);

    // Initialize server time tracking
    init_server_time();

    info!("Starting Position Sync Server");
    info!(
        tick_ms = config.tick_interval.as_millis() as u64,
        step_speed = config.step_speed,
        spawn_width = config.spawn_area.width,
        spawn_height = config.spawn_area.height,
        "Simulation settings"
    );

    // Create application state
    let state = AppState::new(config.clone());

    // Spawn broadcast loop
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let broadcast_task = tokio::spawn(run_broadcast_loop(
        state.engine.clone(),
        config.tick_interval,
        shutdown_rx,
    ));

    // Build router
    let router = build_router(state);

    // Start server
    let addr: SocketAddr = config.server_addr;
    let listener = TcpListener::bind(addr).await?;

    info!("Server listening on {}", addr);
    info!("Health check: http://{}/health", addr);
    info!("WebSocket endpoint: ws://{}/ws", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = shutdown_tx.send(true);
    broadcast_task.await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Initialize tracing; RUST_LOG wins over the configured level
fn init_tracing(log_level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

/// Resolves on Ctrl+C or SIGTERM. A handler that fails to install is logged
/// and never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Ctrl+C handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}

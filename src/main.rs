//! Room Relay Server
//!
//! Websocket entry point. Configured from the environment, runs until Ctrl-C.

use std::sync::Arc;
use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use room_relay::{RelayServer, ServerConfig, VERSION};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    let config = ServerConfig::from_env().context("Invalid relay configuration")?;

    info!("Room Relay Server v{}", VERSION);
    info!("Max connections: {}", config.max_connections);
    match config.room_capacity {
        Some(capacity) => info!("Room capacity: {}", capacity),
        None => info!("Room capacity: unlimited"),
    }

    let server = Arc::new(RelayServer::new(config.clone()));

    let signal_server = server.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => signal_server.shutdown(),
            Err(e) => warn!("Failed to listen for Ctrl-C: {}", e),
        }
    });

    server
        .run()
        .await
        .with_context(|| format!("Relay server failed on {}", config.bind_addr))?;

    info!("Relay server stopped");
    Ok(())
}

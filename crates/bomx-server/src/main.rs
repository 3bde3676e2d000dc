//! BOMX Server - Main entry point

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use bomx_common::logging::{init_logging, LogConfig};
use tokio::signal;
use tracing::info;

use bomx_server::{
    config::Config,
    db::SqlSourceConnector,
    router,
    storage::Storage,
    AppState,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Environment variables take precedence over the built-in defaults
    let log_config = LogConfig::from_env()?
        .with_file_prefix("bomx-server")
        .with_filter_directives("bomx_server=debug,tower_http=debug,sqlx=info");
    init_logging(&log_config)?;

    info!("Starting BOMX server");

    let config = Config::load()?;
    info!(
        "Configuration loaded - server will bind to {}:{}",
        config.server.host, config.server.port
    );

    let storage = Storage::new(config.storage.clone()).await?;
    info!("Storage client initialized");

    let state = AppState {
        store: Arc::new(storage),
        source: Arc::new(SqlSourceConnector::new(config.source.clone())),
    };

    let app = router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        tracing::error!("Failed to install shutdown signal handler: {}", e);
        return;
    }
    info!("Shutdown signal received");
}

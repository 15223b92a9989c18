// src/main.rs
use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};

use tmdb_proxy::{
    config,
    metrics::{start_metrics_server, MetricsRegistry},
    proxy::{HttpUpstream, Proxy},
    server::{RequestHandler, ServerBuilder},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Before tracing, so RUST_LOG may come from .env too.
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Warning: failed to load .env file: {}", e);
        }
    }

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("tmdb_proxy=debug".parse()?)
                .add_directive("hyper=info".parse()?),
        )
        .init();

    // Load configuration
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    match &config_path {
        Some(path) => info!("Loading configuration from: {}", path.display()),
        None => info!("Loading configuration from environment"),
    }
    let config = config::load_config(config_path.as_deref())?;
    info!(upstream = ?config.upstream, "Configuration loaded");

    // Initialize metrics
    let metrics_registry = Arc::new(MetricsRegistry::new()?);

    // Create proxy
    let proxy = Arc::new(
        Proxy::new(&config.upstream, Arc::new(HttpUpstream::new()))
            .with_metrics(metrics_registry.collector()),
    );

    let addr = config.server.socket_addr().await?;

    // Start metrics server if enabled, on the same interface as the proxy
    if config.metrics.enabled {
        start_metrics_server(
            config.metrics.socket_addr(addr),
            metrics_registry,
            config.metrics.path.clone(),
        )?;
    }

    // Create request handler
    let handler = RequestHandler::new(proxy);

    // Start main server
    info!("Starting movie proxy on {}", addr);

    ServerBuilder::new(addr)
        .with_handler(handler)
        .with_shutdown(shutdown_signal())
        .serve()
        .await?;

    Ok(())
}

// Graceful shutdown handler
async fn shutdown_signal() {
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
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}

//! Steeple - church calendar API server
//!
//! Main entry point for the HTTP service.

use std::sync::Arc;

use anyhow::{Context, Result};
use steeple_api::utils::logging::init_tracing;
use steeple_api::{build_router, AppContext};
use steeple_infra::config;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{debug, error, info};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env before the config loader reads STEEPLE_* variables
    let dotenv = dotenvy::dotenv();

    let config = config::load().context("failed to load configuration")?;
    init_tracing(config.server.log_json);

    match dotenv {
        Ok(path) => info!(path = %path.display(), "Loaded .env"),
        Err(e) => debug!(error = %e, "No .env file loaded"),
    }

    let ctx = Arc::new(AppContext::new_with_config(config).context("failed to build context")?);
    let bind_addr = ctx.config.server.bind_addr.clone();
    let app = build_router(Arc::clone(&ctx));

    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    info!(addr = %bind_addr, "Steeple API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C, or SIGTERM on unix
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    info!("Shutdown signal received");
}

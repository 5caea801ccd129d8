//! docbatch HTTP server.

mod error;
mod handlers;
mod routes;
mod state;

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use docbatch::{init_logging, load_config, Config};
use tokio::net::TcpListener;
use tracing::info;

use state::AppState;

#[derive(Debug, Parser)]
#[command(name = "docbatch-server", version, about = "Batch document-processing API")]
struct Args {
    /// Path to the JSON configuration file.
    #[arg(long, env = "DOCBATCH_CONFIG")]
    config: Option<PathBuf>,
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
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

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::default(),
    };

    init_logging(&config.logging);
    info!("Starting docbatch-server v{}", env!("CARGO_PKG_VERSION"));

    let addr: SocketAddr = config
        .server
        .listen_addr
        .parse()
        .context("Invalid listen address")?;

    let state = AppState::from_config(&config)?;
    let app = routes::create_router(state, config.server.cors_enabled);

    let listener = TcpListener::bind(&addr)
        .await
        .context("Failed to bind HTTP server")?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("Server stopped");
    Ok(())
}

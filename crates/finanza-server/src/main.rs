use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use finanza::config::ResolvedConfig;
use finanza::storage::{JsonFileStorage, Storage};
use finanza::upload::Preprocessor;
use finanza_server::{router, AppState};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "finanza-server")]
#[command(about = "HTTP API server for the finanza upload pipeline")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "finanza.toml")]
    config: PathBuf,

    /// Address to listen on
    #[arg(short, long, default_value = "127.0.0.1:3000")]
    bind: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = ResolvedConfig::load_or_default(&cli.config)?;
    info!(data_dir = %config.data_dir.display(), "starting server");

    let storage: Arc<dyn Storage> = Arc::new(JsonFileStorage::new(&config.data_dir));
    let state = Arc::new(AppState {
        storage,
        preprocessor: Preprocessor::new(&config.upload_dir),
    });

    let listener = tokio::net::TcpListener::bind(&cli.bind)
        .await
        .with_context(|| format!("Failed to bind {}", cli.bind))?;
    info!(addr = %cli.bind, "listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to install Ctrl+C handler");
    }
}

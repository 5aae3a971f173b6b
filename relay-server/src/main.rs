//! wecom-relay binary - run the callback relay service.
//!
//! `run` loads and validates the JSON config, installs the signal
//! watcher, and serves until interrupted. Configuration failures abort
//! startup with a non-zero exit; a signal-triggered shutdown exits zero
//! once every listener has closed.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use wecom_relay::{serve, validate, RawConfig};

#[derive(Parser)]
#[command(name = "wecom-relay", about = "Encrypted WeCom callback receiver and relay")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the relay service
    Run {
        /// Config file
        #[arg(short, long, default_value = "config.json")]
        config: PathBuf,

        /// Debug logging
        #[arg(short, long)]
        debug: bool,
    },
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Version => {
            println!("wecom-relay {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Command::Run { config, debug } => run(config, debug).await,
    }
}

async fn run(config_path: PathBuf, debug: bool) -> Result<()> {
    // Initialize structured JSON logging
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true))
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "relay_starting");

    let raw = std::fs::read(&config_path)
        .with_context(|| format!("Failed to read {}", config_path.display()))?;
    let raw: RawConfig =
        serde_json::from_slice(&raw).context("Failed to parse config file")?;
    let registry = validate(raw).context("Invalid configuration")?;

    info!(
        mode = ?registry.mode,
        tenants = registry.tenants.len(),
        "config_loaded"
    );

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            shutdown_signal().await;
            shutdown.cancel();
        }
    });

    serve(registry, shutdown).await?;

    info!("relay_shutdown_complete");
    Ok(())
}

/// Create a future that completes when a shutdown signal is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => warn!("Received SIGINT"),
        _ = terminate => warn!("Received SIGTERM"),
    }

    warn!("relay_shutting_down");
}

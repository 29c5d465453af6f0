//! gbridge-bridge: entry point.
//!
//! Relays voice-assistant on/off commands from the gBridge MQTT broker to an
//! Adafruit IO feed as 433 MHz RF tristate codes.
//!
//! # Usage
//!
//! ```text
//! gbridge-bridge [OPTIONS] <CONFIG>
//!
//! Arguments:
//!   <CONFIG>  Path to config.toml [env: GBRIDGE_CONFIG]
//!
//! Options:
//!   --check   Validate the configuration and CA bundle, then exit
//! ```
//!
//! The container image runs `gbridge-bridge /srv/config/config.toml`.
//!
//! # Logging
//!
//! `RUST_LOG` (e.g. `RUST_LOG=info`) selects the log filter.  When it is unset
//! the `log_level` from the config file is used, and `info` when that is
//! missing too.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::EnvFilter;

use gbridge_bridge::infrastructure::mqtt::load_ca;
use gbridge_bridge::infrastructure::run_bridge;
use gbridge_core::{load_config, BridgeSettings};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// gBridge → Adafruit IO RF bridge.
#[derive(Debug, Parser)]
#[command(
    name = "gbridge-bridge",
    about = "Relays gBridge on/off commands to an Adafruit IO feed as RF tristate codes",
    version
)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(env = "GBRIDGE_CONFIG")]
    config: PathBuf,

    /// Validate the configuration and CA bundle, then exit without connecting.
    #[arg(long)]
    check: bool,
}

/// Log filter: `RUST_LOG` when set and valid, otherwise the configured level.
fn build_env_filter(fallback: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback))
}

/// Checks everything `run_bridge` needs before touching the network.
fn preflight(settings: &BridgeSettings) -> anyhow::Result<()> {
    settings.validate()?;
    if settings.needs_ca() {
        load_ca(&settings.tls.ca_file)?;
    }
    Ok(())
}

/// Resolves on Ctrl+C, or on SIGTERM where available (container stop).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl+C signal: {e}");
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
                tracing::error!("failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl+C; initiating graceful shutdown"),
        _ = terminate => info!("received SIGTERM; initiating graceful shutdown"),
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // The config supplies the fallback log level, so it is read before the
    // subscriber exists.  Load errors are reported by anyhow on exit.
    let settings = load_config(&cli.config)
        .with_context(|| format!("failed to load configuration from {}", cli.config.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(build_env_filter(&settings.log_level))
        .init();

    if cli.check {
        preflight(&settings)?;
        info!("configuration {} is valid", cli.config.display());
        return Ok(());
    }

    info!("gbridge-bridge {} starting", env!("CARGO_PKG_VERSION"));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    run_bridge(settings, shutdown_rx).await?;

    info!("gbridge-bridge stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

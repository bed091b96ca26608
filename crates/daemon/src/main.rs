// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Strata Daemon (stratad)
//!
//! Background process that reconciles layers and runs in the store.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod lifecycle;

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use strata_core::Config;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::watch;
use tracing::{error, info};

use crate::lifecycle::{LifecycleError, Paths};

#[derive(Parser)]
#[command(name = "stratad", version, about = "Strata reconciliation daemon")]
struct Args {
    /// Configuration file; missing means defaults
    #[arg(short, long, default_value = "strata.toml")]
    config: PathBuf,

    /// Also log to stderr
    #[arg(long)]
    foreground: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration
    let config = Config::load_or_default(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    let base = match args.config.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => std::env::current_dir()?,
    };
    let paths = Paths::resolve(&config, &base);

    // Write startup marker to log (before tracing setup, so operators can find it)
    write_startup_marker(&paths.log)?;

    // Set up logging
    let log_guard = setup_logging(&paths.log, args.foreground)?;

    info!(config = %args.config.display(), "Starting stratad");

    let daemon = match lifecycle::startup(&config, &paths).await {
        Ok(d) => d,
        Err(e) => {
            // Write error synchronously (tracing is non-blocking and may not flush in time)
            write_startup_error(&paths.log, &e);
            error!("Failed to start daemon: {}", e);
            drop(log_guard);
            return Err(e.into());
        }
    };

    // Set up signal handlers
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    tokio::spawn(async move {
        tokio::select! {
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
            _ = sigint.recv() => info!("Received SIGINT, shutting down..."),
        }
        let _ = shutdown_tx.send(true);
    });

    info!("Daemon ready");

    // Signal ready for parent process (e.g., systemd)
    println!("READY");

    daemon.run(shutdown_rx).await;

    info!("Daemon stopped");
    Ok(())
}

/// Startup marker prefix written to log before anything else.
/// Full format: "--- stratad: starting (pid: 12345) ---"
pub const STARTUP_MARKER_PREFIX: &str = "--- stratad: starting (pid: ";

/// Write startup marker to log file (appends to existing log)
fn write_startup_marker(log_path: &Path) -> Result<(), LifecycleError> {
    use std::io::Write;

    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)?;
    writeln!(file, "{}{}) ---", STARTUP_MARKER_PREFIX, std::process::id())?;

    Ok(())
}

/// Write startup error synchronously to log file.
fn write_startup_error(log_path: &Path, error: &LifecycleError) {
    use std::io::Write;

    let Ok(mut file) = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
    else {
        return;
    };
    let _ = writeln!(file, "ERROR Failed to start daemon: {}", error);
}

fn setup_logging(
    log_path: &Path,
    foreground: bool,
) -> anyhow::Result<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let dir = log_path.parent().context("log path has no directory")?;
    let file_name = log_path.file_name().context("log path has no file name")?;
    std::fs::create_dir_all(dir)?;

    let file_appender = tracing_appender::rolling::never(dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // Set up subscriber with env filter
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_ansi(false).with_writer(non_blocking))
        .with(foreground.then(|| fmt::layer().with_writer(std::io::stderr)))
        .init();

    Ok(guard)
}

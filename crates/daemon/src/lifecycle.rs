// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: startup, recovery, shutdown.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use strata_adapters::{
    CounterMetrics, FsArtifactStore, LaunchError, ProcessLauncher, ProcessLauncherConfig,
    TracedArtifactStore, TracedLauncher,
};
use strata_core::{Config, Run, SystemClock, UuidIdGen};
use strata_engine::{
    Controller, ControllerConfig, EngineConfig, EngineDeps, Reconciler,
};
use strata_storage::{FsStore, ResourceStore, StoreError};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{info, warn};

/// Reconciler with the concrete adapters the daemon runs with
pub type DaemonReconciler = Reconciler<
    FsStore,
    TracedLauncher<ProcessLauncher>,
    TracedArtifactStore<FsArtifactStore>,
    CounterMetrics,
    SystemClock,
    UuidIdGen,
>;

type DaemonController = Controller<
    FsStore,
    TracedLauncher<ProcessLauncher>,
    TracedArtifactStore<FsArtifactStore>,
    CounterMetrics,
    SystemClock,
    UuidIdGen,
>;

/// Filesystem locations, with relative config paths resolved against the
/// directory of the config file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    pub store: PathBuf,
    pub artifacts: PathBuf,
    pub log: PathBuf,
    /// Holds the pid file and the launcher's pod records
    pub state_dir: PathBuf,
    pub pid: PathBuf,
}

impl Paths {
    pub fn resolve(config: &Config, base: &Path) -> Self {
        let log = base.join(&config.log.path);
        let state_dir = log
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| base.to_path_buf());
        Self {
            store: base.join(&config.store.path),
            artifacts: base.join(&config.artifacts.path),
            pid: state_dir.join("stratad.pid"),
            state_dir,
            log,
        }
    }
}

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Launcher error: {0}")]
    Launch(#[from] LaunchError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A started daemon, ready to run its controller
pub struct Daemon {
    pub paths: Paths,
    // NOTE(lifetime): Held to maintain exclusive file lock; released on drop
    lock_file: File,
    controller: DaemonController,
    metrics: CounterMetrics,
}

impl Daemon {
    /// Run the controller until `shutdown` fires, then clean up
    pub async fn run(self, shutdown: watch::Receiver<bool>) {
        let Daemon {
            paths,
            lock_file,
            controller,
            metrics,
        } = self;

        controller.run(shutdown).await;

        for (event, count) in metrics.snapshot() {
            info!(%event, count, "event total");
        }
        remove_pid_file(&paths);
        drop(lock_file);
        info!("Daemon shutdown complete");
    }
}

/// Start the daemon
pub async fn startup(config: &Config, paths: &Paths) -> Result<Daemon, LifecycleError> {
    match startup_inner(config, paths).await {
        Ok(daemon) => Ok(daemon),
        Err(e) => {
            // The pid file belongs to the running daemon when locking failed
            if !matches!(e, LifecycleError::LockFailed(_)) {
                remove_pid_file(paths);
            }
            Err(e)
        }
    }
}

async fn startup_inner(config: &Config, paths: &Paths) -> Result<Daemon, LifecycleError> {
    // 1. Acquire the pid lock FIRST - prevents two daemons on one store
    std::fs::create_dir_all(&paths.state_dir)?;
    let mut lock_file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&paths.pid)?;
    lock_file
        .try_lock_exclusive()
        .map_err(LifecycleError::LockFailed)?;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;

    // 2. Open storage
    let store = FsStore::open(&paths.store)?;
    std::fs::create_dir_all(&paths.artifacts)?;
    let artifacts = TracedArtifactStore::new(FsArtifactStore::new(&paths.artifacts));

    // 3. Report what a previous daemon left running
    recover(&store).await?;

    // 4. Set up the launcher (wrapped with tracing for observability)
    let launcher = TracedLauncher::new(ProcessLauncher::new(ProcessLauncherConfig {
        command: config.runner.command.clone(),
        args: config.runner.args.clone(),
        env: config.runner.env.clone(),
        state_dir: paths.state_dir.clone(),
    })?);
    let metrics = CounterMetrics::new();

    let reconciler: DaemonReconciler = Reconciler::new(
        EngineDeps {
            store,
            launcher,
            artifacts,
            metrics: metrics.clone(),
        },
        SystemClock,
        UuidIdGen,
        EngineConfig::from_config(config),
    );
    let controller = Controller::new(reconciler, ControllerConfig::from_config(config));

    info!(
        store = %paths.store.display(),
        runner = %config.runner.command,
        "Daemon started"
    );

    Ok(Daemon {
        paths: paths.clone(),
        lock_file,
        controller,
        metrics,
    })
}

/// Log runs that were active when the previous daemon stopped.
///
/// Their pods are looked up again on the first resync; a pod the launcher
/// no longer knows counts as a failed attempt.
async fn recover(store: &FsStore) -> Result<usize, LifecycleError> {
    let runs: Vec<Run> = store.list(None).await?;
    let active: Vec<&Run> = runs.iter().filter(|r| r.status.state.is_active()).collect();
    if !active.is_empty() {
        warn!(
            count = active.len(),
            "found active runs from a previous daemon, resuming"
        );
        for run in &active {
            warn!(
                run = %run.metadata.key(),
                state = %run.status.state,
                retries = run.status.retries,
                "  resuming run"
            );
        }
    }
    Ok(active.len())
}

fn remove_pid_file(paths: &Paths) {
    if paths.pid.exists() {
        if let Err(e) = std::fs::remove_file(&paths.pid) {
            warn!("Failed to remove PID file: {}", e);
        }
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared reconciliation context
//!
//! A [`Reconciler`] owns the adapters and settings used by both the layer and
//! the run reconcilers. Every external call goes through [`Reconciler::bounded`]
//! so that no reconciliation outlives the configured deadline.

use crate::error::ReconcileError;
use crate::lock::LockManager;
use std::future::Future;
use std::time::Duration;
use strata_adapters::{ArtifactStore, JobLauncher, JobRequest, MetricsSink};
use strata_core::config::{RunnerConfig, TimerConfig};
use strata_core::{
    Clock, Config, Event, IdGen, Layer, PodRef, Repository, Run, SyncWindow, Thresholds, Tool,
};
use strata_storage::ResourceStore;

/// What the controller should do with a key after reconciling it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Reconcile again after the delay
    Requeue(Duration),
    /// Nothing scheduled; the next resync or change picks the key up again
    Done,
}

/// Engine settings derived from the daemon configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub timers: TimerConfig,
    pub default_max_retries: u32,
    pub default_keep_last_runs: usize,
    pub runner: RunnerConfig,
    /// Windows applied on top of each repository's own
    pub sync_windows: Vec<SyncWindow>,
}

impl EngineConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            timers: config.timers.clone(),
            default_max_retries: config.controller.default_max_retries,
            default_keep_last_runs: config.controller.default_keep_last_runs,
            runner: config.runner.clone(),
            sync_windows: config.sync_windows.clone(),
        }
    }

    pub fn thresholds(&self) -> Thresholds {
        self.timers.thresholds()
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Adapter dependencies
pub struct EngineDeps<S, L, A, M> {
    pub store: S,
    pub launcher: L,
    pub artifacts: A,
    pub metrics: M,
}

pub struct Reconciler<S, L, A, M, C: Clock, I: IdGen> {
    pub(crate) store: S,
    pub(crate) launcher: L,
    pub(crate) artifacts: A,
    pub(crate) metrics: M,
    pub(crate) locks: LockManager<S>,
    pub(crate) clock: C,
    pub(crate) id_gen: I,
    pub(crate) config: EngineConfig,
}

impl<S, L, A, M, C, I> Reconciler<S, L, A, M, C, I>
where
    S: ResourceStore,
    L: JobLauncher,
    A: ArtifactStore,
    M: MetricsSink,
    C: Clock,
    I: IdGen,
{
    pub fn new(deps: EngineDeps<S, L, A, M>, clock: C, id_gen: I, config: EngineConfig) -> Self {
        Self {
            locks: LockManager::new(deps.store.clone()),
            store: deps.store,
            launcher: deps.launcher,
            artifacts: deps.artifacts,
            metrics: deps.metrics,
            clock,
            id_gen,
            config,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Run an external call under the reconcile deadline
    pub(crate) async fn bounded<T, E, F>(
        &self,
        operation: &'static str,
        call: F,
    ) -> Result<T, ReconcileError>
    where
        F: Future<Output = Result<T, E>>,
        ReconcileError: From<E>,
    {
        let deadline = self.config.timers.reconcile_deadline;
        match tokio::time::timeout(deadline, call).await {
            Ok(result) => result.map_err(ReconcileError::from),
            Err(_) => Err(ReconcileError::Deadline {
                operation,
                deadline,
            }),
        }
    }

    /// Log an event and hand it to the metrics sink
    pub(crate) fn emit(&self, event: &Event) {
        tracing::info!(event = %event.name(), ?event, "emit");
        self.metrics.record(event);
    }

    /// Describe the pod for `attempt` of `run`.
    ///
    /// Runner settings merge layer over repository over configuration.
    pub(crate) fn job_request(
        &self,
        layer: &Layer,
        repo: &Repository,
        tool: &Tool,
        run: &Run,
        attempt: u32,
    ) -> JobRequest {
        let runner = layer.runner(repo);
        let mut env = self.config.runner.env.clone();
        env.extend(runner.env);
        JobRequest {
            pod: PodRef::for_attempt(&run.metadata.name, attempt),
            namespace: run.metadata.namespace.clone(),
            layer: layer.metadata.name.clone(),
            run: run.metadata.name.clone(),
            action: run.spec.action,
            attempt,
            repository_url: repo.spec.url.clone(),
            branch: layer.spec.branch.clone(),
            path: layer.spec.path.clone(),
            commit: run.spec.commit.clone(),
            tool: tool.name().to_string(),
            tool_version: tool.version().map(str::to_string),
            image: runner.image.or_else(|| self.config.runner.image.clone()),
            env,
            args: runner.args,
        }
    }
}

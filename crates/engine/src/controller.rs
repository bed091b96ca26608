// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Controller loop
//!
//! Feeds layer and run keys to the reconciler. Keys come from three places:
//! a periodic resync of everything, a watch that scans the store for new or
//! edited objects, and the requeue delays returned by reconciliations.
//! Distinct keys reconcile in parallel up to the concurrency limit; one key
//! is never reconciled twice at once.

use crate::error::ReconcileError;
use crate::reconciler::{Outcome, Reconciler};
use crate::scheduler::{RequeueQueue, WorkKey};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use strata_adapters::{ArtifactStore, JobLauncher, MetricsSink};
use strata_core::{Clock, Config, IdGen, Layer, ObjectKey, Repository, Resource, Run};
use strata_storage::ResourceStore;
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;
use tokio::time::{Instant, MissedTickBehavior};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    pub max_concurrent_reconciles: usize,
    pub resync_interval: Duration,
    pub watch_interval: Duration,
    /// Requeue delay after a failed reconciliation
    pub on_error: Duration,
}

impl ControllerConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_concurrent_reconciles: config.controller.max_concurrent_reconciles,
            resync_interval: config.controller.resync_interval,
            watch_interval: config.controller.watch_interval,
            on_error: config.timers.on_error,
        }
    }
}

/// Result of one spawned reconciliation; `None` if the task panicked
type Completed = (WorkKey, Option<Result<Outcome, ReconcileError>>);

pub struct Controller<S, L, A, M, C: Clock, I: IdGen> {
    reconciler: Arc<Reconciler<S, L, A, M, C, I>>,
    config: ControllerConfig,
    queue: RequeueQueue,
    in_flight: HashSet<WorkKey>,
    /// Keys that became due while in flight
    dirty: HashSet<WorkKey>,
    /// Last seen fingerprint per object, for change detection
    seen: HashMap<WorkKey, String>,
    repos: HashMap<ObjectKey, String>,
    tasks: JoinSet<Completed>,
    permits: Arc<Semaphore>,
}

impl<S, L, A, M, C, I> Controller<S, L, A, M, C, I>
where
    S: ResourceStore,
    L: JobLauncher,
    A: ArtifactStore,
    M: MetricsSink,
    C: Clock,
    I: IdGen,
{
    pub fn new(reconciler: Reconciler<S, L, A, M, C, I>, config: ControllerConfig) -> Self {
        let permits = Arc::new(Semaphore::new(config.max_concurrent_reconciles.max(1)));
        Self {
            reconciler: Arc::new(reconciler),
            config,
            queue: RequeueQueue::new(),
            in_flight: HashSet::new(),
            dirty: HashSet::new(),
            seen: HashMap::new(),
            repos: HashMap::new(),
            tasks: JoinSet::new(),
            permits,
        }
    }

    pub fn reconciler(&self) -> &Reconciler<S, L, A, M, C, I> {
        &self.reconciler
    }

    /// Schedule a key for immediate reconciliation
    pub fn enqueue(&mut self, key: WorkKey) {
        self.queue.schedule(key, Instant::now());
    }

    /// Run until `shutdown` flips to true or its sender is dropped, then
    /// wait for in-flight reconciliations to finish.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(
            max_concurrent = self.config.max_concurrent_reconciles,
            resync_secs = self.config.resync_interval.as_secs(),
            "controller started"
        );

        let mut resync = tokio::time::interval(self.config.resync_interval);
        resync.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut watch = tokio::time::interval(self.config.watch_interval);
        watch.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if *shutdown.borrow() {
                break;
            }
            self.dispatch_due();
            let wake = self
                .queue
                .next_deadline()
                .unwrap_or_else(|| Instant::now() + self.config.watch_interval);

            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                _ = resync.tick() => self.resync().await,
                _ = watch.tick() => self.scan_changes().await,
                Some(joined) = self.tasks.join_next(), if !self.tasks.is_empty() => {
                    match joined {
                        Ok(completed) => self.complete(completed),
                        // Reconcile tasks never panic; see spawn()
                        Err(e) => tracing::error!(error = %e, "reconcile task failed"),
                    }
                }
                _ = tokio::time::sleep_until(wake) => {}
            }
        }

        tracing::info!(in_flight = self.tasks.len(), "controller stopping");
        while let Some(joined) = self.tasks.join_next().await {
            if let Ok(completed) = joined {
                self.complete(completed);
            }
        }
        tracing::info!("controller stopped");
    }

    fn dispatch_due(&mut self) {
        for key in self.queue.pop_due(Instant::now()) {
            if self.in_flight.contains(&key) {
                self.dirty.insert(key);
                continue;
            }
            self.in_flight.insert(key.clone());
            self.spawn(key);
        }
    }

    fn spawn(&mut self, key: WorkKey) {
        let reconciler = Arc::clone(&self.reconciler);
        let permits = Arc::clone(&self.permits);
        self.tasks.spawn(async move {
            // Only fails once the semaphore is closed, which never happens
            let _permit = permits.acquire_owned().await.ok();
            let work = key.clone();
            // A panicking reconciliation must not leave its key in flight
            let inner = tokio::spawn(async move {
                match &work {
                    WorkKey::Layer(k) => reconciler.reconcile_layer(k).await,
                    WorkKey::Run(k) => reconciler.reconcile_run(k).await,
                }
            });
            match inner.await {
                Ok(result) => (key, Some(result)),
                Err(e) => {
                    tracing::error!(%key, error = %e, "reconcile panicked");
                    (key, None)
                }
            }
        });
    }

    fn complete(&mut self, (key, result): Completed) {
        self.in_flight.remove(&key);
        let now = Instant::now();

        let delay = match result {
            Some(Ok(Outcome::Requeue(delay))) => Some(delay),
            Some(Ok(Outcome::Done)) => None,
            Some(Err(e)) => {
                tracing::warn!(%key, error = %e, "reconcile failed, requeueing");
                Some(self.config.on_error)
            }
            None => Some(self.config.on_error),
        };
        // Delays past the representable range wait for the next resync
        if let Some(at) = delay.and_then(|d| now.checked_add(d)) {
            self.queue.schedule(key.clone(), at);
        }
        if self.dirty.remove(&key) {
            self.queue.schedule(key, now);
        }
    }

    /// Enqueue every layer and every unfinished run
    async fn resync(&mut self) {
        let store = self.reconciler.store().clone();
        let now = Instant::now();

        match store.list::<Layer>(None).await {
            Ok(layers) => {
                tracing::debug!(count = layers.len(), "resync layers");
                for layer in layers {
                    let key = WorkKey::Layer(layer.key());
                    self.seen.insert(key.clone(), layer_fingerprint(&layer));
                    self.queue.schedule(key, now);
                }
            }
            Err(e) => tracing::warn!(error = %e, "resync: failed to list layers"),
        }

        match store.list::<Run>(None).await {
            Ok(runs) => {
                for run in runs {
                    let key = WorkKey::Run(run.key());
                    self.seen.insert(key.clone(), String::new());
                    if !run.status.state.is_terminal() {
                        self.queue.schedule(key, now);
                    }
                }
            }
            Err(e) => tracing::warn!(error = %e, "resync: failed to list runs"),
        }

        match store.list::<Repository>(None).await {
            Ok(repos) => {
                self.repos = repos
                    .iter()
                    .map(|repo| (repo.key(), repo_fingerprint(repo)))
                    .collect();
            }
            Err(e) => tracing::warn!(error = %e, "resync: failed to list repositories"),
        }
    }

    /// Enqueue objects created or edited since the last scan.
    ///
    /// Status writes do not count as edits: the layer fingerprint covers
    /// spec and annotations, and runs are only enqueued when they appear.
    async fn scan_changes(&mut self) {
        let store = self.reconciler.store().clone();
        let now = Instant::now();

        let mut changed_repos = HashSet::new();
        match store.list::<Repository>(None).await {
            Ok(repos) => {
                let mut current = HashMap::new();
                for repo in &repos {
                    let fingerprint = repo_fingerprint(repo);
                    if self.repos.get(&repo.key()) != Some(&fingerprint) {
                        changed_repos.insert(repo.key());
                    }
                    current.insert(repo.key(), fingerprint);
                }
                self.repos = current;
            }
            Err(e) => tracing::warn!(error = %e, "watch: failed to list repositories"),
        }

        let mut live = HashSet::new();
        let mut complete = true;
        match store.list::<Layer>(None).await {
            Ok(layers) => {
                for layer in layers {
                    let key = WorkKey::Layer(layer.key());
                    let fingerprint = layer_fingerprint(&layer);
                    let repo_key = ObjectKey::new(&layer.metadata.namespace, &layer.spec.repository);
                    let edited = self.seen.get(&key) != Some(&fingerprint);
                    if edited || changed_repos.contains(&repo_key) {
                        tracing::debug!(%key, "layer changed");
                        self.queue.schedule(key.clone(), now);
                    }
                    self.seen.insert(key.clone(), fingerprint);
                    live.insert(key);
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "watch: failed to list layers");
                complete = false;
            }
        }

        match store.list::<Run>(None).await {
            Ok(runs) => {
                for run in runs {
                    let key = WorkKey::Run(run.key());
                    if !self.seen.contains_key(&key) {
                        tracing::debug!(%key, "run appeared");
                        self.seen.insert(key.clone(), String::new());
                        if !run.status.state.is_terminal() {
                            self.queue.schedule(key.clone(), now);
                        }
                    }
                    live.insert(key);
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "watch: failed to list runs");
                complete = false;
            }
        }

        if complete {
            self.seen.retain(|key, _| live.contains(key));
        }
    }
}

fn layer_fingerprint(layer: &Layer) -> String {
    serde_json::to_string(&(&layer.spec, &layer.annotations)).unwrap_or_default()
}

fn repo_fingerprint(repo: &Repository) -> String {
    serde_json::to_string(&repo.spec).unwrap_or_default()
}

#[cfg(test)]
#[path = "controller_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Layer reconciliation
//!
//! Reads the layer and its repository, lets the layer state machine decide,
//! then carries out the launch sequence for plan and apply runs:
//! sync windows, lock, run object, first pod. Whatever happens, the lock is
//! released again unless a run was fully launched to own it. A layer whose
//! lock is held is left alone until the lock is released, or reclaimed once
//! its owning run is gone.

use crate::error::ReconcileError;
use crate::lock::{lock_key_for, LockError};
use crate::reconciler::{Outcome, Reconciler};
use std::time::Duration;
use strata_adapters::{ArtifactStore, JobLauncher, MetricsSink, PlanFormat, PlanRef};
use strata_core::{
    condition, history, is_sync_blocked, windows_for_action, Action, Clock, Effect, Event, IdGen,
    Layer, LayerState, ObjectKey, Repository, Resource, Run, RunRef, RunState, Tool,
};
use strata_storage::{find, update_with_retry, ResourceStore, DEFAULT_UPDATE_ATTEMPTS};
use tracing::Instrument;

/// Shown in `last_result` when the plan summary cannot be fetched
pub const PLAN_SUMMARY_UNAVAILABLE: &str = "plan summary unavailable";

const MAX_SUMMARY_LEN: usize = 512;

impl<S, L, A, M, C, I> Reconciler<S, L, A, M, C, I>
where
    S: ResourceStore,
    L: JobLauncher,
    A: ArtifactStore,
    M: MetricsSink,
    C: Clock,
    I: IdGen,
{
    pub async fn reconcile_layer(&self, key: &ObjectKey) -> Result<Outcome, ReconcileError> {
        let span = tracing::info_span!(
            "reconcile",
            kind = "layer",
            namespace = %key.namespace,
            name = %key.name
        );
        async move {
            let start = std::time::Instant::now();
            let result = self.reconcile_layer_inner(key).await;
            match &result {
                Ok(outcome) => tracing::debug!(
                    ?outcome,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "reconciled"
                ),
                Err(e) => tracing::warn!(
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    error = %e,
                    "reconcile failed"
                ),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn reconcile_layer_inner(&self, key: &ObjectKey) -> Result<Outcome, ReconcileError> {
        let Some(layer) = self
            .bounded("get layer", find::<S, Layer>(&self.store, key))
            .await?
        else {
            tracing::debug!("layer is gone");
            return Ok(Outcome::Done);
        };

        let repo_key = ObjectKey::new(&key.namespace, &layer.spec.repository);
        let Some(repo) = self
            .bounded("get repository", find::<S, Repository>(&self.store, &repo_key))
            .await?
        else {
            return Err(ReconcileError::RepositoryNotFound(repo_key));
        };

        // A layer with a run in flight waits for the run to release the lock
        let namespace = &key.namespace;
        let lock_key = lock_key_for(&layer, &repo);
        if self
            .bounded("check lock", self.locks.is_locked(namespace, &lock_key))
            .await?
        {
            let held = self
                .bounded(
                    "reclaim lock",
                    self.locks.reclaim_orphan(
                        namespace,
                        &lock_key,
                        self.clock.now(),
                        self.config.timers.reconcile_deadline,
                    ),
                )
                .await?;
            if let Some(lock) = held {
                tracing::debug!(owner = %lock.owner, "layer is locked");
                self.emit(&Event::LockContention {
                    namespace: namespace.clone(),
                    layer: key.name.clone(),
                    owner: lock.owner,
                });
                return Ok(Outcome::Requeue(self.config.timers.wait_action));
            }
        }

        // Misconfiguration waits for an edit or the next resync
        let tool = match layer.tool(&repo) {
            Ok(tool) => tool,
            Err(e) => {
                tracing::error!(error = %e, "invalid layer configuration");
                self.emit(&Event::LayerInvalid {
                    namespace: key.namespace.clone(),
                    layer: key.name.clone(),
                    reason: e.to_string(),
                });
                return Ok(Outcome::Done);
            }
        };

        let auto_apply = layer.remediation(&repo).is_auto_apply();
        let decision = layer.decide(&self.config.thresholds(), auto_apply, &self.clock);
        tracing::debug!(state = %decision.state, auto_apply, "decided");

        let mut outcome = Outcome::Done;
        let mut launched = None;
        for effect in &decision.effects {
            match effect {
                Effect::Emit(event) => self.emit(event),
                Effect::Requeue(delay) => outcome = Outcome::Requeue(*delay),
                Effect::LaunchRun { action } => {
                    let (run, delay) = self.launch(&layer, &repo, &tool, *action).await?;
                    launched = run;
                    outcome = Outcome::Requeue(delay);
                }
                Effect::LaunchPod { .. }
                | Effect::ReleaseLock
                | Effect::RecordLayerSuccess
                | Effect::RecordLayerFailure => {
                    tracing::warn!(?effect, "ignoring run effect on layer");
                }
            }
        }

        let last_result = self.last_result(&layer).await;
        let layer = self
            .write_layer_status(
                &layer,
                &repo,
                decision.state,
                decision.conditions.to_vec(),
                launched.as_ref(),
                last_result,
            )
            .await?;
        self.cleanup_runs(&layer).await?;

        Ok(outcome)
    }

    /// Launch sequence for one action.
    ///
    /// Returns the new run, if one was launched, and the requeue delay.
    async fn launch(
        &self,
        layer: &Layer,
        repo: &Repository,
        tool: &Tool,
        action: Action,
    ) -> Result<(Option<Run>, Duration), ReconcileError> {
        let now = self.clock.now();
        let wait = self.config.timers.wait_action;
        let namespace = &layer.metadata.namespace;

        let mut windows = repo.spec.sync_windows.clone();
        windows.extend(self.config.sync_windows.iter().cloned());
        let verdict = is_sync_blocked(
            &windows_for_action(&windows, action),
            &layer.metadata.name,
            now,
        );
        if verdict.blocked {
            tracing::info!(%action, reason = ?verdict.reason, "sync blocked by window");
            if let Some(reason) = verdict.reason {
                self.emit(&Event::SyncBlocked {
                    namespace: namespace.clone(),
                    layer: layer.metadata.name.clone(),
                    action,
                    reason,
                });
            }
            return Ok((None, wait));
        }

        let name = Run::name_for(&layer.metadata.name, action, &self.id_gen.next());
        let lock_key = lock_key_for(layer, repo);
        match self
            .bounded(
                "create lock",
                self.locks.create_lock(namespace, &lock_key, &name, now),
            )
            .await
        {
            Ok(()) => {}
            Err(ReconcileError::Lock(LockError::Contention { owner, .. })) => {
                tracing::info!(%action, %owner, "layer is locked");
                self.emit(&Event::LockContention {
                    namespace: namespace.clone(),
                    layer: layer.metadata.name.clone(),
                    owner,
                });
                return Ok((None, wait));
            }
            Err(e) => return Err(e),
        }

        match self.start_run(layer, repo, tool, action, name.clone()).await {
            Ok(run) => {
                tracing::info!(run = %name, %action, "run launched");
                self.emit(&Event::RunCreated {
                    namespace: namespace.clone(),
                    layer: layer.metadata.name.clone(),
                    run: name,
                    action,
                });
                Ok((Some(run), wait))
            }
            Err(e) => {
                tracing::error!(run = %name, error = %e, "launch failed, releasing lock");
                if let Err(release) = self
                    .bounded(
                        "release lock",
                        self.locks.delete_lock(namespace, &lock_key, &name),
                    )
                    .await
                {
                    tracing::error!(run = %name, error = %release, "failed to release lock");
                }
                Err(e)
            }
        }
    }

    /// Create the run object and submit its first pod
    async fn start_run(
        &self,
        layer: &Layer,
        repo: &Repository,
        tool: &Tool,
        action: Action,
        name: String,
    ) -> Result<Run, ReconcileError> {
        let now = self.clock.now();
        let mut run = Run::for_layer(layer, name, action, now);
        run.status.last_attempt_date = Some(now);
        run.status.pod = Some(run.current_pod());
        let run = self.bounded("create run", self.store.create(run)).await?;

        let request = self.job_request(layer, repo, tool, &run, 0);
        if let Err(e) = self.bounded("submit pod", self.launcher.submit(request)).await {
            // A run without a pod must not outlive the lock it was meant to own
            if let Err(delete) = self
                .bounded("delete run", self.store.delete::<Run>(&run.key()))
                .await
            {
                tracing::warn!(run = %run.metadata.name, error = %delete, "failed to delete unlaunched run");
            }
            return Err(e);
        }
        Ok(run)
    }

    /// Summary of the last successful plan, for `status.last_result`.
    ///
    /// `None` keeps whatever is recorded.
    async fn last_result(&self, layer: &Layer) -> Option<String> {
        let last = layer.status.last_run.as_ref()?;
        if last.action != Action::Plan {
            return None;
        }
        let run_key = ObjectKey::new(&layer.metadata.namespace, &last.name);
        let run = match self.bounded("get run", find::<S, Run>(&self.store, &run_key)).await {
            Ok(Some(run)) => run,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(run = %last.name, error = %e, "could not read last run");
                return None;
            }
        };
        if run.status.state != RunState::Succeeded {
            return None;
        }

        let plan = PlanRef::new(
            &layer.metadata.namespace,
            &layer.metadata.name,
            &run.metadata.name,
            run.status.retries,
        );
        match self
            .bounded("get plan", self.artifacts.get_plan(&plan, PlanFormat::Short))
            .await
        {
            Ok(summary) => Some(summarize(&summary)),
            Err(e) => {
                tracing::warn!(%plan, error = %e, "could not fetch plan summary");
                Some(PLAN_SUMMARY_UNAVAILABLE.to_string())
            }
        }
    }

    /// Persist conditions, state, result and history. Skips the write when
    /// nothing changed so idle layers do not churn versions.
    async fn write_layer_status(
        &self,
        layer: &Layer,
        repo: &Repository,
        state: LayerState,
        conditions: Vec<condition::Condition>,
        launched: Option<&Run>,
        last_result: Option<String>,
    ) -> Result<Layer, ReconcileError> {
        let now = self.clock.now();
        let keep = layer.keep_last_runs(repo, self.config.default_keep_last_runs);
        let run_ref = launched.map(|run| RunRef {
            name: run.metadata.name.clone(),
            action: run.spec.action,
            commit: run.spec.commit.clone(),
            date: run.metadata.creation_timestamp.unwrap_or(now),
        });

        let apply = |current: &mut Layer| {
            current.status.conditions =
                condition::merge(&current.status.conditions, conditions.clone());
            current.status.state = state.to_string();
            if let Some(result) = &last_result {
                current.status.last_result = result.clone();
            }
            if let Some(run_ref) = &run_ref {
                if let Some(evicted) = history::record_run(&mut current.status, run_ref.clone(), keep)
                {
                    tracing::debug!(run = %evicted.name, "evicted from history");
                }
                // The trigger is consumed by the run it caused
                match run_ref.action {
                    Action::Plan => current.annotations.sync_now = false,
                    Action::Apply => current.annotations.apply_now = false,
                }
            }
        };

        let mut preview = layer.clone();
        apply(&mut preview);
        if preview == *layer {
            return Ok(preview);
        }

        let updated = self
            .bounded(
                "update layer",
                update_with_retry(&self.store, &layer.key(), DEFAULT_UPDATE_ATTEMPTS, apply),
            )
            .await?;
        Ok(updated)
    }

    /// Delete finished runs that fell out of the layer's history.
    ///
    /// Active runs are never deleted: they still own a lock or a pod.
    pub(crate) async fn cleanup_runs(&self, layer: &Layer) -> Result<usize, ReconcileError> {
        let runs: Vec<Run> = self
            .bounded("list runs", self.store.list(Some(&layer.metadata.namespace)))
            .await?;
        let finished: Vec<Run> = runs
            .into_iter()
            .filter(|run| run.status.state.is_terminal())
            .collect();

        let mut deleted = 0;
        for name in history::runs_to_delete(layer, &finished) {
            let key = ObjectKey::new(&layer.metadata.namespace, &name);
            match self.bounded("delete run", self.store.delete::<Run>(&key)).await {
                Ok(()) => {
                    tracing::info!(run = %name, "deleted run outside history");
                    deleted += 1;
                }
                Err(ReconcileError::Store(e)) if e.is_not_found() => {}
                Err(e) => return Err(e),
            }
        }
        Ok(deleted)
    }
}

/// First non-empty line of a plan summary, bounded in length
fn summarize(summary: &str) -> String {
    let line = summary
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("");
    line.chars().take(MAX_SUMMARY_LEN).collect()
}

#[cfg(test)]
#[path = "layer_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run reconciliation
//!
//! Observes the pod of the current attempt, applies the run state machine,
//! and executes its effects before persisting the new run status. Effects
//! run first so that a failed write is repaired by the next observation;
//! every effect is idempotent except the layer failure count, which is only
//! touched on the terminal transition.

use crate::error::ReconcileError;
use crate::lock::lock_key_for;
use crate::reconciler::{Outcome, Reconciler};
use strata_adapters::{ArtifactStore, JobLauncher, MetricsSink};
use strata_core::{
    Clock, Effect, IdGen, Layer, ObjectKey, Repository, Resource, Run, RunPolicy, RunState,
};
use strata_storage::{find, update_with_retry, ResourceStore, DEFAULT_UPDATE_ATTEMPTS};
use tracing::Instrument;

/// The run's owning layer and its repository, when they still exist
struct Owner {
    layer: Layer,
    repo: Option<Repository>,
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
    pub async fn reconcile_run(&self, key: &ObjectKey) -> Result<Outcome, ReconcileError> {
        let span = tracing::info_span!(
            "reconcile",
            kind = "run",
            namespace = %key.namespace,
            name = %key.name
        );
        async move {
            let start = std::time::Instant::now();
            let result = self.reconcile_run_inner(key).await;
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

    async fn reconcile_run_inner(&self, key: &ObjectKey) -> Result<Outcome, ReconcileError> {
        let Some(run) = self
            .bounded("get run", find::<S, Run>(&self.store, key))
            .await?
        else {
            return Ok(Outcome::Done);
        };
        if run.status.state.is_terminal() {
            return Ok(Outcome::Done);
        }

        let owner = self.owner(&run).await?;
        let policy = self.run_policy(owner.as_ref());

        let pod = run.status.pod.clone().unwrap_or_else(|| run.current_pod());
        let phase = self
            .bounded("pod phase", self.launcher.phase(&pod))
            .await?;

        // Created but never submitted, e.g. after a crash mid-launch
        if phase.is_none() && run.status.state == RunState::Initial {
            if let Some(owner) = &owner {
                if self.submit_attempt(&run, owner, run.status.retries).await? {
                    return Ok(Outcome::Requeue(policy.poll_interval));
                }
            }
        }

        let (next, effects) = run.transition(phase, &policy, &self.clock);
        if next.status.state != run.status.state {
            tracing::info!(
                from = %run.status.state,
                to = %next.status.state,
                ?phase,
                retries = next.status.retries,
                "run state changed"
            );
        }

        let mut outcome = Outcome::Done;
        for effect in effects {
            match effect {
                Effect::Emit(event) => self.emit(&event),
                Effect::Requeue(delay) => outcome = Outcome::Requeue(delay),
                Effect::LaunchPod { attempt } => match &owner {
                    Some(owner) => {
                        self.submit_attempt(&next, owner, attempt).await?;
                    }
                    None => tracing::warn!(attempt, "layer is gone, not launching retry"),
                },
                Effect::ReleaseLock => self.release_run_lock(&run, owner.as_ref()).await?,
                Effect::RecordLayerSuccess => self.record_layer_result(&run, true).await?,
                Effect::RecordLayerFailure => self.record_layer_result(&run, false).await?,
                Effect::LaunchRun { .. } => {
                    tracing::warn!(?effect, "ignoring layer effect on run");
                }
            }
        }

        if next != run {
            self.bounded("update run", self.store.update(next)).await?;
        }
        Ok(outcome)
    }

    async fn owner(&self, run: &Run) -> Result<Option<Owner>, ReconcileError> {
        let layer_key = ObjectKey::new(&run.metadata.namespace, &run.spec.layer);
        let Some(layer) = self
            .bounded("get layer", find::<S, Layer>(&self.store, &layer_key))
            .await?
        else {
            return Ok(None);
        };
        let repo_key = ObjectKey::new(&run.metadata.namespace, &layer.spec.repository);
        let repo = self
            .bounded("get repository", find::<S, Repository>(&self.store, &repo_key))
            .await?;
        Ok(Some(Owner { layer, repo }))
    }

    /// Max retries: layer override, then repository, then configuration
    fn run_policy(&self, owner: Option<&Owner>) -> RunPolicy {
        let configured = owner.and_then(|o| match &o.repo {
            Some(repo) => o.layer.remediation(repo).on_error.max_retries,
            None => o.layer.spec.remediation_strategy.on_error.max_retries,
        });
        RunPolicy {
            max_retries: configured.unwrap_or(self.config.default_max_retries),
            grace: self.config.timers.failure_grace_period,
            poll_interval: self.config.timers.wait_action,
        }
    }

    /// Submit the pod for `attempt`. Returns false if the layer can no
    /// longer describe a job.
    async fn submit_attempt(
        &self,
        run: &Run,
        owner: &Owner,
        attempt: u32,
    ) -> Result<bool, ReconcileError> {
        let Some(repo) = &owner.repo else {
            tracing::warn!(attempt, "repository is gone, not submitting pod");
            return Ok(false);
        };
        let tool = match owner.layer.tool(repo) {
            Ok(tool) => tool,
            Err(e) => {
                tracing::warn!(attempt, error = %e, "layer is invalid, not submitting pod");
                return Ok(false);
            }
        };
        let request = self.job_request(&owner.layer, repo, &tool, run, attempt);
        let pod = self.bounded("submit pod", self.launcher.submit(request)).await?;
        tracing::info!(%pod, attempt, "pod submitted");
        Ok(true)
    }

    async fn release_run_lock(&self, run: &Run, owner: Option<&Owner>) -> Result<(), ReconcileError> {
        let namespace = &run.metadata.namespace;
        let name = &run.metadata.name;
        match owner {
            Some(Owner {
                layer,
                repo: Some(repo),
            }) => {
                let key = lock_key_for(layer, repo);
                self.bounded("release lock", self.locks.delete_lock(namespace, &key, name))
                    .await
            }
            // Without the layer the key cannot be derived; find it by owner
            _ => {
                let released = self
                    .bounded("release lock", self.locks.release_owned_by(namespace, name))
                    .await?;
                tracing::debug!(released, "released locks by owner");
                Ok(())
            }
        }
    }

    /// Reset or bump the owning layer's failure count
    async fn record_layer_result(&self, run: &Run, succeeded: bool) -> Result<(), ReconcileError> {
        let key = ObjectKey::new(&run.metadata.namespace, &run.spec.layer);
        let now = self.clock.now();
        let result = self
            .bounded(
                "update layer",
                update_with_retry(&self.store, &key, DEFAULT_UPDATE_ATTEMPTS, |layer: &mut Layer| {
                    let annotations = &mut layer.annotations;
                    if succeeded {
                        annotations.failure_count = Some(0);
                    } else {
                        annotations.failure_count =
                            Some(annotations.failure_count.unwrap_or(0).saturating_add(1));
                        annotations.last_failure_date = Some(now);
                    }
                }),
            )
            .await;
        match result {
            Ok(layer) => {
                tracing::debug!(
                    layer = %layer.key(),
                    failure_count = ?layer.annotations.failure_count,
                    "recorded run result on layer"
                );
                Ok(())
            }
            Err(ReconcileError::Store(e)) if e.is_not_found() => Ok(()),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;

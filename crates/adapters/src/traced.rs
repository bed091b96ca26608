// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced adapter wrappers for consistent observability

use crate::artifacts::{ArtifactError, ArtifactStore, PlanFormat, PlanRef};
use crate::launcher::{JobLauncher, JobRequest, LaunchError};
use async_trait::async_trait;
use tracing::Instrument;
use strata_core::{PodPhase, PodRef};

/// Wrapper that adds tracing to any JobLauncher
#[derive(Clone)]
pub struct TracedLauncher<L> {
    inner: L,
}

impl<L> TracedLauncher<L> {
    pub fn new(inner: L) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<L: JobLauncher> JobLauncher for TracedLauncher<L> {
    async fn submit(&self, request: JobRequest) -> Result<PodRef, LaunchError> {
        let span = tracing::info_span!(
            "launcher.submit",
            pod = %request.pod,
            namespace = %request.namespace,
            layer = %request.layer,
            action = %request.action,
        );

        async move {
            tracing::info!(attempt = request.attempt, tool = %request.tool, "submitting");

            // Precondition: pod names are derived from run and attempt
            let expected = PodRef::for_attempt(&request.run, request.attempt);
            if request.pod != expected {
                tracing::error!(%expected, "pod name does not match run attempt");
                return Err(LaunchError::SpawnFailed {
                    pod: request.pod,
                    message: format!("pod name does not match run attempt, expected {}", expected),
                });
            }

            let start = std::time::Instant::now();
            let result = self.inner.submit(request).await;
            let elapsed = start.elapsed();

            match &result {
                Ok(pod) => tracing::info!(
                    %pod,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "pod submitted"
                ),
                Err(e) => tracing::error!(
                    elapsed_ms = elapsed.as_millis() as u64,
                    error = %e,
                    "submit failed"
                ),
            }

            result
        }
        .instrument(span)
        .await
    }

    async fn phase(&self, pod: &PodRef) -> Result<Option<PodPhase>, LaunchError> {
        let result = self.inner.phase(pod).await;
        match &result {
            Ok(phase) => tracing::trace!(%pod, phase = ?phase, "checked"),
            Err(e) => tracing::warn!(%pod, error = %e, "phase check failed"),
        }
        result
    }
}

/// Wrapper that adds tracing to any ArtifactStore
#[derive(Clone)]
pub struct TracedArtifactStore<A> {
    inner: A,
}

impl<A> TracedArtifactStore<A> {
    pub fn new(inner: A) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<A: ArtifactStore> ArtifactStore for TracedArtifactStore<A> {
    async fn get_plan(&self, plan: &PlanRef, format: PlanFormat) -> Result<String, ArtifactError> {
        let span = tracing::info_span!("artifacts.get_plan", %plan, %format);
        async move {
            let start = std::time::Instant::now();
            let result = self.inner.get_plan(plan, format).await;
            let elapsed = start.elapsed();

            match &result {
                Ok(content) => tracing::debug!(
                    len = content.len(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "fetched"
                ),
                // A missing plan is routine until the runner uploads it
                Err(ArtifactError::NotFound(_)) => tracing::debug!("plan not found"),
                Err(e) => tracing::warn!(
                    elapsed_ms = elapsed.as_millis() as u64,
                    error = %e,
                    "fetch failed"
                ),
            }

            result
        }
        .instrument(span)
        .await
    }

    async fn put_plan(
        &self,
        plan: &PlanRef,
        format: PlanFormat,
        content: &str,
    ) -> Result<(), ArtifactError> {
        let span = tracing::info_span!("artifacts.put_plan", %plan, %format);
        async move {
            let result = self.inner.put_plan(plan, format, content).await;
            match &result {
                Ok(()) => tracing::info!(len = content.len(), "stored"),
                Err(e) => tracing::error!(error = %e, "store failed"),
            }
            result
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;

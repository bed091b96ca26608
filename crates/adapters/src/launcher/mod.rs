// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job launcher adapters
//!
//! A launcher runs one pod per run attempt. Pods are named by the caller
//! (`<run>-<attempt>`), and submitting a pod that already exists succeeds
//! without starting a second one.

mod process;

pub use process::{ProcessLauncher, ProcessLauncherConfig};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeLauncher, LaunchCall};

use async_trait::async_trait;
use std::collections::BTreeMap;
use strata_core::{Action, PodPhase, PodRef};
use thiserror::Error;

/// Errors from launcher operations
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("failed to start pod {pod}: {message}")]
    SpawnFailed { pod: PodRef, message: String },
    #[error("launcher unavailable: {0}")]
    Unavailable(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Everything a runner needs to execute one attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRequest {
    pub pod: PodRef,
    pub namespace: String,
    pub layer: String,
    pub run: String,
    pub action: Action,
    pub attempt: u32,
    pub repository_url: String,
    pub branch: String,
    pub path: String,
    pub commit: Option<String>,
    /// `terraform` or `tofu`
    pub tool: String,
    pub tool_version: Option<String>,
    pub image: Option<String>,
    pub env: BTreeMap<String, String>,
    pub args: Vec<String>,
}

impl JobRequest {
    /// Environment describing the job, merged under the runner overrides
    pub fn job_env(&self) -> BTreeMap<String, String> {
        let mut env = BTreeMap::new();
        env.insert("STRATA_NAMESPACE".to_string(), self.namespace.clone());
        env.insert("STRATA_LAYER".to_string(), self.layer.clone());
        env.insert("STRATA_RUN".to_string(), self.run.clone());
        env.insert("STRATA_POD".to_string(), self.pod.to_string());
        env.insert("STRATA_ACTION".to_string(), self.action.to_string());
        env.insert("STRATA_ATTEMPT".to_string(), self.attempt.to_string());
        env.insert("STRATA_REPOSITORY_URL".to_string(), self.repository_url.clone());
        env.insert("STRATA_BRANCH".to_string(), self.branch.clone());
        env.insert("STRATA_PATH".to_string(), self.path.clone());
        env.insert("STRATA_TOOL".to_string(), self.tool.clone());
        if let Some(commit) = &self.commit {
            env.insert("STRATA_COMMIT".to_string(), commit.clone());
        }
        if let Some(version) = &self.tool_version {
            env.insert("STRATA_TOOL_VERSION".to_string(), version.clone());
        }
        if let Some(image) = &self.image {
            env.insert("STRATA_IMAGE".to_string(), image.clone());
        }
        env.extend(self.env.iter().map(|(k, v)| (k.clone(), v.clone())));
        env
    }
}

/// Adapter that executes run pods
#[async_trait]
pub trait JobLauncher: Clone + Send + Sync + 'static {
    /// Start a pod; succeeds without effect if the pod already exists
    async fn submit(&self, request: JobRequest) -> Result<PodRef, LaunchError>;

    /// Current phase of a pod, `None` if the launcher has no such pod
    async fn phase(&self, pod: &PodRef) -> Result<Option<PodPhase>, LaunchError>;
}

#[cfg(test)]
#[path = "launcher_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake job launcher for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{JobLauncher, JobRequest, LaunchError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use strata_core::{PodPhase, PodRef};

/// Recorded launcher call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchCall {
    Submit(JobRequest),
    Phase(PodRef),
}

#[derive(Default)]
struct State {
    pods: HashMap<PodRef, PodPhase>,
    calls: Vec<LaunchCall>,
    fail_submits: u32,
}

/// Fake launcher: submitted pods start `Pending` and move when told to
#[derive(Clone, Default)]
pub struct FakeLauncher {
    state: Arc<Mutex<State>>,
}

impl FakeLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<LaunchCall> {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).calls.clone()
    }

    /// Requests of all recorded submits, duplicates included
    pub fn submitted(&self) -> Vec<JobRequest> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                LaunchCall::Submit(request) => Some(request),
                LaunchCall::Phase(_) => None,
            })
            .collect()
    }

    /// Number of distinct pods that exist
    pub fn pod_count(&self) -> usize {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).pods.len()
    }

    /// Set the phase of a pod, creating it if needed
    pub fn set_phase(&self, pod: &PodRef, phase: PodPhase) {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pods
            .insert(pod.clone(), phase);
    }

    /// Forget a pod, as if it was garbage collected
    pub fn remove_pod(&self, pod: &PodRef) {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pods
            .remove(pod);
    }

    /// Make the next `count` submits fail
    pub fn fail_submits(&self, count: u32) {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).fail_submits = count;
    }
}

#[async_trait]
impl JobLauncher for FakeLauncher {
    async fn submit(&self, request: JobRequest) -> Result<PodRef, LaunchError> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.calls.push(LaunchCall::Submit(request.clone()));

        if state.fail_submits > 0 {
            state.fail_submits -= 1;
            return Err(LaunchError::SpawnFailed {
                pod: request.pod,
                message: "injected failure".to_string(),
            });
        }

        state
            .pods
            .entry(request.pod.clone())
            .or_insert(PodPhase::Pending);
        Ok(request.pod)
    }

    async fn phase(&self, pod: &PodRef) -> Result<Option<PodPhase>, LaunchError> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.calls.push(LaunchCall::Phase(pod.clone()));
        Ok(state.pods.get(pod).copied())
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake artifact store for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{ArtifactError, ArtifactStore, PlanFormat, PlanRef};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Recorded artifact call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactCall {
    Get(PlanRef, PlanFormat),
    Put(PlanRef, PlanFormat),
}

#[derive(Default)]
struct State {
    plans: HashMap<(PlanRef, PlanFormat), String>,
    calls: Vec<ArtifactCall>,
    unavailable: bool,
}

#[derive(Clone, Default)]
pub struct FakeArtifactStore {
    state: Arc<Mutex<State>>,
}

impl FakeArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<ArtifactCall> {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).calls.clone()
    }

    /// Make every call fail with an IO error
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).unavailable = unavailable;
    }
}

fn unavailable() -> ArtifactError {
    ArtifactError::Io(std::io::Error::new(
        std::io::ErrorKind::ConnectionRefused,
        "artifact store unavailable",
    ))
}

#[async_trait]
impl ArtifactStore for FakeArtifactStore {
    async fn get_plan(&self, plan: &PlanRef, format: PlanFormat) -> Result<String, ArtifactError> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.calls.push(ArtifactCall::Get(plan.clone(), format));
        if state.unavailable {
            return Err(unavailable());
        }
        state
            .plans
            .get(&(plan.clone(), format))
            .cloned()
            .ok_or_else(|| ArtifactError::NotFound(plan.to_string()))
    }

    async fn put_plan(
        &self,
        plan: &PlanRef,
        format: PlanFormat,
        content: &str,
    ) -> Result<(), ArtifactError> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.calls.push(ArtifactCall::Put(plan.clone(), format));
        if state.unavailable {
            return Err(unavailable());
        }
        state
            .plans
            .insert((plan.clone(), format), content.to_string());
        Ok(())
    }
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run resource: one plan or apply attempt for a layer

use super::{Layer, ObjectMeta, Resource};
use crate::condition::Condition;
use crate::run_state::RunState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The action a run performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Plan,
    Apply,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Plan => "plan",
            Action::Apply => "apply",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "plan" => Ok(Action::Plan),
            "apply" => Ok(Action::Apply),
            _ => Err(format!("unknown action: {}", s)),
        }
    }
}

/// Name of the execution pod backing one attempt of a run
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PodRef(pub String);

impl PodRef {
    /// Pods are named after their run and attempt so that resubmitting the
    /// same attempt is idempotent
    pub fn for_attempt(run: &str, attempt: u32) -> Self {
        Self(format!("{}-{}", run, attempt))
    }
}

impl fmt::Display for PodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle phase of an execution pod, as reported by the launcher
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PodPhase {
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl PodPhase {
    pub fn is_active(&self) -> bool {
        matches!(self, PodPhase::Pending | PodPhase::Running)
    }
}

impl fmt::Display for PodPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PodPhase::Pending => f.write_str("pending"),
            PodPhase::Running => f.write_str("running"),
            PodPhase::Succeeded => f.write_str("succeeded"),
            PodPhase::Failed => f.write_str("failed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    pub metadata: ObjectMeta,
    pub spec: RunSpec,
    #[serde(default)]
    pub status: RunStatus,
}

impl Resource for Run {
    const KIND: &'static str = "runs";

    fn meta(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn meta_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSpec {
    pub action: Action,
    /// Name of the owning layer, in the run's namespace
    pub layer: String,
    /// Commit the layer was at when the run was triggered
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunStatus {
    #[serde(default)]
    pub state: RunState,
    #[serde(default)]
    pub retries: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_attempt_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_failure_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pod: Option<PodRef>,
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

impl Run {
    /// Build a fresh run for a layer, owned by that layer
    pub fn for_layer(layer: &Layer, name: String, action: Action, now: DateTime<Utc>) -> Self {
        let commit = layer
            .annotations
            .last_relevant_commit
            .clone()
            .or_else(|| layer.annotations.last_branch_commit.clone());
        Self {
            metadata: ObjectMeta::new(&layer.metadata.namespace, name)
                .created_at(now)
                .owned_by(Layer::KIND, &layer.metadata.name),
            spec: RunSpec {
                action,
                layer: layer.metadata.name.clone(),
                commit,
            },
            status: RunStatus::default(),
        }
    }

    /// Name for a new run of `action` on `layer`
    pub fn name_for(layer: &str, action: Action, suffix: &str) -> String {
        format!("{}-{}-{}", layer, action, suffix)
    }

    /// Pod of the current attempt
    pub fn current_pod(&self) -> PodRef {
        PodRef::for_attempt(&self.metadata.name, self.status.retries)
    }
}

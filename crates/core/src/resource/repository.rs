// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Repository resource: defaults shared by the layers of one git repository

use super::{ObjectMeta, RemediationStrategy, Resource, RunnerOverride, ToolConfig};
use crate::sync_window::SyncWindow;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Repository {
    pub metadata: ObjectMeta,
    pub spec: RepositorySpec,
    #[serde(default)]
    pub status: RepositoryStatus,
}

impl Resource for Repository {
    const KIND: &'static str = "repositories";

    fn meta(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn meta_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositorySpec {
    pub url: String,
    #[serde(default)]
    pub terraform: ToolConfig,
    #[serde(default)]
    pub opentofu: ToolConfig,
    #[serde(default)]
    pub remediation_strategy: RemediationStrategy,
    #[serde(default)]
    pub runner: RunnerOverride,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keep_last_runs: Option<usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sync_windows: Vec<SyncWindow>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryStatus {
    #[serde(default)]
    pub branches: Vec<BranchStatus>,
}

/// Last known sync state of one branch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchStatus {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_commit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_sync_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_sync_status: String,
}

impl Repository {
    pub fn new(metadata: ObjectMeta, spec: RepositorySpec) -> Self {
        Self {
            metadata,
            spec,
            status: RepositoryStatus::default(),
        }
    }

    pub fn branch(&self, name: &str) -> Option<&BranchStatus> {
        self.status.branches.iter().find(|b| b.name == name)
    }

    /// Record a commit received on a branch
    pub fn record_branch_commit(&mut self, branch: &str, commit: &str, at: DateTime<Utc>) {
        let status = BranchStatus {
            name: branch.to_string(),
            last_commit: Some(commit.to_string()),
            last_sync_date: Some(at),
            last_sync_status: "synced".to_string(),
        };
        match self.status.branches.iter().position(|b| b.name == branch) {
            Some(idx) => self.status.branches[idx] = status,
            None => self.status.branches.push(status),
        }
    }
}

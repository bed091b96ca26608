// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Layer resource: one directory of infrastructure code in a repository

use super::{Action, ObjectMeta, Repository, Resource};
use crate::condition::Condition;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// A directory of Terraform/OpenTofu code, the unit of plan and apply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub metadata: ObjectMeta,
    pub spec: LayerSpec,
    #[serde(default)]
    pub annotations: LayerAnnotations,
    #[serde(default)]
    pub status: LayerStatus,
}

impl Resource for Layer {
    const KIND: &'static str = "layers";

    fn meta(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn meta_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerSpec {
    /// Name of the repository, in the layer's namespace
    pub repository: String,
    /// Path of the layer relative to the repository root
    pub path: String,
    pub branch: String,
    #[serde(default)]
    pub terraform: ToolConfig,
    #[serde(default)]
    pub opentofu: ToolConfig,
    #[serde(default)]
    pub remediation_strategy: RemediationStrategy,
    #[serde(default)]
    pub runner: RunnerOverride,
    /// Overrides the repository retention policy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keep_last_runs: Option<usize>,
}

/// Enablement of one infrastructure tool
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl ToolConfig {
    /// Layer value wins over repository value, field by field
    pub fn merge(layer: &ToolConfig, repo: &ToolConfig) -> ToolConfig {
        ToolConfig {
            enabled: layer.enabled.or(repo.enabled),
            version: layer.version.clone().or_else(|| repo.version.clone()),
        }
    }

    fn is_enabled(&self) -> bool {
        self.enabled.unwrap_or(false)
    }
}

/// The tool a layer runs with, after merging layer and repository settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tool {
    Terraform { version: Option<String> },
    OpenTofu { version: Option<String> },
}

impl Tool {
    pub fn name(&self) -> &'static str {
        match self {
            Tool::Terraform { .. } => "terraform",
            Tool::OpenTofu { .. } => "tofu",
        }
    }

    pub fn version(&self) -> Option<&str> {
        match self {
            Tool::Terraform { version } | Tool::OpenTofu { version } => version.as_deref(),
        }
    }
}

/// Invalid tool selection on a layer
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolError {
    #[error("neither terraform nor opentofu is enabled")]
    NoneEnabled,
    #[error("terraform and opentofu are both enabled")]
    BothEnabled,
}

/// Policy for reacting to drift and failures
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemediationStrategy {
    /// Apply automatically once a plan shows changes; `false` is dry mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_apply: Option<bool>,
    #[serde(default)]
    pub on_error: OnErrorStrategy,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnErrorStrategy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,
}

impl RemediationStrategy {
    pub fn merge(layer: &RemediationStrategy, repo: &RemediationStrategy) -> RemediationStrategy {
        RemediationStrategy {
            auto_apply: layer.auto_apply.or(repo.auto_apply),
            on_error: OnErrorStrategy {
                max_retries: layer.on_error.max_retries.or(repo.on_error.max_retries),
            },
        }
    }

    pub fn is_auto_apply(&self) -> bool {
        self.auto_apply.unwrap_or(false)
    }
}

/// Execution environment overrides for the runner
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunnerOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
}

impl RunnerOverride {
    /// Layer value wins: env keys are overlaid, args and image replace
    pub fn merge(layer: &RunnerOverride, repo: &RunnerOverride) -> RunnerOverride {
        let mut env = repo.env.clone();
        env.extend(layer.env.iter().map(|(k, v)| (k.clone(), v.clone())));
        RunnerOverride {
            image: layer.image.clone().or_else(|| repo.image.clone()),
            env,
            args: if layer.args.is_empty() {
                repo.args.clone()
            } else {
                layer.args.clone()
            },
        }
    }
}

/// Typed tracking data written by runners, git hooks and operators.
///
/// Each field is optional and absence is meaningful: several conditions
/// distinguish "never happened" from any recorded value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerAnnotations {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_plan_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_plan_commit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_plan_checksum: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_apply_checksum: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_branch_commit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_relevant_commit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_failure_date: Option<DateTime<Utc>>,
    /// Manual request to plan now
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub sync_now: bool,
    /// Manual request (approval) to apply now
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub apply_now: bool,
}

impl LayerAnnotations {
    pub fn has_manual_trigger(&self) -> bool {
        self.sync_now || self.apply_now
    }
}

/// Pointer to a run, kept in layer status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRef {
    pub name: String,
    pub action: Action,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayerStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub last_result: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_run: Option<RunRef>,
    #[serde(default)]
    pub latest_runs: Vec<RunRef>,
}

impl Layer {
    pub fn new(metadata: ObjectMeta, spec: LayerSpec) -> Self {
        Self {
            metadata,
            spec,
            annotations: LayerAnnotations::default(),
            status: LayerStatus::default(),
        }
    }

    /// Resolve which tool runs this layer
    pub fn tool(&self, repo: &Repository) -> Result<Tool, ToolError> {
        let terraform = ToolConfig::merge(&self.spec.terraform, &repo.spec.terraform);
        let opentofu = ToolConfig::merge(&self.spec.opentofu, &repo.spec.opentofu);
        match (terraform.is_enabled(), opentofu.is_enabled()) {
            (true, false) => Ok(Tool::Terraform {
                version: terraform.version,
            }),
            (false, true) => Ok(Tool::OpenTofu {
                version: opentofu.version,
            }),
            (true, true) => Err(ToolError::BothEnabled),
            (false, false) => Err(ToolError::NoneEnabled),
        }
    }

    pub fn remediation(&self, repo: &Repository) -> RemediationStrategy {
        RemediationStrategy::merge(
            &self.spec.remediation_strategy,
            &repo.spec.remediation_strategy,
        )
    }

    pub fn runner(&self, repo: &Repository) -> RunnerOverride {
        RunnerOverride::merge(&self.spec.runner, &repo.spec.runner)
    }

    /// History size: layer override, then repository, then the default
    pub fn keep_last_runs(&self, repo: &Repository, default: usize) -> usize {
        self.spec
            .keep_last_runs
            .or(repo.spec.keep_last_runs)
            .unwrap_or(default)
    }
}

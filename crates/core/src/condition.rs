// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Status conditions recorded on layers and runs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Type of a condition, named after the question it answers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConditionType {
    IsPlanArtifactUpToDate,
    IsLastRelevantCommitPlanned,
    IsApplyUpToDate,
    HasFailed,
    IsInFailureGracePeriod,
    HasReachedRetryLimit,
    IsRunning,
}

impl ConditionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConditionType::IsPlanArtifactUpToDate => "IsPlanArtifactUpToDate",
            ConditionType::IsLastRelevantCommitPlanned => "IsLastRelevantCommitPlanned",
            ConditionType::IsApplyUpToDate => "IsApplyUpToDate",
            ConditionType::HasFailed => "HasFailed",
            ConditionType::IsInFailureGracePeriod => "IsInFailureGracePeriod",
            ConditionType::HasReachedRetryLimit => "HasReachedRetryLimit",
            ConditionType::IsRunning => "IsRunning",
        }
    }
}

impl fmt::Display for ConditionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Machine-readable reason behind a condition's value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConditionReason {
    NoPlanHasRunYet,
    SyncNowRequested,
    PlanIsRecent,
    PlanIsStale,
    NoBranchCommitYet,
    NoRelevantCommitYet,
    LastRelevantCommitPlanned,
    LastRelevantCommitNotPlanned,
    ApplyNowRequested,
    NoApplyHasRunYet,
    ApplyIsUpToDate,
    NewPlanNotApplied,
    NoFailureYet,
    LayerHasFailed,
    GracePeriodActive,
    GracePeriodElapsed,
    ManualTriggerOverridesGracePeriod,
    RetryLimitReached,
    RetriesRemaining,
    PodActive,
    PodNotActive,
    RunFinished,
    PodFailed,
    PodNotFailed,
}

/// One timestamped condition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    #[serde(rename = "type")]
    pub kind: ConditionType,
    pub status: bool,
    pub reason: ConditionReason,
    #[serde(default)]
    pub message: String,
    pub last_transition_time: DateTime<Utc>,
}

impl Condition {
    pub fn new(
        kind: ConditionType,
        status: bool,
        reason: ConditionReason,
        message: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            kind,
            status,
            reason,
            message: message.into(),
            last_transition_time: now,
        }
    }
}

/// Find a condition of the given type
pub fn find(conditions: &[Condition], kind: ConditionType) -> Option<&Condition> {
    conditions.iter().find(|c| c.kind == kind)
}

/// Merge freshly evaluated conditions into a recorded list.
///
/// A condition whose status did not change keeps its previous
/// `last_transition_time`; reason and message are always refreshed.
pub fn merge(previous: &[Condition], current: Vec<Condition>) -> Vec<Condition> {
    current
        .into_iter()
        .map(|mut c| {
            if let Some(old) = find(previous, c.kind) {
                if old.status == c.status {
                    c.last_transition_time = old.last_transition_time;
                }
            }
            c
        })
        .collect()
}

#[cfg(test)]
#[path = "condition_tests.rs"]
mod tests;

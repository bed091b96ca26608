// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Layer conditions

use super::Thresholds;
use crate::backoff::backoff;
use crate::clock::{add_duration, until};
use crate::condition::{Condition, ConditionReason, ConditionType};
use crate::resource::Layer;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Whether the last plan is recent enough to trust
pub fn plan_artifact_up_to_date(
    layer: &Layer,
    now: DateTime<Utc>,
    drift_detection: Duration,
) -> Condition {
    let kind = ConditionType::IsPlanArtifactUpToDate;
    let annotations = &layer.annotations;
    let Some(last_plan) = annotations.last_plan_date else {
        return Condition::new(kind, false, ConditionReason::NoPlanHasRunYet, "no plan has run yet", now);
    };
    if annotations.sync_now {
        return Condition::new(kind, false, ConditionReason::SyncNowRequested, "sync requested", now);
    }
    // Unrepresentable expiry means the plan never goes stale
    let fresh = add_duration(last_plan, drift_detection).map_or(true, |expiry| expiry > now);
    if fresh {
        Condition::new(
            kind,
            true,
            ConditionReason::PlanIsRecent,
            format!("last plan at {}", last_plan.to_rfc3339()),
            now,
        )
    } else {
        Condition::new(
            kind,
            false,
            ConditionReason::PlanIsStale,
            format!("last plan at {} is older than the drift interval", last_plan.to_rfc3339()),
            now,
        )
    }
}

/// Whether the newest commit touching the layer has been planned
pub fn last_relevant_commit_planned(layer: &Layer, now: DateTime<Utc>) -> Condition {
    let kind = ConditionType::IsLastRelevantCommitPlanned;
    let annotations = &layer.annotations;
    let Some(planned) = annotations.last_plan_commit.as_deref() else {
        return Condition::new(kind, true, ConditionReason::NoPlanHasRunYet, "no plan has run yet", now);
    };
    if annotations.last_branch_commit.is_none() {
        return Condition::new(kind, true, ConditionReason::NoBranchCommitYet, "no commit received on branch", now);
    }
    let Some(relevant) = annotations.last_relevant_commit.as_deref() else {
        return Condition::new(kind, true, ConditionReason::NoRelevantCommitYet, "no relevant commit received", now);
    };
    if relevant == planned {
        Condition::new(
            kind,
            true,
            ConditionReason::LastRelevantCommitPlanned,
            format!("commit {} is planned", relevant),
            now,
        )
    } else {
        Condition::new(
            kind,
            false,
            ConditionReason::LastRelevantCommitNotPlanned,
            format!("commit {} is not planned (last planned {})", relevant, planned),
            now,
        )
    }
}

/// Whether the last plan has been applied
pub fn apply_up_to_date(layer: &Layer, now: DateTime<Utc>) -> Condition {
    let kind = ConditionType::IsApplyUpToDate;
    let annotations = &layer.annotations;
    let Some(plan_checksum) = annotations.last_plan_checksum.as_deref() else {
        return Condition::new(kind, true, ConditionReason::NoPlanHasRunYet, "no plan has run yet", now);
    };
    if annotations.apply_now {
        return Condition::new(kind, false, ConditionReason::ApplyNowRequested, "apply requested", now);
    }
    match annotations.last_apply_checksum.as_deref() {
        None => Condition::new(kind, false, ConditionReason::NoApplyHasRunYet, "no apply has run yet", now),
        Some(applied) if applied != plan_checksum => Condition::new(
            kind,
            false,
            ConditionReason::NewPlanNotApplied,
            "last plan differs from last apply",
            now,
        ),
        Some(_) => Condition::new(kind, true, ConditionReason::ApplyIsUpToDate, "last plan is applied", now),
    }
}

pub fn has_failed(layer: &Layer, now: DateTime<Utc>) -> Condition {
    let kind = ConditionType::HasFailed;
    match layer.annotations.failure_count {
        None | Some(0) => Condition::new(kind, false, ConditionReason::NoFailureYet, "", now),
        Some(n) => Condition::new(
            kind,
            true,
            ConditionReason::LayerHasFailed,
            format!("{} consecutive failures", n),
            now,
        ),
    }
}

/// Whether the layer is backing off after failures.
///
/// Returns the condition and the time left in the grace period (zero when
/// not in one).
pub fn in_failure_grace_period(
    layer: &Layer,
    now: DateTime<Utc>,
    grace: Duration,
) -> (Condition, Duration) {
    let kind = ConditionType::IsInFailureGracePeriod;
    let annotations = &layer.annotations;
    let count = match annotations.failure_count {
        None | Some(0) => {
            return (
                Condition::new(kind, false, ConditionReason::NoFailureYet, "", now),
                Duration::ZERO,
            )
        }
        Some(n) => n,
    };
    if annotations.has_manual_trigger() {
        return (
            Condition::new(
                kind,
                false,
                ConditionReason::ManualTriggerOverridesGracePeriod,
                "manual trigger set",
                now,
            ),
            Duration::ZERO,
        );
    }
    let Some(failed_at) = annotations.last_failure_date else {
        return (
            Condition::new(kind, false, ConditionReason::GracePeriodElapsed, "no failure date recorded", now),
            Duration::ZERO,
        );
    };

    let wait = backoff(grace, count);
    let remaining = match add_duration(failed_at, wait) {
        Some(end) if end > now => until(now, end),
        Some(_) => Duration::ZERO,
        None => Duration::MAX,
    };
    if remaining > Duration::ZERO {
        (
            Condition::new(
                kind,
                true,
                ConditionReason::GracePeriodActive,
                format!("retrying in {}s", remaining.as_secs()),
                now,
            ),
            remaining,
        )
    } else {
        (
            Condition::new(kind, false, ConditionReason::GracePeriodElapsed, "", now),
            Duration::ZERO,
        )
    }
}

/// All layer conditions evaluated at one instant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerConditions {
    pub plan_up_to_date: Condition,
    pub commit_planned: Condition,
    pub apply_up_to_date: Condition,
    pub has_failed: Condition,
    pub in_grace_period: Condition,
    pub grace_remaining: Duration,
}

impl LayerConditions {
    pub fn evaluate(layer: &Layer, now: DateTime<Utc>, thresholds: &Thresholds) -> Self {
        let (in_grace_period, grace_remaining) =
            in_failure_grace_period(layer, now, thresholds.failure_grace_period);
        Self {
            plan_up_to_date: plan_artifact_up_to_date(layer, now, thresholds.drift_detection),
            commit_planned: last_relevant_commit_planned(layer, now),
            apply_up_to_date: apply_up_to_date(layer, now),
            has_failed: has_failed(layer, now),
            in_grace_period,
            grace_remaining,
        }
    }

    pub fn to_vec(&self) -> Vec<Condition> {
        vec![
            self.plan_up_to_date.clone(),
            self.commit_planned.clone(),
            self.apply_up_to_date.clone(),
            self.has_failed.clone(),
            self.in_grace_period.clone(),
        ]
    }
}

#[cfg(test)]
#[path = "layer_tests.rs"]
mod tests;

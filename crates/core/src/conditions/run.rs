// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run conditions

use crate::backoff::backoff;
use crate::clock::{add_duration, until};
use crate::condition::{Condition, ConditionReason, ConditionType};
use crate::resource::{PodPhase, Run};
use chrono::{DateTime, Utc};
use std::time::Duration;

pub fn has_reached_retry_limit(run: &Run, max_retries: u32, now: DateTime<Utc>) -> Condition {
    let kind = ConditionType::HasReachedRetryLimit;
    let retries = run.status.retries;
    if retries >= max_retries {
        Condition::new(
            kind,
            true,
            ConditionReason::RetryLimitReached,
            format!("{} of {} retries used", retries, max_retries),
            now,
        )
    } else {
        Condition::new(
            kind,
            false,
            ConditionReason::RetriesRemaining,
            format!("{} of {} retries used", retries, max_retries),
            now,
        )
    }
}

pub fn is_running(run: &Run, phase: PodPhase, now: DateTime<Utc>) -> Condition {
    let kind = ConditionType::IsRunning;
    if !run.status.state.is_active() {
        return Condition::new(kind, false, ConditionReason::RunFinished, "", now);
    }
    if phase.is_active() {
        Condition::new(kind, true, ConditionReason::PodActive, format!("pod is {}", phase), now)
    } else {
        Condition::new(kind, false, ConditionReason::PodNotActive, format!("pod is {}", phase), now)
    }
}

/// Whether a failed pod is still backing off before the next attempt.
///
/// Returns the condition and the time left. A failed pod with no recorded
/// failure date is not in grace; the reconciler records the date first.
pub fn in_run_grace_period(
    run: &Run,
    phase: PodPhase,
    grace: Duration,
    now: DateTime<Utc>,
) -> (Condition, Duration) {
    let kind = ConditionType::IsInFailureGracePeriod;
    if phase != PodPhase::Failed {
        return (
            Condition::new(kind, false, ConditionReason::PodNotFailed, "", now),
            Duration::ZERO,
        );
    }
    let Some(failed_at) = run.status.last_failure_date else {
        return (
            Condition::new(kind, false, ConditionReason::PodFailed, "failure not yet recorded", now),
            Duration::ZERO,
        );
    };
    let remaining = match add_duration(failed_at, backoff(grace, run.status.retries)) {
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
                format!("next attempt in {}s", remaining.as_secs()),
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

/// All run conditions evaluated at one instant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConditions {
    pub retry_limit: Condition,
    pub running: Condition,
    pub in_grace_period: Condition,
    pub grace_remaining: Duration,
}

impl RunConditions {
    pub fn evaluate(
        run: &Run,
        phase: PodPhase,
        max_retries: u32,
        grace: Duration,
        now: DateTime<Utc>,
    ) -> Self {
        let (in_grace_period, grace_remaining) = in_run_grace_period(run, phase, grace, now);
        Self {
            retry_limit: has_reached_retry_limit(run, max_retries, now),
            running: is_running(run, phase, now),
            in_grace_period,
            grace_remaining,
        }
    }

    pub fn to_vec(&self) -> Vec<Condition> {
        vec![
            self.retry_limit.clone(),
            self.running.clone(),
            self.in_grace_period.clone(),
        ]
    }
}

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;

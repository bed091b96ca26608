// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Condition evaluators
//!
//! Each evaluator is a pure function of a resource, the current time and a
//! few thresholds. The state machines combine their boolean results; the
//! full [`Condition`](crate::condition::Condition) values are recorded in
//! status so operators can see why a decision was made.

mod layer;
mod run;

pub use layer::{
    apply_up_to_date, has_failed, in_failure_grace_period, last_relevant_commit_planned,
    plan_artifact_up_to_date, LayerConditions,
};
pub use run::{has_reached_retry_limit, in_run_grace_period, is_running, RunConditions};

use std::time::Duration;

/// Time thresholds the evaluators compare against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    /// How long a plan stays fresh before drift detection replans
    pub drift_detection: Duration,
    /// Base of the failure backoff
    pub failure_grace_period: Duration,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            drift_detection: Duration::from_secs(20 * 60),
            failure_grace_period: Duration::from_secs(15),
        }
    }
}

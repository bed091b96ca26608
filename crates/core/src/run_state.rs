// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run state machine
//!
//! A run tracks one plan or apply through its execution pods. Each
//! observation of the current pod's phase drives one pure transition; the
//! engine executes the returned effects and persists the new status.

use crate::backoff::backoff;
use crate::clock::Clock;
use crate::condition;
use crate::conditions::RunConditions;
use crate::effect::{Effect, Event};
use crate::resource::{PodPhase, PodRef, Run};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// The state of a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RunState {
    /// Created, first pod not yet observed
    #[default]
    Initial,
    Running,
    /// A failed attempt was replaced by a new pod
    Retrying,
    Succeeded,
    Failed,
}

impl RunState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunState::Initial => "Initial",
            RunState::Running => "Running",
            RunState::Retrying => "Retrying",
            RunState::Succeeded => "Succeeded",
            RunState::Failed => "Failed",
        }
    }

    /// States in which a pod may still be executing
    pub fn is_active(&self) -> bool {
        matches!(self, RunState::Initial | RunState::Running | RunState::Retrying)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Succeeded | RunState::Failed)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RunState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Initial" => Ok(RunState::Initial),
            "Running" => Ok(RunState::Running),
            "Retrying" => Ok(RunState::Retrying),
            "Succeeded" => Ok(RunState::Succeeded),
            "Failed" => Ok(RunState::Failed),
            _ => Err(format!("unknown run state: {}", s)),
        }
    }
}

/// Retry policy resolved for one run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunPolicy {
    pub max_retries: u32,
    /// Base of the retry backoff
    pub grace: Duration,
    /// How often to look at an active pod
    pub poll_interval: Duration,
}

impl Run {
    /// Pure transition on an observed pod phase.
    ///
    /// `phase` is `None` when the current pod does not exist, which is
    /// treated as a failed attempt.
    pub fn transition(
        &self,
        phase: Option<PodPhase>,
        policy: &RunPolicy,
        clock: &impl Clock,
    ) -> (Run, Vec<Effect>) {
        if self.status.state.is_terminal() {
            return (self.clone(), vec![]);
        }

        let now = clock.now();
        let phase = phase.unwrap_or(PodPhase::Failed);
        let evaluated = RunConditions::evaluate(self, phase, policy.max_retries, policy.grace, now);
        let mut run = self.clone();
        run.status.conditions = condition::merge(&self.status.conditions, evaluated.to_vec());

        match phase {
            PodPhase::Pending | PodPhase::Running => {
                run.status.state = RunState::Running;
                (run, vec![Effect::Requeue(policy.poll_interval)])
            }

            PodPhase::Succeeded => {
                run.status.state = RunState::Succeeded;
                let effects = vec![
                    Effect::ReleaseLock,
                    Effect::RecordLayerSuccess,
                    Effect::Emit(Event::RunCompleted {
                        namespace: self.metadata.namespace.clone(),
                        layer: self.spec.layer.clone(),
                        run: self.metadata.name.clone(),
                        action: self.spec.action,
                    }),
                ];
                (run, effects)
            }

            // Out of retries: terminal
            PodPhase::Failed if evaluated.retry_limit.status => {
                run.status.state = RunState::Failed;
                run.status.last_failure_date.get_or_insert(now);
                let effects = vec![
                    Effect::ReleaseLock,
                    Effect::RecordLayerFailure,
                    Effect::Emit(Event::RunFailed {
                        namespace: self.metadata.namespace.clone(),
                        layer: self.spec.layer.clone(),
                        run: self.metadata.name.clone(),
                        action: self.spec.action,
                        retries: self.status.retries,
                    }),
                ];
                (run, effects)
            }

            // First sight of this failure: start the grace period
            PodPhase::Failed if self.status.last_failure_date.is_none() => {
                run.status.last_failure_date = Some(now);
                let wait = backoff(policy.grace, self.status.retries);
                (run, vec![Effect::Requeue(wait)])
            }

            PodPhase::Failed if evaluated.in_grace_period.status => {
                (run, vec![Effect::Requeue(evaluated.grace_remaining)])
            }

            // Grace elapsed: next attempt
            PodPhase::Failed => {
                let attempt = self.status.retries.saturating_add(1);
                run.status.state = RunState::Retrying;
                run.status.retries = attempt;
                run.status.last_failure_date = None;
                run.status.last_attempt_date = Some(now);
                run.status.pod = Some(PodRef::for_attempt(&self.metadata.name, attempt));
                let effects = vec![
                    Effect::LaunchPod { attempt },
                    Effect::Emit(Event::RunRetrying {
                        namespace: self.metadata.namespace.clone(),
                        run: self.metadata.name.clone(),
                        attempt,
                    }),
                    Effect::Requeue(policy.poll_interval),
                ];
                (run, effects)
            }
        }
    }
}

#[cfg(test)]
#[path = "run_state_tests.rs"]
mod tests;

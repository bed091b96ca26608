// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Layer state machine
//!
//! A layer's state is never stored as the source of truth: it is derived
//! on every reconciliation from conditions over the layer's annotations.
//! `decide` picks the state and `handle` turns it into effects.

use crate::clock::Clock;
use crate::conditions::{LayerConditions, Thresholds};
use crate::effect::{Effect, Event};
use crate::resource::{Action, Layer};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LayerState {
    Idle,
    PlanNeeded,
    ApplyNeeded,
    FailureGracePeriod,
}

impl LayerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LayerState::Idle => "Idle",
            LayerState::PlanNeeded => "PlanNeeded",
            LayerState::ApplyNeeded => "ApplyNeeded",
            LayerState::FailureGracePeriod => "FailureGracePeriod",
        }
    }
}

impl fmt::Display for LayerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LayerState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Idle" => Ok(LayerState::Idle),
            "PlanNeeded" => Ok(LayerState::PlanNeeded),
            "ApplyNeeded" => Ok(LayerState::ApplyNeeded),
            "FailureGracePeriod" => Ok(LayerState::FailureGracePeriod),
            _ => Err(format!("unknown layer state: {}", s)),
        }
    }
}

/// Select the layer state from evaluated conditions
pub fn decide(conditions: &LayerConditions) -> LayerState {
    let plan_fresh = conditions.plan_up_to_date.status;
    let apply_fresh = conditions.apply_up_to_date.status;
    let commit_planned = conditions.commit_planned.status;

    if conditions.in_grace_period.status {
        LayerState::FailureGracePeriod
    } else if plan_fresh && apply_fresh {
        LayerState::Idle
    } else if !plan_fresh || !commit_planned {
        LayerState::PlanNeeded
    } else {
        LayerState::ApplyNeeded
    }
}

/// Inputs a state handler needs besides the conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandlerContext {
    /// Merged remediation `auto_apply`
    pub auto_apply: bool,
    /// Manual apply approval on the layer
    pub apply_now: bool,
    pub drift_detection: Duration,
    pub grace_remaining: Duration,
}

impl LayerState {
    /// Effects for this state. Launch outcomes (lock contention, launch
    /// failure, success) pick their own requeue in the engine.
    pub fn handle(&self, ctx: &HandlerContext) -> Vec<Effect> {
        match self {
            LayerState::FailureGracePeriod => vec![Effect::Requeue(ctx.grace_remaining)],
            LayerState::Idle => vec![Effect::Requeue(ctx.drift_detection)],
            LayerState::PlanNeeded => vec![Effect::LaunchRun {
                action: Action::Plan,
            }],
            // Dry mode: wait for an approval or the next drift check
            LayerState::ApplyNeeded if !ctx.auto_apply && !ctx.apply_now => {
                vec![Effect::Requeue(ctx.drift_detection)]
            }
            LayerState::ApplyNeeded => vec![Effect::LaunchRun {
                action: Action::Apply,
            }],
        }
    }
}

/// Outcome of evaluating a layer at one instant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerDecision {
    pub state: LayerState,
    pub conditions: LayerConditions,
    pub effects: Vec<Effect>,
}

impl Layer {
    /// Evaluate conditions, pick a state and produce its effects
    pub fn decide(
        &self,
        thresholds: &Thresholds,
        auto_apply: bool,
        clock: &impl Clock,
    ) -> LayerDecision {
        let conditions = LayerConditions::evaluate(self, clock.now(), thresholds);
        let state = decide(&conditions);
        let ctx = HandlerContext {
            auto_apply,
            apply_now: self.annotations.apply_now,
            drift_detection: thresholds.drift_detection,
            grace_remaining: conditions.grace_remaining,
        };

        let mut effects = Vec::new();
        if self.status.state != state.as_str() {
            effects.push(Effect::Emit(Event::LayerStateChanged {
                namespace: self.metadata.namespace.clone(),
                layer: self.metadata.name.clone(),
                from: self.status.state.clone(),
                to: state.to_string(),
            }));
        }
        effects.extend(state.handle(&ctx));

        LayerDecision {
            state,
            conditions,
            effects,
        }
    }
}

#[cfg(test)]
#[path = "layer_state_tests.rs"]
mod tests;

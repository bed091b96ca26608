// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Effects and events for state machine orchestration
//!
//! The layer and run state machines never touch the store, the lock or the
//! launcher. They return effects, and the engine executes them.

use crate::resource::Action;
use crate::sync_window::BlockReason;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Effects are side effects that state machines request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Emit an event for other components to observe
    Emit(Event),
    /// Acquire the layer lock and launch a new run for `action`
    LaunchRun { action: Action },
    /// Submit the pod for the given attempt of the current run
    LaunchPod { attempt: u32 },
    /// Release the layer lock held by the current run
    ReleaseLock,
    /// Reset the owning layer's failure count
    RecordLayerSuccess,
    /// Increment the owning layer's failure count and stamp the failure time
    RecordLayerFailure,
    /// Reconcile again after the delay
    Requeue(Duration),
}

/// Events emitted by state machines
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    RunCreated {
        namespace: String,
        layer: String,
        run: String,
        action: Action,
    },
    RunCompleted {
        namespace: String,
        layer: String,
        run: String,
        action: Action,
    },
    RunFailed {
        namespace: String,
        layer: String,
        run: String,
        action: Action,
        retries: u32,
    },
    RunRetrying {
        namespace: String,
        run: String,
        attempt: u32,
    },
    LayerStateChanged {
        namespace: String,
        layer: String,
        from: String,
        to: String,
    },
    LockContention {
        namespace: String,
        layer: String,
        owner: String,
    },
    LayerInvalid {
        namespace: String,
        layer: String,
        reason: String,
    },
    SyncBlocked {
        namespace: String,
        layer: String,
        action: Action,
        reason: BlockReason,
    },
}

impl Event {
    /// Get the event name for pattern matching and metrics
    pub fn name(&self) -> String {
        match self {
            Event::RunCreated { .. } => "run:created".to_string(),
            Event::RunCompleted { .. } => "run:completed".to_string(),
            Event::RunFailed { .. } => "run:failed".to_string(),
            Event::RunRetrying { .. } => "run:retrying".to_string(),
            Event::LayerStateChanged { .. } => "layer:state".to_string(),
            Event::LockContention { .. } => "layer:lock:contention".to_string(),
            Event::LayerInvalid { .. } => "layer:invalid".to_string(),
            Event::SyncBlocked { .. } => "layer:sync:blocked".to_string(),
        }
    }
}

#[cfg(test)]
#[path = "effect_tests.rs"]
mod tests;

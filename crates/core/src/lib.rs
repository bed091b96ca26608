// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! strata-core: domain model and decision logic for the Strata controller
//!
//! This crate provides:
//! - Resource types for repositories, layers, runs and locks
//! - Pure condition evaluators and state machines for layers and runs
//! - Backoff arithmetic and sync window evaluation
//! - Effect-based orchestration and controller configuration

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod clock;
pub mod id;

pub mod backoff;
pub mod condition;
pub mod conditions;
pub mod config;
pub mod effect;
pub mod history;
pub mod resource;
pub mod sync_window;

// State machines
pub mod layer_state;
pub mod run_state;

// Re-exports
pub use backoff::backoff;
pub use clock::{Clock, FakeClock, SystemClock};
pub use condition::{Condition, ConditionReason, ConditionType};
pub use conditions::{LayerConditions, RunConditions, Thresholds};
pub use config::{Config, ConfigError};
pub use effect::{Effect, Event};
pub use id::{IdGen, SequentialIdGen, UuidIdGen};
pub use layer_state::{LayerDecision, LayerState};
pub use resource::{
    Action, Layer, LayerAnnotations, LayerLock, LayerStatus, LockKey, ObjectKey, ObjectMeta,
    PodPhase, PodRef, Repository, Resource, Run, RunRef, Tool, ToolError,
};
pub use run_state::{RunPolicy, RunState};
pub use sync_window::{is_sync_blocked, windows_for_action, BlockReason, SyncVerdict, SyncWindow};

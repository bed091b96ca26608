// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Strata reconciliation engine

mod controller;
mod error;
mod layer;
mod lock;
mod reconciler;
mod run;
mod scheduler;

pub use controller::{Controller, ControllerConfig};
pub use error::ReconcileError;
pub use layer::PLAN_SUMMARY_UNAVAILABLE;
pub use lock::{lock_key_for, LockError, LockManager};
pub use reconciler::{EngineConfig, EngineDeps, Outcome, Reconciler};
pub use scheduler::{RequeueQueue, WorkKey};

#[cfg(test)]
mod test_helpers;

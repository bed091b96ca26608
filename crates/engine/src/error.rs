// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for reconciliation

use crate::lock::LockError;
use std::time::Duration;
use strata_adapters::{ArtifactError, LaunchError};
use strata_core::ObjectKey;
use strata_storage::StoreError;
use thiserror::Error;

/// Errors that abort one reconciliation; the controller requeues the key
/// after the error interval
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("launch error: {0}")]
    Launch(#[from] LaunchError),
    #[error("artifact error: {0}")]
    Artifact(#[from] ArtifactError),
    #[error("lock error: {0}")]
    Lock(#[from] LockError),
    #[error("repository not found: {0}")]
    RepositoryNotFound(ObjectKey),
    #[error("{operation} exceeded the reconcile deadline of {deadline:?}")]
    Deadline {
        operation: &'static str,
        deadline: Duration,
    },
}

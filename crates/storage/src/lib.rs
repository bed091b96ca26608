// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Resource stores
//!
//! A store holds typed resources keyed by kind, namespace and name. Every
//! successful write bumps `resource_version`; `update` succeeds only if the
//! caller's version matches the stored one.

mod fs;
mod memory;
mod retry;

pub use fs::FsStore;
pub use memory::MemoryStore;
pub use retry::{find, update_with_retry, DEFAULT_UPDATE_ATTEMPTS};

use async_trait::async_trait;
use strata_core::{ObjectKey, Resource};
use thiserror::Error;

/// Errors from resource store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{kind} {key} not found")]
    NotFound { kind: &'static str, key: ObjectKey },
    #[error("{kind} {key} already exists")]
    AlreadyExists { kind: &'static str, key: ObjectKey },
    #[error("{kind} {key} was modified (expected version {expected}, found {actual})")]
    Conflict {
        kind: &'static str,
        key: ObjectKey,
        expected: u64,
        actual: u64,
    },
    #[error("invalid object name: {0:?}")]
    InvalidName(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, StoreError::AlreadyExists { .. })
    }
}

/// Typed resource storage with optimistic concurrency
#[async_trait]
pub trait ResourceStore: Clone + Send + Sync + 'static {
    /// Fetch one object
    async fn get<R: Resource>(&self, key: &ObjectKey) -> Result<R, StoreError>;

    /// List objects of a kind, in one namespace or all of them, sorted by key
    async fn list<R: Resource>(&self, namespace: Option<&str>) -> Result<Vec<R>, StoreError>;

    /// Create an object; fails with `AlreadyExists` if the key is taken.
    /// Returns the stored object with its new version.
    async fn create<R: Resource>(&self, object: R) -> Result<R, StoreError>;

    /// Replace an object if its version matches the stored one
    async fn update<R: Resource>(&self, object: R) -> Result<R, StoreError>;

    /// Delete an object; fails with `NotFound` if absent
    async fn delete<R: Resource>(&self, key: &ObjectKey) -> Result<(), StoreError>;
}

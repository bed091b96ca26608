// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Layer lock: the exclusivity token guarding plan/apply on one path
//!
//! The key is derived from (repository, path) rather than the layer name, so
//! two layers pointing at the same directory share one lock.

use super::{ObjectMeta, Resource};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Deterministic identity of a lock
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LockKey(pub String);

impl LockKey {
    pub fn for_layer(repo_namespace: &str, repo_name: &str, path: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(repo_namespace.as_bytes());
        hasher.update(b"/");
        hasher.update(repo_name.as_bytes());
        hasher.update(b":");
        hasher.update(path.trim_matches('/').as_bytes());
        let digest = hasher.finalize();
        // First 16 hex chars are plenty to tell layers apart
        Self(hex_encode(&digest[..8]))
    }

    /// Name of the lock object in the store
    pub fn object_name(&self) -> String {
        format!("layer-lock-{}", self.0)
    }
}

impl fmt::Display for LockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Stored lock object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerLock {
    pub metadata: ObjectMeta,
    pub key: LockKey,
    /// Run that requested the lock
    pub owner: String,
    pub acquired_at: DateTime<Utc>,
}

impl Resource for LayerLock {
    const KIND: &'static str = "locks";

    fn meta(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn meta_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }
}

impl LayerLock {
    pub fn new(namespace: &str, key: LockKey, owner: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            metadata: ObjectMeta::new(namespace, key.object_name()).created_at(now),
            key,
            owner: owner.into(),
            acquired_at: now,
        }
    }
}

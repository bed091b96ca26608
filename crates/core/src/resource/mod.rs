// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persisted resource types
//!
//! Every resource carries an [`ObjectMeta`] whose `resource_version` is bumped
//! by the store on each write. Updates are conditional on the version the
//! caller read, which is the only concurrency control the engine relies on.

mod layer;
mod lock;
mod repository;
mod run;

pub use layer::{
    Layer, LayerAnnotations, LayerSpec, LayerStatus, OnErrorStrategy, RemediationStrategy,
    RunRef, RunnerOverride, Tool, ToolConfig, ToolError,
};
pub use lock::{LayerLock, LockKey};
pub use repository::{BranchStatus, Repository, RepositorySpec, RepositoryStatus};
pub use run::{Action, PodPhase, PodRef, Run, RunSpec, RunStatus};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Namespace used when none is given
pub const DEFAULT_NAMESPACE: &str = "default";

/// Reference to the object that owns another object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerRef {
    pub kind: String,
    pub name: String,
}

/// Identity and bookkeeping shared by all resources
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMeta {
    pub name: String,
    #[serde(default = "default_namespace")]
    pub namespace: String,
    /// Bumped by the store on every successful write
    #[serde(default)]
    pub resource_version: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<OwnerRef>,
}

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

impl ObjectMeta {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            resource_version: 0,
            creation_timestamp: None,
            owner: None,
        }
    }

    pub fn created_at(mut self, at: DateTime<Utc>) -> Self {
        self.creation_timestamp = Some(at);
        self
    }

    pub fn owned_by(mut self, kind: impl Into<String>, name: impl Into<String>) -> Self {
        self.owner = Some(OwnerRef {
            kind: kind.into(),
            name: name.into(),
        });
        self
    }

    pub fn key(&self) -> ObjectKey {
        ObjectKey::new(&self.namespace, &self.name)
    }

    /// Check whether this object is owned by the given kind/name
    pub fn is_owned_by(&self, kind: &str, name: &str) -> bool {
        matches!(&self.owner, Some(o) if o.kind == kind && o.name == name)
    }
}

/// A typed object that can be held by a resource store
pub trait Resource: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Plural kind name, used as the storage collection
    const KIND: &'static str;

    fn meta(&self) -> &ObjectMeta;
    fn meta_mut(&mut self) -> &mut ObjectMeta;

    fn key(&self) -> ObjectKey {
        self.meta().key()
    }
}

/// Namespaced name of an object
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectKey {
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Parse `namespace/name`, falling back to the default namespace
    pub fn parse(s: &str) -> Self {
        match s.split_once('/') {
            Some((namespace, name)) => Self::new(namespace, name),
            None => Self::new(DEFAULT_NAMESPACE, s),
        }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

#[cfg(test)]
#[path = "resource_tests.rs"]
mod tests;

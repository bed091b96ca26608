// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory resource store

use crate::{ResourceStore, StoreError};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use strata_core::{ObjectKey, Resource};

type Slot = (&'static str, ObjectKey);

#[derive(Default)]
struct Inner {
    objects: BTreeMap<Slot, serde_json::Value>,
    /// Number of upcoming updates to reject with a conflict
    injected_conflicts: u32,
}

/// Process-local store
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` updates fail with a conflict
    pub fn inject_conflicts(&self, count: u32) {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).injected_conflicts = count;
    }

    /// Number of stored objects of a kind
    pub fn count(&self, kind: &str) -> usize {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.objects.keys().filter(|(k, _)| *k == kind).count()
    }
}

fn stored_version(value: &serde_json::Value) -> u64 {
    value
        .pointer("/metadata/resource_version")
        .and_then(|v| v.as_u64())
        .unwrap_or(0)
}

#[async_trait]
impl ResourceStore for MemoryStore {
    async fn get<R: Resource>(&self, key: &ObjectKey) -> Result<R, StoreError> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        match inner.objects.get(&(R::KIND, key.clone())) {
            Some(value) => Ok(serde_json::from_value(value.clone())?),
            None => Err(StoreError::NotFound {
                kind: R::KIND,
                key: key.clone(),
            }),
        }
    }

    async fn list<R: Resource>(&self, namespace: Option<&str>) -> Result<Vec<R>, StoreError> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner
            .objects
            .iter()
            .filter(|((kind, key), _)| {
                *kind == R::KIND && namespace.map_or(true, |ns| key.namespace == ns)
            })
            .map(|(_, value)| serde_json::from_value(value.clone()).map_err(StoreError::from))
            .collect()
    }

    async fn create<R: Resource>(&self, mut object: R) -> Result<R, StoreError> {
        let key = object.key();
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let slot = (R::KIND, key.clone());
        if inner.objects.contains_key(&slot) {
            return Err(StoreError::AlreadyExists { kind: R::KIND, key });
        }
        object.meta_mut().resource_version = 1;
        inner.objects.insert(slot, serde_json::to_value(&object)?);
        Ok(object)
    }

    async fn update<R: Resource>(&self, mut object: R) -> Result<R, StoreError> {
        let key = object.key();
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let slot = (R::KIND, key.clone());
        let actual = match inner.objects.get(&slot) {
            Some(value) => stored_version(value),
            None => return Err(StoreError::NotFound { kind: R::KIND, key }),
        };
        let expected = object.meta().resource_version;
        if inner.injected_conflicts > 0 {
            inner.injected_conflicts -= 1;
            return Err(StoreError::Conflict {
                kind: R::KIND,
                key,
                expected,
                actual: actual + 1,
            });
        }
        if expected != actual {
            return Err(StoreError::Conflict {
                kind: R::KIND,
                key,
                expected,
                actual,
            });
        }
        object.meta_mut().resource_version = actual + 1;
        inner.objects.insert(slot, serde_json::to_value(&object)?);
        Ok(object)
    }

    async fn delete<R: Resource>(&self, key: &ObjectKey) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        match inner.objects.remove(&(R::KIND, key.clone())) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound {
                kind: R::KIND,
                key: key.clone(),
            }),
        }
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Layer lock manager
//!
//! Locks are plain objects in the resource store. Atomic create is the only
//! exclusion primitive: whoever creates the object holds the lock.

use chrono::{DateTime, Utc};
use std::time::Duration;
use strata_core::{Layer, LayerLock, LockKey, ObjectKey, Repository, Run};
use strata_storage::{find, ResourceStore, StoreError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LockError {
    #[error("layer lock {key} is held by {owner}")]
    Contention { key: LockKey, owner: String },
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Clone)]
pub struct LockManager<S> {
    store: S,
}

/// Lock guarding a layer: one per (repository, path)
pub fn lock_key_for(layer: &Layer, repo: &Repository) -> LockKey {
    LockKey::for_layer(&repo.metadata.namespace, &repo.metadata.name, &layer.spec.path)
}

fn object_key(namespace: &str, key: &LockKey) -> ObjectKey {
    ObjectKey::new(namespace, key.object_name())
}

impl<S: ResourceStore> LockManager<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub async fn is_locked(&self, namespace: &str, key: &LockKey) -> Result<bool, LockError> {
        Ok(self.holder(namespace, key).await?.is_some())
    }

    /// Current lock object, if any
    pub async fn holder(
        &self,
        namespace: &str,
        key: &LockKey,
    ) -> Result<Option<LayerLock>, LockError> {
        Ok(find(&self.store, &object_key(namespace, key)).await?)
    }

    /// Take the lock for `owner`; fails with `Contention` if anyone holds it
    pub async fn create_lock(
        &self,
        namespace: &str,
        key: &LockKey,
        owner: &str,
        now: DateTime<Utc>,
    ) -> Result<(), LockError> {
        let lock = LayerLock::new(namespace, key.clone(), owner, now);
        match self.store.create(lock).await {
            Ok(_) => {
                tracing::debug!(namespace, %key, owner, "lock acquired");
                Ok(())
            }
            Err(e) if e.is_already_exists() => {
                let owner = self
                    .holder(namespace, key)
                    .await?
                    .map(|l| l.owner)
                    .unwrap_or_default();
                Err(LockError::Contention {
                    key: key.clone(),
                    owner,
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Release the lock held by `owner`. A missing lock is fine; a lock held
    /// by someone else is left alone.
    pub async fn delete_lock(
        &self,
        namespace: &str,
        key: &LockKey,
        owner: &str,
    ) -> Result<(), LockError> {
        let Some(lock) = self.holder(namespace, key).await? else {
            return Ok(());
        };
        if lock.owner != owner {
            tracing::warn!(namespace, %key, owner, holder = %lock.owner, "not releasing lock held by another run");
            return Ok(());
        }
        match self.store.delete::<LayerLock>(&object_key(namespace, key)).await {
            Ok(()) => {
                tracing::debug!(namespace, %key, owner, "lock released");
                Ok(())
            }
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete the lock if the run owning it is gone and the lock is older
    /// than `min_age`. Returns the lock still in place, if any.
    ///
    /// A lock outlives its run when the controller stops between taking the
    /// lock and creating the run, or when a running run is deleted.
    pub async fn reclaim_orphan(
        &self,
        namespace: &str,
        key: &LockKey,
        now: DateTime<Utc>,
        min_age: Duration,
    ) -> Result<Option<LayerLock>, LockError> {
        let Some(lock) = self.holder(namespace, key).await? else {
            return Ok(None);
        };
        let owner = ObjectKey::new(namespace, &lock.owner);
        if find::<S, Run>(&self.store, &owner).await?.is_some() {
            return Ok(Some(lock));
        }
        let age = (now - lock.acquired_at).to_std().unwrap_or_default();
        if age < min_age {
            return Ok(Some(lock));
        }

        tracing::warn!(namespace, %key, owner = %lock.owner, ?age, "reclaiming lock of missing run");
        self.delete_lock(namespace, key, &lock.owner).await?;
        Ok(None)
    }

    /// Release every lock in the namespace held by `owner`
    pub async fn release_owned_by(&self, namespace: &str, owner: &str) -> Result<usize, LockError> {
        let locks: Vec<LayerLock> = self.store.list(Some(namespace)).await?;
        let mut released = 0;
        for lock in locks.into_iter().filter(|l| l.owner == owner) {
            self.delete_lock(namespace, &lock.key, owner).await?;
            released += 1;
        }
        Ok(released)
    }
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Helpers on top of [`ResourceStore`]

use crate::{ResourceStore, StoreError};
use strata_core::{ObjectKey, Resource};

/// Attempts made by [`update_with_retry`] before giving up on conflicts
pub const DEFAULT_UPDATE_ATTEMPTS: u32 = 5;

/// Fetch an object, mapping `NotFound` to `None`
pub async fn find<S: ResourceStore, R: Resource>(
    store: &S,
    key: &ObjectKey,
) -> Result<Option<R>, StoreError> {
    match store.get::<R>(key).await {
        Ok(object) => Ok(Some(object)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

/// Apply `mutate` to the latest version of an object and write it back.
///
/// On a version conflict the object is re-fetched and `mutate` re-applied,
/// up to `attempts` times in total.
pub async fn update_with_retry<S, R, F>(
    store: &S,
    key: &ObjectKey,
    attempts: u32,
    mut mutate: F,
) -> Result<R, StoreError>
where
    S: ResourceStore,
    R: Resource,
    F: FnMut(&mut R) + Send,
{
    let mut attempt = 1;
    loop {
        let mut object: R = store.get(key).await?;
        mutate(&mut object);
        match store.update(object).await {
            Err(e) if e.is_conflict() && attempt < attempts => {
                tracing::debug!(kind = R::KIND, %key, attempt, "update conflict, retrying");
                attempt += 1;
            }
            result => return result,
        }
    }
}

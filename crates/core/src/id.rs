// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Name suffix generation for runs

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Generates unique name suffixes
pub trait IdGen: Clone + Send + Sync + 'static {
    fn next(&self) -> String;
}

const SUFFIX_LEN: usize = 12;

/// UUID-based generator for production use.
///
/// Yields the first twelve hex characters (48 bits) of a v4 UUID.
#[derive(Clone, Default)]
pub struct UuidIdGen;

impl IdGen for UuidIdGen {
    fn next(&self) -> String {
        let mut id = uuid::Uuid::new_v4().simple().to_string();
        id.truncate(SUFFIX_LEN);
        id
    }
}

/// Sequential generator for testing
#[derive(Clone)]
pub struct SequentialIdGen {
    prefix: String,
    counter: Arc<AtomicU64>,
}

impl SequentialIdGen {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: Arc::new(AtomicU64::new(1)),
        }
    }
}

impl Default for SequentialIdGen {
    fn default() -> Self {
        Self::new("id")
    }
}

impl IdGen for SequentialIdGen {
    fn next(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        format!("{}{}", self.prefix, n)
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;

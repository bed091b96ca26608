// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Requeue queue for delayed reconciliation

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::fmt;
use strata_core::ObjectKey;
use tokio::time::Instant;

/// Something the controller reconciles
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum WorkKey {
    Layer(ObjectKey),
    Run(ObjectKey),
}

impl fmt::Display for WorkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkKey::Layer(key) => write!(f, "layer/{}", key),
            WorkKey::Run(key) => write!(f, "run/{}", key),
        }
    }
}

#[derive(Debug, Clone)]
struct Entry {
    at: Instant,
    key: WorkKey,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.at == other.at
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Min-heap: earliest first
        Reverse(self.at).cmp(&Reverse(other.at))
    }
}

/// Keys waiting to be reconciled, each at most once.
///
/// Scheduling a key that is already queued keeps the earlier time.
#[derive(Default)]
pub struct RequeueQueue {
    heap: BinaryHeap<Entry>,
    scheduled: HashMap<WorkKey, Instant>,
}

impl RequeueQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, key: WorkKey, at: Instant) {
        if let Some(existing) = self.scheduled.get(&key) {
            if *existing <= at {
                return;
            }
        }
        self.scheduled.insert(key.clone(), at);
        self.heap.push(Entry { at, key });
    }

    /// Remove and return every key due at or before `now`
    pub fn pop_due(&mut self, now: Instant) -> Vec<WorkKey> {
        let mut ready = Vec::new();
        while let Some(entry) = self.heap.peek() {
            if entry.at > now {
                break;
            }
            let Some(entry) = self.heap.pop() else {
                break;
            };
            // Superseded by an earlier schedule for the same key
            if self.scheduled.get(&entry.key) != Some(&entry.at) {
                continue;
            }
            self.scheduled.remove(&entry.key);
            ready.push(entry.key);
        }
        ready
    }

    /// When the next key becomes due
    pub fn next_deadline(&mut self) -> Option<Instant> {
        while let Some(entry) = self.heap.peek() {
            if self.scheduled.get(&entry.key) == Some(&entry.at) {
                return Some(entry.at);
            }
            self.heap.pop();
        }
        None
    }

    pub fn contains(&self, key: &WorkKey) -> bool {
        self.scheduled.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.scheduled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scheduled.is_empty()
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;

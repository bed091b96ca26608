// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Metrics sinks
//!
//! The engine hands every emitted [`Event`] to a sink instead of bumping
//! global counters.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use strata_core::Event;

pub trait MetricsSink: Clone + Send + Sync + 'static {
    fn record(&self, event: &Event);
}

/// Discards everything
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOpMetrics;

impl MetricsSink for NoOpMetrics {
    fn record(&self, _event: &Event) {}
}

/// Counts events by name, and layer transitions by target state
#[derive(Clone, Debug, Default)]
pub struct CounterMetrics {
    counts: Arc<Mutex<BTreeMap<String, u64>>>,
}

impl CounterMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current counter values
    pub fn snapshot(&self) -> BTreeMap<String, u64> {
        self.counts.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn get(&self, name: &str) -> u64 {
        self.counts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(name)
            .copied()
            .unwrap_or(0)
    }
}

impl MetricsSink for CounterMetrics {
    fn record(&self, event: &Event) {
        let mut counts = self.counts.lock().unwrap_or_else(|e| e.into_inner());
        *counts.entry(event.name()).or_insert(0) += 1;
        if let Event::LayerStateChanged { to, .. } = event {
            *counts.entry(format!("{}:{}", event.name(), to)).or_insert(0) += 1;
        }
    }
}

/// Records events for assertions
#[cfg(any(test, feature = "test-support"))]
#[derive(Clone, Debug, Default)]
pub struct FakeMetrics {
    events: Arc<Mutex<Vec<Event>>>,
}

#[cfg(any(test, feature = "test-support"))]
impl FakeMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Names of recorded events, in order
    pub fn names(&self) -> Vec<String> {
        self.events().iter().map(Event::name).collect()
    }
}

#[cfg(any(test, feature = "test-support"))]
impl MetricsSink for FakeMetrics {
    fn record(&self, event: &Event) {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event.clone());
    }
}

#[cfg(test)]
#[path = "metrics_tests.rs"]
mod tests;

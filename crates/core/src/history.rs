// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run history retention

use crate::resource::{Layer, LayerStatus, Resource, Run, RunRef};

/// Record a newly launched run as the layer's last run and append it to
/// the history, evicting the oldest entry if the history is over `keep`.
///
/// At most one entry is evicted per append.
pub fn record_run(status: &mut LayerStatus, run: RunRef, keep: usize) -> Option<RunRef> {
    status.last_run = Some(run.clone());
    status.latest_runs.push(run);
    if status.latest_runs.len() <= keep {
        return None;
    }
    let oldest = status
        .latest_runs
        .iter()
        .enumerate()
        .min_by_key(|(_, r)| r.date)
        .map(|(i, _)| i)?;
    Some(status.latest_runs.remove(oldest))
}

/// Whether a run is protected from garbage collection
pub fn is_retained(status: &LayerStatus, run_name: &str) -> bool {
    status.last_run.as_ref().is_some_and(|r| r.name == run_name)
        || status.latest_runs.iter().any(|r| r.name == run_name)
}

/// Names of the layer's runs that fall outside the retained history
pub fn runs_to_delete(layer: &Layer, runs: &[Run]) -> Vec<String> {
    runs.iter()
        .filter(|run| run.metadata.is_owned_by(Layer::KIND, &layer.metadata.name))
        .filter(|run| run.metadata.namespace == layer.metadata.namespace)
        .filter(|run| !is_retained(&layer.status, &run.metadata.name))
        .map(|run| run.metadata.name.clone())
        .collect()
}

#[cfg(test)]
#[path = "history_tests.rs"]
mod tests;

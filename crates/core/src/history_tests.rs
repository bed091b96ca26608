// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::resource::{Action, LayerSpec, ObjectMeta};
use chrono::{DateTime, TimeZone, Utc};

fn t(minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 5, 1, 12, minute, 0).unwrap()
}

fn run_ref(name: &str, minute: u32) -> RunRef {
    RunRef {
        name: name.to_string(),
        action: Action::Plan,
        commit: None,
        date: t(minute),
    }
}

fn layer() -> Layer {
    Layer::new(
        ObjectMeta::new("infra", "network"),
        LayerSpec {
            repository: "platform".to_string(),
            path: "network".to_string(),
            branch: "main".to_string(),
            terraform: Default::default(),
            opentofu: Default::default(),
            remediation_strategy: Default::default(),
            runner: Default::default(),
            keep_last_runs: None,
        },
    )
}

fn owned_run(layer: &Layer, name: &str, minute: u32) -> Run {
    Run::for_layer(layer, name.to_string(), Action::Plan, t(minute))
}

#[test]
fn history_evicts_oldest_when_over_limit() {
    let mut status = LayerStatus::default();
    assert_eq!(record_run(&mut status, run_ref("r1", 1), 2), None);
    assert_eq!(record_run(&mut status, run_ref("r2", 2), 2), None);
    let evicted = record_run(&mut status, run_ref("r3", 3), 2);

    assert_eq!(evicted.map(|r| r.name), Some("r1".to_string()));
    let names: Vec<_> = status.latest_runs.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["r2", "r3"]);
    assert_eq!(status.last_run.map(|r| r.name), Some("r3".to_string()));
}

#[test]
fn eviction_is_by_date_not_position() {
    let mut status = LayerStatus::default();
    status.latest_runs = vec![run_ref("late", 9), run_ref("early", 1)];
    let evicted = record_run(&mut status, run_ref("new", 10), 2);
    assert_eq!(evicted.map(|r| r.name), Some("early".to_string()));
}

#[test]
fn eviction_removes_one_entry_per_append() {
    let mut status = LayerStatus::default();
    status.latest_runs = (1..=5).map(|i| run_ref(&format!("r{}", i), i)).collect();
    record_run(&mut status, run_ref("r6", 6), 2);
    assert_eq!(status.latest_runs.len(), 5);
}

#[test]
fn cleanup_deletes_only_unretained_owned_runs() {
    let mut layer = layer();
    record_run(&mut layer.status, run_ref("network-plan-1", 1), 2);
    record_run(&mut layer.status, run_ref("network-plan-2", 2), 2);
    record_run(&mut layer.status, run_ref("network-plan-3", 3), 2);

    let mut other = layer.clone();
    other.metadata.name = "dns".to_string();

    let runs = vec![
        owned_run(&layer, "network-plan-1", 1),
        owned_run(&layer, "network-plan-2", 2),
        owned_run(&layer, "network-plan-3", 3),
        owned_run(&other, "dns-plan-1", 1),
    ];

    assert_eq!(runs_to_delete(&layer, &runs), vec!["network-plan-1".to_string()]);
}

#[test]
fn last_run_is_never_deleted() {
    let mut layer = layer();
    layer.status.last_run = Some(run_ref("network-apply-9", 9));
    let runs = vec![owned_run(&layer, "network-apply-9", 9)];
    assert!(runs_to_delete(&layer, &runs).is_empty());
}

#[test]
fn cleanup_is_idempotent() {
    let mut layer = layer();
    record_run(&mut layer.status, run_ref("network-plan-2", 2), 1);
    let runs = vec![
        owned_run(&layer, "network-plan-1", 1),
        owned_run(&layer, "network-plan-2", 2),
    ];
    let first = runs_to_delete(&layer, &runs);
    let remaining: Vec<Run> = runs
        .into_iter()
        .filter(|r| !first.contains(&r.metadata.name))
        .collect();
    assert!(runs_to_delete(&layer, &remaining).is_empty());
}

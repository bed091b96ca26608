// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::test_helpers::{applied, layer, planned, repository, Harness};
use crate::{lock_key_for, EngineConfig, Outcome, ReconcileError, PLAN_SUMMARY_UNAVAILABLE};
use std::time::Duration;
use strata_adapters::{ArtifactStore, JobLauncher, PlanFormat, PlanRef};
use strata_core::sync_window::WindowKind;
use strata_core::{Action, Clock, LayerLock, PodPhase, Run, RunState, SyncWindow};
use strata_storage::ResourceStore;

const DRIFT: Duration = Duration::from_secs(20 * 60);
const WAIT: Duration = Duration::from_secs(60);

#[tokio::test]
async fn fresh_plan_and_apply_idles() {
    let h = Harness::new();
    h.seed(applied("network", &h.clock, 5)).await;

    let outcome = h.reconciler().reconcile_layer(&Harness::key("network")).await.unwrap();

    assert_eq!(outcome, Outcome::Requeue(DRIFT));
    assert!(h.runs().await.is_empty());
    assert!(h.locks().await.is_empty());
    let l = h.layer("network").await;
    assert_eq!(l.status.state, "Idle");
    assert_eq!(l.status.conditions.len(), 5);
    assert_eq!(h.metrics.names(), vec!["layer:state"]);
}

#[tokio::test]
async fn idle_layer_is_not_rewritten() {
    let h = Harness::new();
    h.seed(applied("network", &h.clock, 5)).await;
    let reconciler = h.reconciler();

    reconciler.reconcile_layer(&Harness::key("network")).await.unwrap();
    let version = h.layer("network").await.metadata.resource_version;
    h.clock.advance(Duration::from_secs(30));
    reconciler.reconcile_layer(&Harness::key("network")).await.unwrap();

    assert_eq!(h.layer("network").await.metadata.resource_version, version);
}

#[tokio::test]
async fn stale_plan_launches_one_plan_run() {
    let h = Harness::new();
    h.seed(planned("network", &h.clock, 60)).await;

    let outcome = h.reconciler().reconcile_layer(&Harness::key("network")).await.unwrap();
    assert_eq!(outcome, Outcome::Requeue(WAIT));

    let runs = h.runs().await;
    assert_eq!(runs.len(), 1);
    let run = &runs[0];
    assert_eq!(run.metadata.name, "network-plan-r1");
    assert_eq!(run.spec.action, Action::Plan);
    assert_eq!(run.spec.commit.as_deref(), Some("abc"));
    assert!(run.metadata.is_owned_by("layers", "network"));

    let locks = h.locks().await;
    assert_eq!(locks.len(), 1);
    assert_eq!(locks[0].owner, "network-plan-r1");

    let submitted = h.launcher.submitted();
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].pod.to_string(), "network-plan-r1-0");
    assert_eq!(submitted[0].tool, "terraform");
    assert_eq!(submitted[0].tool_version.as_deref(), Some("1.7.0"));

    let l = h.layer("network").await;
    assert_eq!(l.status.state, "PlanNeeded");
    assert_eq!(l.status.last_run.as_ref().map(|r| r.name.as_str()), Some("network-plan-r1"));
    assert_eq!(l.status.latest_runs.len(), 1);
    assert!(h.metrics.names().contains(&"run:created".to_string()));
}

#[tokio::test]
async fn locked_layer_waits_without_launching() {
    let h = Harness::new();
    h.seed(layer("network")).await;
    let reconciler = h.reconciler();

    reconciler.reconcile_layer(&Harness::key("network")).await.unwrap();
    let before = h.layer("network").await;
    // The run holding the lock still exists, so age does not matter
    h.clock.advance(Duration::from_secs(60 * 60));
    let outcome = reconciler.reconcile_layer(&Harness::key("network")).await.unwrap();

    assert_eq!(outcome, Outcome::Requeue(WAIT));
    assert_eq!(h.runs().await.len(), 1);
    assert_eq!(h.launcher.submitted().len(), 1);
    assert_eq!(h.locks().await[0].owner, "network-plan-r1");
    let after = h.layer("network").await;
    assert_eq!(after.metadata.resource_version, before.metadata.resource_version);
    assert_eq!(after.status, before.status);
    assert!(h
        .metrics
        .names()
        .contains(&"layer:lock:contention".to_string()));
}

#[tokio::test]
async fn lock_of_missing_run_is_reclaimed_after_deadline() {
    let h = Harness::new();
    let l = h.seed(layer("network")).await;
    let key = lock_key_for(&l, &repository());
    h.store
        .create(LayerLock::new("infra", key, "network-plan-ghost", h.clock.now()))
        .await
        .unwrap();
    let reconciler = h.reconciler();

    // Younger than the reconcile deadline: the owner may still be launching
    let outcome = reconciler.reconcile_layer(&Harness::key("network")).await.unwrap();
    assert_eq!(outcome, Outcome::Requeue(WAIT));
    assert!(h.runs().await.is_empty());

    h.clock.advance(Duration::from_secs(60));
    reconciler.reconcile_layer(&Harness::key("network")).await.unwrap();

    let runs = h.runs().await;
    assert_eq!(runs.len(), 1);
    let locks = h.locks().await;
    assert_eq!(locks.len(), 1);
    assert_eq!(locks[0].owner, runs[0].metadata.name);
}

#[tokio::test]
async fn lock_of_deleted_run_is_reclaimed() {
    let h = Harness::new();
    h.seed(layer("network")).await;
    let reconciler = h.reconciler();

    reconciler.reconcile_layer(&Harness::key("network")).await.unwrap();
    h.store
        .delete::<Run>(&Harness::key("network-plan-r1"))
        .await
        .unwrap();
    h.clock.advance(Duration::from_secs(60));
    reconciler.reconcile_layer(&Harness::key("network")).await.unwrap();

    let names: Vec<String> = h.runs().await.into_iter().map(|r| r.metadata.name).collect();
    assert_eq!(names, vec!["network-plan-r2"]);
    assert_eq!(h.locks().await[0].owner, "network-plan-r2");
}

#[tokio::test]
async fn layers_sharing_a_path_serialize() {
    let h = Harness::new();
    h.seed(layer("network")).await;
    let mut twin = layer("network-twin");
    twin.spec.path = "network/".to_string();
    h.store.create(twin).await.unwrap();
    let reconciler = h.reconciler();

    reconciler.reconcile_layer(&Harness::key("network")).await.unwrap();
    reconciler.reconcile_layer(&Harness::key("network-twin")).await.unwrap();

    assert_eq!(h.runs().await.len(), 1);
}

#[tokio::test]
async fn dry_mode_apply_needed_does_nothing() {
    let h = Harness::new();
    h.seed(planned("network", &h.clock, 5)).await;

    let outcome = h.reconciler().reconcile_layer(&Harness::key("network")).await.unwrap();

    assert_eq!(outcome, Outcome::Requeue(DRIFT));
    assert!(h.runs().await.is_empty());
    assert!(h.locks().await.is_empty());
    assert_eq!(h.layer("network").await.status.state, "ApplyNeeded");
}

#[tokio::test]
async fn auto_apply_launches_apply() {
    let h = Harness::new();
    let mut l = planned("network", &h.clock, 5);
    l.spec.remediation_strategy.auto_apply = Some(true);
    h.seed(l).await;

    h.reconciler().reconcile_layer(&Harness::key("network")).await.unwrap();

    let runs = h.runs().await;
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].spec.action, Action::Apply);
    assert_eq!(runs[0].metadata.name, "network-apply-r1");
}

#[tokio::test]
async fn approval_applies_in_dry_mode_and_is_consumed() {
    let h = Harness::new();
    let mut l = planned("network", &h.clock, 5);
    l.annotations.apply_now = true;
    h.seed(l).await;

    h.reconciler().reconcile_layer(&Harness::key("network")).await.unwrap();

    let runs = h.runs().await;
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].spec.action, Action::Apply);
    assert!(!h.layer("network").await.annotations.apply_now);
}

#[tokio::test]
async fn sync_now_plans_a_fresh_layer_and_is_consumed() {
    let h = Harness::new();
    let mut l = applied("network", &h.clock, 5);
    l.annotations.sync_now = true;
    h.seed(l).await;

    h.reconciler().reconcile_layer(&Harness::key("network")).await.unwrap();

    let runs = h.runs().await;
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].spec.action, Action::Plan);
    assert!(!h.layer("network").await.annotations.sync_now);
}

#[tokio::test]
async fn invalid_tool_selection_is_not_requeued() {
    let h = Harness::new();
    let mut l = layer("network");
    l.spec.opentofu.enabled = Some(true);
    h.seed(l).await;

    let outcome = h.reconciler().reconcile_layer(&Harness::key("network")).await.unwrap();

    assert_eq!(outcome, Outcome::Done);
    assert!(h.runs().await.is_empty());
    assert_eq!(h.metrics.names(), vec!["layer:invalid"]);
}

#[tokio::test]
async fn no_tool_enabled_is_invalid() {
    let h = Harness::new();
    let mut l = layer("network");
    l.spec.terraform.enabled = Some(false);
    h.seed(l).await;

    let outcome = h.reconciler().reconcile_layer(&Harness::key("network")).await.unwrap();
    assert_eq!(outcome, Outcome::Done);
    assert!(h.locks().await.is_empty());
}

#[tokio::test]
async fn deny_window_blocks_launch() {
    let config = EngineConfig {
        sync_windows: vec![SyncWindow {
            kind: WindowKind::Deny,
            schedule: "* * * * *".to_string(),
            duration: "1h".to_string(),
            layers: vec!["net*".to_string()],
            actions: vec![],
        }],
        ..EngineConfig::default()
    };
    let h = Harness::with_config(config);
    h.seed(layer("network")).await;

    let outcome = h.reconciler().reconcile_layer(&Harness::key("network")).await.unwrap();

    assert_eq!(outcome, Outcome::Requeue(WAIT));
    assert!(h.runs().await.is_empty());
    assert!(h.locks().await.is_empty());
    assert!(h.metrics.names().contains(&"layer:sync:blocked".to_string()));
}

#[tokio::test]
async fn window_for_other_action_does_not_block() {
    let config = EngineConfig {
        sync_windows: vec![SyncWindow {
            kind: WindowKind::Deny,
            schedule: "* * * * *".to_string(),
            duration: "1h".to_string(),
            layers: vec!["*".to_string()],
            actions: vec![Action::Apply],
        }],
        ..EngineConfig::default()
    };
    let h = Harness::with_config(config);
    h.seed(layer("network")).await;

    h.reconciler().reconcile_layer(&Harness::key("network")).await.unwrap();
    assert_eq!(h.runs().await.len(), 1);
}

#[tokio::test]
async fn launch_failure_releases_lock_and_run() {
    let h = Harness::new();
    h.seed(layer("network")).await;
    h.launcher.fail_submits(1);

    let err = h
        .reconciler()
        .reconcile_layer(&Harness::key("network"))
        .await
        .unwrap_err();

    assert!(matches!(err, ReconcileError::Launch(_)));
    assert!(h.locks().await.is_empty());
    assert!(h.runs().await.is_empty());
}

#[tokio::test]
async fn missing_repository_is_an_error() {
    let h = Harness::new();
    h.store.create(layer("network")).await.unwrap();

    let err = h
        .reconciler()
        .reconcile_layer(&Harness::key("network"))
        .await
        .unwrap_err();
    assert!(matches!(err, ReconcileError::RepositoryNotFound(_)));
}

#[tokio::test]
async fn missing_layer_is_done() {
    let h = Harness::new();
    let outcome = h.reconciler().reconcile_layer(&Harness::key("gone")).await.unwrap();
    assert_eq!(outcome, Outcome::Done);
}

#[tokio::test]
async fn failing_layer_waits_out_grace_period() {
    let h = Harness::new();
    let mut l = layer("network");
    l.annotations.failure_count = Some(1);
    l.annotations.last_failure_date = Some(h.clock.now());
    h.seed(l).await;

    let outcome = h.reconciler().reconcile_layer(&Harness::key("network")).await.unwrap();

    // backoff(15s, 1) = 30s
    assert_eq!(outcome, Outcome::Requeue(Duration::from_secs(30)));
    assert!(h.runs().await.is_empty());
    assert_eq!(h.layer("network").await.status.state, "FailureGracePeriod");
}

/// Launch a plan, then finish it so the lock is free again
async fn plan_and_finish(h: &Harness) -> String {
    h.edit_layer("network", |l| l.annotations.sync_now = true).await;
    h.reconciler().reconcile_layer(&Harness::key("network")).await.unwrap();
    let name = h
        .layer("network")
        .await
        .status
        .last_run
        .map(|r| r.name)
        .unwrap();
    h.edit_run(&name, |r| r.status.state = RunState::Succeeded).await;
    for lock in h.locks().await {
        h.store
            .delete::<LayerLock>(&lock.metadata.key())
            .await
            .unwrap();
    }
    h.clock.advance(Duration::from_secs(60));
    name
}

#[tokio::test]
async fn history_evicts_and_deletes_oldest_run() {
    let h = Harness::new();
    let mut l = applied("network", &h.clock, 1);
    l.spec.keep_last_runs = Some(2);
    h.seed(l).await;

    let first = plan_and_finish(&h).await;
    let second = plan_and_finish(&h).await;
    let third = plan_and_finish(&h).await;

    let l = h.layer("network").await;
    let kept: Vec<&str> = l.status.latest_runs.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(kept, vec![second.as_str(), third.as_str()]);

    let names: Vec<String> = h.runs().await.into_iter().map(|r| r.metadata.name).collect();
    assert!(!names.contains(&first));
    assert!(names.contains(&second));
    assert!(names.contains(&third));
}

#[tokio::test]
async fn last_result_shows_plan_summary() {
    let h = Harness::new();
    h.seed(layer("network")).await;
    let name = plan_and_finish(&h).await;
    h.artifacts
        .put_plan(
            &PlanRef::new("infra", "network", &name, 0),
            PlanFormat::Short,
            "\nPlan: 2 to add, 0 to change, 0 to destroy.\n",
        )
        .await
        .unwrap();

    h.reconciler().reconcile_layer(&Harness::key("network")).await.unwrap();

    assert_eq!(
        h.layer("network").await.status.last_result,
        "Plan: 2 to add, 0 to change, 0 to destroy."
    );
}

#[tokio::test]
async fn last_result_falls_back_when_artifacts_fail() {
    let h = Harness::new();
    h.seed(layer("network")).await;
    plan_and_finish(&h).await;
    h.artifacts.set_unavailable(true);

    h.reconciler().reconcile_layer(&Harness::key("network")).await.unwrap();

    assert_eq!(h.layer("network").await.status.last_result, PLAN_SUMMARY_UNAVAILABLE);
}

#[tokio::test]
async fn submitted_pod_starts_pending() {
    let h = Harness::new();
    h.seed(layer("network")).await;
    h.reconciler().reconcile_layer(&Harness::key("network")).await.unwrap();

    let pod = h.run("network-plan-r1").await.status.pod.unwrap();
    assert_eq!(h.launcher.phase(&pod).await.unwrap(), Some(PodPhase::Pending));
}

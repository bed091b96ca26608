// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::clock::FakeClock;
use crate::resource::{LayerSpec, ObjectMeta};
use chrono::{TimeZone, Utc};

const DRIFT: Duration = Duration::from_secs(20 * 60);

fn clock() -> FakeClock {
    FakeClock::at(Utc.with_ymd_and_hms(2026, 5, 1, 12, 0, 0).unwrap())
}

fn thresholds() -> Thresholds {
    Thresholds {
        drift_detection: DRIFT,
        failure_grace_period: Duration::from_secs(15),
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

/// Layer planned `minutes` ago at commit `abc`, never applied
fn planned(clock: &FakeClock, minutes: i64) -> Layer {
    let mut l = layer();
    l.annotations.last_plan_date = Some(clock.now() - chrono::Duration::minutes(minutes));
    l.annotations.last_plan_commit = Some("abc".to_string());
    l.annotations.last_plan_checksum = Some("sum1".to_string());
    l.annotations.last_branch_commit = Some("abc".to_string());
    l.annotations.last_relevant_commit = Some("abc".to_string());
    l
}

fn launches(effects: &[Effect]) -> Vec<Action> {
    effects
        .iter()
        .filter_map(|e| match e {
            Effect::LaunchRun { action } => Some(*action),
            _ => None,
        })
        .collect()
}

fn requeue(effects: &[Effect]) -> Option<Duration> {
    effects.iter().find_map(|e| match e {
        Effect::Requeue(d) => Some(*d),
        _ => None,
    })
}

#[test]
fn fresh_plan_and_apply_is_idle() {
    let clock = clock();
    let mut l = planned(&clock, 5);
    l.annotations.last_apply_checksum = Some("sum1".to_string());

    let decision = l.decide(&thresholds(), true, &clock);
    assert_eq!(decision.state, LayerState::Idle);
    assert!(launches(&decision.effects).is_empty());
    assert_eq!(requeue(&decision.effects), Some(DRIFT));
}

#[test]
fn never_planned_needs_plan() {
    let clock = clock();
    let decision = layer().decide(&thresholds(), false, &clock);
    assert_eq!(decision.state, LayerState::PlanNeeded);
    assert_eq!(launches(&decision.effects), vec![Action::Plan]);
}

#[test]
fn stale_plan_needs_plan() {
    let clock = clock();
    let decision = planned(&clock, 60).decide(&thresholds(), true, &clock);
    assert_eq!(decision.state, LayerState::PlanNeeded);
    assert_eq!(launches(&decision.effects), vec![Action::Plan]);
}

#[test]
fn unplanned_commit_needs_plan() {
    let clock = clock();
    let mut l = planned(&clock, 5);
    l.annotations.last_relevant_commit = Some("def".to_string());
    let decision = l.decide(&thresholds(), true, &clock);
    assert_eq!(decision.state, LayerState::PlanNeeded);
}

#[test]
fn recent_unapplied_plan_with_auto_apply_needs_apply() {
    let clock = clock();
    let decision = planned(&clock, 5).decide(&thresholds(), true, &clock);
    assert_eq!(decision.state, LayerState::ApplyNeeded);
    assert_eq!(launches(&decision.effects), vec![Action::Apply]);
}

#[test]
fn dry_mode_apply_needed_does_nothing() {
    let clock = clock();
    let decision = planned(&clock, 5).decide(&thresholds(), false, &clock);
    assert_eq!(decision.state, LayerState::ApplyNeeded);
    assert!(launches(&decision.effects).is_empty());
    assert_eq!(requeue(&decision.effects), Some(DRIFT));
}

#[test]
fn apply_now_approves_apply_in_dry_mode() {
    let clock = clock();
    let mut l = planned(&clock, 5);
    l.annotations.last_apply_checksum = Some("sum1".to_string());
    l.annotations.apply_now = true;
    let decision = l.decide(&thresholds(), false, &clock);
    assert_eq!(decision.state, LayerState::ApplyNeeded);
    assert_eq!(launches(&decision.effects), vec![Action::Apply]);
}

#[test]
fn failed_layer_waits_in_grace_period() {
    let clock = clock();
    let mut l = planned(&clock, 60);
    l.annotations.failure_count = Some(1);
    l.annotations.last_failure_date = Some(clock.now());

    let decision = l.decide(&thresholds(), true, &clock);
    assert_eq!(decision.state, LayerState::FailureGracePeriod);
    assert!(launches(&decision.effects).is_empty());
    assert_eq!(requeue(&decision.effects), Some(Duration::from_secs(30)));

    clock.advance(Duration::from_secs(30));
    let decision = l.decide(&thresholds(), true, &clock);
    assert_eq!(decision.state, LayerState::PlanNeeded);
}

#[test]
fn state_change_is_emitted_once() {
    let clock = clock();
    let mut l = layer();
    let decision = l.decide(&thresholds(), true, &clock);
    assert!(matches!(
        &decision.effects[0],
        Effect::Emit(Event::LayerStateChanged { to, .. }) if to == "PlanNeeded"
    ));

    l.status.state = decision.state.to_string();
    let decision = l.decide(&thresholds(), true, &clock);
    assert!(!decision
        .effects
        .iter()
        .any(|e| matches!(e, Effect::Emit(Event::LayerStateChanged { .. }))));
}

#[test]
fn layer_state_parses_and_displays() {
    for state in [
        LayerState::Idle,
        LayerState::PlanNeeded,
        LayerState::ApplyNeeded,
        LayerState::FailureGracePeriod,
    ] {
        assert_eq!(state.to_string().parse::<LayerState>(), Ok(state));
    }
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::TimeZone;

#[test]
fn merge_keeps_transition_time_when_status_unchanged() {
    let t0 = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
    let t1 = Utc.with_ymd_and_hms(2026, 1, 1, 1, 0, 0).unwrap();

    let previous = vec![
        Condition::new(ConditionType::HasFailed, false, ConditionReason::NoFailureYet, "", t0),
        Condition::new(ConditionType::IsApplyUpToDate, true, ConditionReason::ApplyIsUpToDate, "", t0),
    ];
    let current = vec![
        Condition::new(ConditionType::HasFailed, false, ConditionReason::NoFailureYet, "", t1),
        Condition::new(ConditionType::IsApplyUpToDate, false, ConditionReason::NewPlanNotApplied, "", t1),
    ];

    let merged = merge(&previous, current);
    assert_eq!(merged[0].last_transition_time, t0);
    assert_eq!(merged[1].last_transition_time, t1);
    assert_eq!(merged[1].reason, ConditionReason::NewPlanNotApplied);
}

#[test]
fn condition_serializes_type_field() {
    let t0 = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
    let c = Condition::new(ConditionType::HasFailed, true, ConditionReason::LayerHasFailed, "x", t0);
    let json = serde_json::to_value(&c).unwrap();
    assert_eq!(json["type"], "HasFailed");
    assert_eq!(json["reason"], "LayerHasFailed");
    assert_eq!(ConditionType::HasFailed.to_string(), "HasFailed");
}

#[test]
fn find_returns_matching_type() {
    let t0 = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
    let list = vec![Condition::new(
        ConditionType::IsRunning,
        true,
        ConditionReason::PodActive,
        "",
        t0,
    )];
    assert!(find(&list, ConditionType::IsRunning).is_some());
    assert!(find(&list, ConditionType::HasFailed).is_none());
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::TimeZone;
use yare::parameterized;

fn at(h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 10, h, m, 0).unwrap()
}

fn window(kind: WindowKind, schedule: &str, duration: &str, layers: &[&str]) -> SyncWindow {
    SyncWindow {
        kind,
        schedule: schedule.to_string(),
        duration: duration.to_string(),
        layers: layers.iter().map(|s| s.to_string()).collect(),
        actions: vec![],
    }
}

#[test]
fn no_windows_never_blocks() {
    assert_eq!(is_sync_blocked(&[], "network", at(12, 0)), SyncVerdict::ALLOWED);
}

#[test]
fn deny_wins_over_allow() {
    let windows = vec![
        window(WindowKind::Allow, "0 0 * * *", "24h", &["*"]),
        window(WindowKind::Deny, "0 12 * * *", "1h", &["net*"]),
    ];
    let verdict = is_sync_blocked(&windows, "network", at(12, 30));
    assert!(verdict.blocked);
    assert_eq!(verdict.reason, Some(BlockReason::InsideDenyWindow));
}

#[test]
fn inactive_allow_blocks() {
    let windows = vec![window(WindowKind::Allow, "0 9 * * *", "2h", &["*"])];
    let verdict = is_sync_blocked(&windows, "network", at(12, 0));
    assert!(verdict.blocked);
    assert_eq!(verdict.reason, Some(BlockReason::OutsideAllowWindow));

    assert_eq!(is_sync_blocked(&windows, "network", at(10, 0)), SyncVerdict::ALLOWED);
}

#[test]
fn one_active_allow_is_enough() {
    let windows = vec![
        window(WindowKind::Allow, "0 9 * * *", "2h", &["*"]),
        window(WindowKind::Allow, "0 12 * * *", "2h", &["*"]),
    ];
    assert_eq!(is_sync_blocked(&windows, "network", at(13, 0)), SyncVerdict::ALLOWED);
}

#[test]
fn inactive_deny_does_not_block() {
    let windows = vec![window(WindowKind::Deny, "0 22 * * *", "2h", &["*"])];
    assert_eq!(is_sync_blocked(&windows, "network", at(12, 0)), SyncVerdict::ALLOWED);
}

#[test]
fn windows_for_other_layers_are_ignored() {
    let windows = vec![
        window(WindowKind::Deny, "0 0 * * *", "24h", &["dns-*"]),
        window(WindowKind::Allow, "0 3 * * *", "1h", &["db"]),
    ];
    assert_eq!(is_sync_blocked(&windows, "network", at(12, 0)), SyncVerdict::ALLOWED);
}

#[test]
fn window_spanning_midnight() {
    let w = window(WindowKind::Deny, "0 23 * * *", "2h", &["*"]);
    let after_midnight = Utc.with_ymd_and_hms(2026, 3, 11, 0, 30, 0).unwrap();
    assert!(w.is_active(after_midnight).unwrap());
    let closed = Utc.with_ymd_and_hms(2026, 3, 11, 1, 0, 0).unwrap();
    assert!(!w.is_active(closed).unwrap());
}

#[test]
fn window_start_is_inclusive_and_end_exclusive() {
    let w = window(WindowKind::Deny, "0 22 * * *", "2h", &["*"]);
    assert!(w.is_active(at(22, 0)).unwrap());
    assert!(w.is_active(at(23, 59)).unwrap());
    assert!(!w.is_active(at(21, 59)).unwrap());
    let end = Utc.with_ymd_and_hms(2026, 3, 11, 0, 0, 0).unwrap();
    assert!(!w.is_active(end).unwrap());
}

#[test]
fn six_field_schedule_is_accepted() {
    let w = window(WindowKind::Deny, "0 30 12 * * *", "10m", &["*"]);
    assert!(w.is_active(at(12, 35)).unwrap());
    assert!(!w.is_active(at(12, 45)).unwrap());
}

#[test]
fn malformed_windows_are_inactive() {
    let bad_cron = window(WindowKind::Deny, "not a cron", "1h", &["*"]);
    assert!(matches!(
        bad_cron.is_active(at(12, 0)),
        Err(SyncWindowError::Schedule { .. })
    ));
    assert!(bad_cron.validate().is_err());
    assert_eq!(
        is_sync_blocked(&[bad_cron], "network", at(12, 0)),
        SyncVerdict::ALLOWED
    );

    let bad_duration = window(WindowKind::Allow, "0 0 * * *", "forever", &["*"]);
    assert!(matches!(
        bad_duration.is_active(at(12, 0)),
        Err(SyncWindowError::Duration { .. })
    ));
    // A malformed allow window is dropped instead of restricting the layer
    assert_eq!(
        is_sync_blocked(&[bad_duration.clone()], "network", at(12, 0)),
        SyncVerdict::ALLOWED
    );

    // Well-formed allow windows still apply next to a malformed one
    let closed = window(WindowKind::Allow, "0 0 * * *", "1h", &["*"]);
    assert_eq!(
        is_sync_blocked(&[bad_duration, closed], "network", at(12, 0)).reason,
        Some(BlockReason::OutsideAllowWindow)
    );
}

#[test]
fn windows_are_filtered_by_action() {
    let mut apply_only = window(WindowKind::Deny, "0 0 * * *", "24h", &["*"]);
    apply_only.actions = vec![Action::Apply];
    let all = window(WindowKind::Allow, "0 0 * * *", "24h", &["*"]);
    let windows = vec![apply_only, all];

    assert_eq!(windows_for_action(&windows, Action::Plan).len(), 1);
    assert_eq!(windows_for_action(&windows, Action::Apply).len(), 2);

    let plan = windows_for_action(&windows, Action::Plan);
    assert!(!is_sync_blocked(&plan, "network", at(12, 0)).blocked);
    let apply = windows_for_action(&windows, Action::Apply);
    assert!(is_sync_blocked(&apply, "network", at(12, 0)).blocked);
}

#[test]
fn window_deserializes_lowercase_fields() {
    let json = r#"{"kind":"deny","schedule":"0 22 * * *","duration":"2h","layers":["*"],"actions":["apply"]}"#;
    let w: SyncWindow = serde_json::from_str(json).unwrap();
    assert_eq!(w.kind, WindowKind::Deny);
    assert_eq!(w.actions, vec![Action::Apply]);
}

#[parameterized(
    exact = { "network", "network", true },
    star_suffix = { "net*", "network", true },
    star_prefix = { "*work", "network", true },
    star_middle = { "n*k", "network", true },
    question = { "netw?rk", "network", true },
    star_empty = { "network*", "network", true },
    mismatch = { "dns-*", "network", false },
    too_short = { "net", "network", false },
    question_needs_char = { "network?", "network", false },
    backtrack = { "*a*b", "xaxxb", true },
    backtrack_fail = { "*a*b", "xaxxc", false },
    empty_pattern = { "", "network", false },
)]
fn glob_matching(pattern: &str, name: &str, expected: bool) {
    assert_eq!(glob_match(pattern, name), expected);
}

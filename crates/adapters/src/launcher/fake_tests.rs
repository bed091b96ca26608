// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::launcher::tests::request;

#[tokio::test]
async fn fake_submit_is_idempotent() {
    let launcher = FakeLauncher::new();
    let pod = launcher.submit(request("net-plan-a-0", 0)).await.unwrap();
    launcher.set_phase(&pod, PodPhase::Running);

    // Resubmitting does not reset the pod
    launcher.submit(request("net-plan-a-0", 0)).await.unwrap();
    assert_eq!(launcher.phase(&pod).await.unwrap(), Some(PodPhase::Running));
    assert_eq!(launcher.pod_count(), 1);
    assert_eq!(launcher.submitted().len(), 2);
}

#[tokio::test]
async fn fake_injected_failures() {
    let launcher = FakeLauncher::new();
    launcher.fail_submits(1);
    assert!(launcher.submit(request("p-0", 0)).await.is_err());
    assert!(launcher.submit(request("p-0", 0)).await.is_ok());
}

#[tokio::test]
async fn fake_unknown_pod_has_no_phase() {
    let launcher = FakeLauncher::new();
    let pod = PodRef("missing-0".to_string());
    assert_eq!(launcher.phase(&pod).await.unwrap(), None);
    assert!(matches!(launcher.calls()[0], LaunchCall::Phase(_)));
}

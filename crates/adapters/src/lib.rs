// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Adapters for external I/O: run pods, plan artifacts and metrics

pub mod artifacts;
pub mod launcher;
pub mod metrics;
pub mod traced;

pub use artifacts::{ArtifactError, ArtifactStore, FsArtifactStore, PlanFormat, PlanRef};
pub use launcher::{JobLauncher, JobRequest, LaunchError, ProcessLauncher, ProcessLauncherConfig};
pub use metrics::{CounterMetrics, MetricsSink, NoOpMetrics};
pub use traced::{TracedArtifactStore, TracedLauncher};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use artifacts::{ArtifactCall, FakeArtifactStore};
#[cfg(any(test, feature = "test-support"))]
pub use launcher::{FakeLauncher, LaunchCall};
#[cfg(any(test, feature = "test-support"))]
pub use metrics::FakeMetrics;

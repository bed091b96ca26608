// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for engine tests

use crate::{EngineConfig, EngineDeps, Reconciler};
use chrono::{TimeZone, Utc};
use strata_adapters::{FakeArtifactStore, FakeLauncher, FakeMetrics};
use strata_core::resource::{LayerSpec, RepositorySpec, ToolConfig};
use strata_core::{
    Clock, FakeClock, Layer, LayerLock, ObjectKey, ObjectMeta, Repository, Run, SequentialIdGen,
};
use strata_storage::{MemoryStore, ResourceStore};

pub(crate) type TestReconciler = Reconciler<
    MemoryStore,
    FakeLauncher,
    FakeArtifactStore,
    FakeMetrics,
    FakeClock,
    SequentialIdGen,
>;

pub(crate) struct Harness {
    pub store: MemoryStore,
    pub launcher: FakeLauncher,
    pub artifacts: FakeArtifactStore,
    pub metrics: FakeMetrics,
    pub clock: FakeClock,
    pub ids: SequentialIdGen,
    pub config: EngineConfig,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            store: MemoryStore::new(),
            launcher: FakeLauncher::new(),
            artifacts: FakeArtifactStore::new(),
            metrics: FakeMetrics::new(),
            clock: FakeClock::at(Utc.with_ymd_and_hms(2026, 5, 1, 12, 0, 0).unwrap()),
            ids: SequentialIdGen::new("r"),
            config,
        }
    }

    /// A reconciler sharing this harness's adapters
    pub fn reconciler(&self) -> TestReconciler {
        Reconciler::new(
            EngineDeps {
                store: self.store.clone(),
                launcher: self.launcher.clone(),
                artifacts: self.artifacts.clone(),
                metrics: self.metrics.clone(),
            },
            self.clock.clone(),
            self.ids.clone(),
            self.config.clone(),
        )
    }

    /// Store the default repository and the given layer
    pub async fn seed(&self, layer: Layer) -> Layer {
        self.store.create(repository()).await.unwrap();
        self.store.create(layer).await.unwrap()
    }

    pub async fn layer(&self, name: &str) -> Layer {
        self.store.get(&ObjectKey::new("infra", name)).await.unwrap()
    }

    pub async fn run(&self, name: &str) -> Run {
        self.store.get(&ObjectKey::new("infra", name)).await.unwrap()
    }

    pub async fn runs(&self) -> Vec<Run> {
        self.store.list(Some("infra")).await.unwrap()
    }

    pub async fn locks(&self) -> Vec<LayerLock> {
        self.store.list(Some("infra")).await.unwrap()
    }

    /// Overwrite a stored layer's annotations and spec
    pub async fn edit_layer(&self, name: &str, edit: impl FnOnce(&mut Layer)) {
        let mut layer = self.layer(name).await;
        edit(&mut layer);
        self.store.update(layer).await.unwrap();
    }

    pub async fn edit_run(&self, name: &str, edit: impl FnOnce(&mut Run)) {
        let mut run = self.run(name).await;
        edit(&mut run);
        self.store.update(run).await.unwrap();
    }

    pub fn key(name: &str) -> ObjectKey {
        ObjectKey::new("infra", name)
    }
}

/// Repository `infra/platform` with terraform enabled
pub(crate) fn repository() -> Repository {
    Repository::new(
        ObjectMeta::new("infra", "platform"),
        RepositorySpec {
            url: "https://git.example.com/platform.git".to_string(),
            terraform: ToolConfig {
                enabled: Some(true),
                version: Some("1.7.0".to_string()),
            },
            ..Default::default()
        },
    )
}

/// Layer `infra/<name>` at path `<name>`, never planned
pub(crate) fn layer(name: &str) -> Layer {
    Layer::new(
        ObjectMeta::new("infra", name),
        LayerSpec {
            repository: "platform".to_string(),
            path: name.to_string(),
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
pub(crate) fn planned(name: &str, clock: &FakeClock, minutes: i64) -> Layer {
    let mut l = layer(name);
    l.annotations.last_plan_date = Some(clock.now() - chrono::Duration::minutes(minutes));
    l.annotations.last_plan_commit = Some("abc".to_string());
    l.annotations.last_plan_checksum = Some("sum1".to_string());
    l.annotations.last_branch_commit = Some("abc".to_string());
    l.annotations.last_relevant_commit = Some("abc".to_string());
    l
}

/// Planned and applied `minutes` ago
pub(crate) fn applied(name: &str, clock: &FakeClock, minutes: i64) -> Layer {
    let mut l = planned(name, clock, minutes);
    l.annotations.last_apply_checksum = Some("sum1".to_string());
    l
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI command implementations
//!
//! Commands talk to the resource store directly; the daemon picks up every
//! write on its next watch scan.

pub mod layer;
pub mod repo;
pub mod report;
pub mod run;
pub mod window;

use crate::error::CliError;
use crate::output::OutputFormat;
use anyhow::Context as _;
use clap::ValueEnum;
use std::path::{Path, PathBuf};
use strata_adapters::FsArtifactStore;
use strata_core::resource::ToolConfig;
use strata_core::{Config, ObjectKey, Resource, SystemClock};
use strata_storage::{update_with_retry, FsStore, ResourceStore, DEFAULT_UPDATE_ATTEMPTS};

/// Shared state for one command invocation
pub struct Context {
    pub store: FsStore,
    pub artifacts: FsArtifactStore,
    pub config: Config,
    pub namespace: String,
    pub format: OutputFormat,
    pub clock: SystemClock,
}

impl Context {
    /// Open the store and artifacts named by the config file.
    ///
    /// Relative paths are resolved against the config file's directory.
    pub fn open(config_path: &Path, namespace: String, format: OutputFormat) -> anyhow::Result<Self> {
        let config = Config::load_or_default(config_path)
            .with_context(|| format!("loading {}", config_path.display()))?;
        let base = match config_path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let store = FsStore::open(base.join(&config.store.path))?;
        let artifacts = FsArtifactStore::new(base.join(&config.artifacts.path));
        Ok(Self {
            store,
            artifacts,
            config,
            namespace,
            format,
            clock: SystemClock,
        })
    }

    pub fn key(&self, name: &str) -> ObjectKey {
        ObjectKey::new(&self.namespace, name)
    }

    /// Fetch an object, turning absence into a friendly error
    pub async fn get<R: Resource>(&self, label: &str, name: &str) -> anyhow::Result<R> {
        match self.store.get::<R>(&self.key(name)).await {
            Ok(object) => Ok(object),
            Err(e) if e.is_not_found() => {
                Err(CliError::not_found(label, &self.namespace, name).into())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn create<R: Resource>(&self, label: &str, object: R) -> anyhow::Result<R> {
        let name = object.meta().name.clone();
        match self.store.create(object).await {
            Ok(object) => Ok(object),
            Err(e) if e.is_already_exists() => {
                Err(CliError::already_exists(label, &self.namespace, &name).into())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Conditionally update an object, retrying on conflicts with the daemon
    pub async fn update<R, F>(&self, label: &str, name: &str, mutate: F) -> anyhow::Result<R>
    where
        R: Resource,
        F: FnMut(&mut R) + Send,
    {
        match update_with_retry(&self.store, &self.key(name), DEFAULT_UPDATE_ATTEMPTS, mutate).await
        {
            Ok(object) => Ok(object),
            Err(e) if e.is_not_found() => {
                Err(CliError::not_found(label, &self.namespace, name).into())
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Infrastructure tool selectable on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ToolArg {
    Terraform,
    Tofu,
}

impl ToolArg {
    /// Enable this tool and explicitly disable the other one
    pub fn configure(
        self,
        version: Option<String>,
        terraform: &mut ToolConfig,
        opentofu: &mut ToolConfig,
    ) {
        let (enabled, disabled) = match self {
            ToolArg::Terraform => (terraform, opentofu),
            ToolArg::Tofu => (opentofu, terraform),
        };
        enabled.enabled = Some(true);
        enabled.version = version;
        disabled.enabled = Some(false);
    }
}

/// `Some(true)` when the flag is given, otherwise inherit
pub fn flag(set: bool) -> Option<bool> {
    set.then_some(true)
}

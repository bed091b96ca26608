// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Controller configuration (`strata.toml`)
//!
//! Every section is optional. Durations are written in human form
//! (`20m`, `15s`, `1h 30m`).

use crate::conditions::Thresholds;
use crate::sync_window::{SyncWindow, SyncWindowError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid value for {field}: {message}")]
    Invalid { field: String, message: String },
    #[error("sync window {index}: {source}")]
    SyncWindow {
        index: usize,
        source: SyncWindowError,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub timers: TimerConfig,
    pub controller: ControllerSettings,
    pub runner: RunnerConfig,
    pub store: StoreConfig,
    pub artifacts: ArtifactConfig,
    pub log: LogConfig,
    /// Windows applied to every repository
    pub sync_windows: Vec<SyncWindow>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimerConfig {
    #[serde(with = "humantime_serde")]
    pub drift_detection: Duration,
    #[serde(with = "humantime_serde")]
    pub on_error: Duration,
    #[serde(with = "humantime_serde")]
    pub wait_action: Duration,
    #[serde(with = "humantime_serde")]
    pub failure_grace_period: Duration,
    /// Upper bound on one reconciliation, external calls included
    #[serde(with = "humantime_serde")]
    pub reconcile_deadline: Duration,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            drift_detection: Duration::from_secs(20 * 60),
            on_error: Duration::from_secs(60),
            wait_action: Duration::from_secs(60),
            failure_grace_period: Duration::from_secs(15),
            reconcile_deadline: Duration::from_secs(30),
        }
    }
}

impl TimerConfig {
    pub fn thresholds(&self) -> Thresholds {
        Thresholds {
            drift_detection: self.drift_detection,
            failure_grace_period: self.failure_grace_period,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ControllerSettings {
    pub max_concurrent_reconciles: usize,
    #[serde(with = "humantime_serde")]
    pub resync_interval: Duration,
    /// How often the store is scanned for changed objects
    #[serde(with = "humantime_serde")]
    pub watch_interval: Duration,
    pub default_max_retries: u32,
    pub default_keep_last_runs: usize,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            max_concurrent_reconciles: 4,
            resync_interval: Duration::from_secs(5 * 60),
            watch_interval: Duration::from_secs(2),
            default_max_retries: 5,
            default_keep_last_runs: 5,
        }
    }
}

/// Command run by the local process launcher for each pod
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunnerConfig {
    pub command: String,
    pub args: Vec<String>,
    pub env: BTreeMap<String, String>,
    /// Default image, overridden by repositories and layers
    pub image: Option<String>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            command: "strata-runner".to_string(),
            args: Vec::new(),
            env: BTreeMap::new(),
            image: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(".strata/store"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ArtifactConfig {
    pub path: PathBuf,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(".strata/artifacts"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    pub path: PathBuf,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(".strata/stratad.log"),
        }
    }
}

impl Config {
    /// Parse and validate configuration from TOML content
    pub fn parse(content: &str) -> Result<Config, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    /// Load from `path` if it exists, otherwise use defaults
    pub fn load_or_default(path: &Path) -> Result<Config, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Config::default())
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.controller.max_concurrent_reconciles == 0 {
            return Err(invalid("controller.max_concurrent_reconciles", "must be at least 1"));
        }
        if self.timers.reconcile_deadline.is_zero() {
            return Err(invalid("timers.reconcile_deadline", "must be positive"));
        }
        if self.controller.resync_interval.is_zero() {
            return Err(invalid("controller.resync_interval", "must be positive"));
        }
        if self.controller.watch_interval.is_zero() {
            return Err(invalid("controller.watch_interval", "must be positive"));
        }
        if self.runner.command.trim().is_empty() {
            return Err(invalid("runner.command", "must not be empty"));
        }
        for (index, window) in self.sync_windows.iter().enumerate() {
            window
                .validate()
                .map_err(|source| ConfigError::SyncWindow { index, source })?;
        }
        Ok(())
    }
}

fn invalid(field: &str, message: &str) -> ConfigError {
    ConfigError::Invalid {
        field: field.to_string(),
        message: message.to_string(),
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;

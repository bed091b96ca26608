// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Plan artifact storage
//!
//! Runners upload the rendered plan of each attempt; the engine only reads
//! a short text summary back for `status.last_result`.

mod fs;

pub use fs::FsArtifactStore;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{ArtifactCall, FakeArtifactStore};

use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

/// Errors from artifact operations
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("artifact not found: {0}")]
    NotFound(String),
    #[error("invalid artifact path segment: {0:?}")]
    InvalidName(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Rendering of a stored plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlanFormat {
    /// Human-readable summary printed by the tool
    Short,
    /// Full textual plan
    Text,
    Json,
}

impl PlanFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            PlanFormat::Short => "short",
            PlanFormat::Text => "log",
            PlanFormat::Json => "json",
        }
    }
}

impl fmt::Display for PlanFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl std::str::FromStr for PlanFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "short" => Ok(PlanFormat::Short),
            "text" | "log" => Ok(PlanFormat::Text),
            "json" => Ok(PlanFormat::Json),
            _ => Err(format!("unknown plan format: {}", s)),
        }
    }
}

/// Identifies the plan of one run attempt
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PlanRef {
    pub namespace: String,
    pub layer: String,
    pub run: String,
    pub attempt: u32,
}

impl PlanRef {
    pub fn new(namespace: &str, layer: &str, run: &str, attempt: u32) -> Self {
        Self {
            namespace: namespace.to_string(),
            layer: layer.to_string(),
            run: run.to_string(),
            attempt,
        }
    }
}

impl fmt::Display for PlanRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.namespace, self.layer, self.run, self.attempt
        )
    }
}

/// Adapter for plan artifacts
#[async_trait]
pub trait ArtifactStore: Clone + Send + Sync + 'static {
    async fn get_plan(&self, plan: &PlanRef, format: PlanFormat) -> Result<String, ArtifactError>;

    async fn put_plan(
        &self,
        plan: &PlanRef,
        format: PlanFormat,
        content: &str,
    ) -> Result<(), ArtifactError>;
}

#[cfg(test)]
#[path = "artifacts_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Directory-backed artifact store
//!
//! Layout: `<base>/<namespace>/<layer>/<run>/<attempt>/plan.<ext>`

use super::{ArtifactError, ArtifactStore, PlanFormat, PlanRef};
use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    base_path: PathBuf,
}

impl FsArtifactStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn plan_path(&self, plan: &PlanRef, format: PlanFormat) -> Result<PathBuf, ArtifactError> {
        for segment in [&plan.namespace, &plan.layer, &plan.run] {
            if segment.is_empty()
                || segment.starts_with('.')
                || segment.contains(['/', '\\'])
            {
                return Err(ArtifactError::InvalidName(segment.clone()));
            }
        }
        Ok(self
            .base_path
            .join(&plan.namespace)
            .join(&plan.layer)
            .join(&plan.run)
            .join(plan.attempt.to_string())
            .join(format!("plan.{}", format.extension())))
    }
}

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    async fn get_plan(&self, plan: &PlanRef, format: PlanFormat) -> Result<String, ArtifactError> {
        let path = self.plan_path(plan, format)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(ArtifactError::NotFound(format!("{} ({})", plan, format)))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn put_plan(
        &self,
        plan: &PlanRef,
        format: PlanFormat,
        content: &str,
    ) -> Result<(), ArtifactError> {
        let path = self.plan_path(plan, format)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, content).await?;
        Ok(())
    }
}

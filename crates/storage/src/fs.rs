// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! JSON file-based resource store
//!
//! Objects live at `<base>/<kind>/<namespace>/<name>.json`. Several
//! processes (the daemon and CLI invocations) may share one directory:
//!
//! - files are always written to a temp file and then moved into place, so
//!   readers never see a partial object
//! - `create` links the temp file without clobbering, so exactly one
//!   concurrent creator wins
//! - `update` and `delete` hold an exclusive lock on `<base>/.lock` while
//!   they compare versions and write

use crate::{ResourceStore, StoreError};
use async_trait::async_trait;
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use strata_core::{ObjectKey, Resource};
use tempfile::NamedTempFile;

#[derive(Clone)]
pub struct FsStore {
    base_path: PathBuf,
}

impl FsStore {
    /// Open a store at the given path, creating it if needed
    pub fn open(base_path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let base_path = base_path.into();
        fs::create_dir_all(&base_path)?;
        Ok(Self { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn path_for(&self, kind: &str, key: &ObjectKey) -> Result<PathBuf, StoreError> {
        validate_segment(&key.namespace)?;
        validate_segment(&key.name)?;
        Ok(self
            .base_path
            .join(kind)
            .join(&key.namespace)
            .join(format!("{}.json", key.name)))
    }

    /// Take the store-wide write lock; released when the file is dropped
    fn write_lock(&self) -> Result<File, StoreError> {
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.base_path.join(".lock"))?;
        file.lock_exclusive()?;
        Ok(file)
    }

    fn read<R: Resource>(path: &Path) -> Result<Option<R>, StoreError> {
        match fs::read_to_string(path) {
            Ok(json) => Ok(Some(serde_json::from_str(&json)?)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Serialize into a temp file next to `path`
    fn stage<R: Resource>(path: &Path, object: &R) -> Result<NamedTempFile, StoreError> {
        let dir = path
            .parent()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "object path has no parent"))?;
        fs::create_dir_all(dir)?;
        let mut tmp = NamedTempFile::new_in(dir)?;
        let json = serde_json::to_string_pretty(object)?;
        tmp.write_all(json.as_bytes())?;
        tmp.as_file().sync_all()?;
        Ok(tmp)
    }
}

/// Reject names that would escape their directory
fn validate_segment(segment: &str) -> Result<(), StoreError> {
    let bad = segment.is_empty()
        || segment == "."
        || segment == ".."
        || segment.starts_with('.')
        || segment.contains(['/', '\\', '\0']);
    if bad {
        return Err(StoreError::InvalidName(segment.to_string()));
    }
    Ok(())
}

fn json_files(dir: &Path) -> Result<Vec<PathBuf>, StoreError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    let mut paths = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.extension().map(|e| e == "json").unwrap_or(false) {
            paths.push(path);
        }
    }
    Ok(paths)
}

fn subdirs(dir: &Path) -> Result<Vec<PathBuf>, StoreError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    let mut dirs = Vec::new();
    for entry in entries {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            dirs.push(entry.path());
        }
    }
    Ok(dirs)
}

#[async_trait]
impl ResourceStore for FsStore {
    async fn get<R: Resource>(&self, key: &ObjectKey) -> Result<R, StoreError> {
        let path = self.path_for(R::KIND, key)?;
        Self::read(&path)?.ok_or_else(|| StoreError::NotFound {
            kind: R::KIND,
            key: key.clone(),
        })
    }

    async fn list<R: Resource>(&self, namespace: Option<&str>) -> Result<Vec<R>, StoreError> {
        let kind_dir = self.base_path.join(R::KIND);
        let namespaces = match namespace {
            Some(ns) => {
                validate_segment(ns)?;
                vec![kind_dir.join(ns)]
            }
            None => subdirs(&kind_dir)?,
        };

        let mut objects = Vec::new();
        for dir in namespaces {
            for path in json_files(&dir)? {
                // Deleted between read_dir and read
                if let Some(object) = Self::read::<R>(&path)? {
                    objects.push(object);
                }
            }
        }
        objects.sort_by_key(|o| o.key());
        Ok(objects)
    }

    async fn create<R: Resource>(&self, mut object: R) -> Result<R, StoreError> {
        let key = object.key();
        let path = self.path_for(R::KIND, &key)?;
        object.meta_mut().resource_version = 1;
        let tmp = Self::stage(&path, &object)?;
        match tmp.persist_noclobber(&path) {
            Ok(_) => Ok(object),
            Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => {
                Err(StoreError::AlreadyExists { kind: R::KIND, key })
            }
            Err(e) => Err(e.error.into()),
        }
    }

    async fn update<R: Resource>(&self, mut object: R) -> Result<R, StoreError> {
        let key = object.key();
        let path = self.path_for(R::KIND, &key)?;
        let _lock = self.write_lock()?;

        let Some(current) = Self::read::<R>(&path)? else {
            return Err(StoreError::NotFound { kind: R::KIND, key });
        };
        let expected = object.meta().resource_version;
        let actual = current.meta().resource_version;
        if expected != actual {
            return Err(StoreError::Conflict {
                kind: R::KIND,
                key,
                expected,
                actual,
            });
        }

        object.meta_mut().resource_version = actual + 1;
        let tmp = Self::stage(&path, &object)?;
        tmp.persist(&path).map_err(|e| e.error)?;
        Ok(object)
    }

    async fn delete<R: Resource>(&self, key: &ObjectKey) -> Result<(), StoreError> {
        let path = self.path_for(R::KIND, key)?;
        let _lock = self.write_lock()?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(StoreError::NotFound {
                kind: R::KIND,
                key: key.clone(),
            }),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
#[path = "fs_tests.rs"]
mod tests;

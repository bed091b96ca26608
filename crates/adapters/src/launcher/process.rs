// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Local process launcher
//!
//! Each pod is a child process running the configured runner command with
//! the job described in `STRATA_*` environment variables. Output goes to
//! `<state_dir>/pods/<pod>.log`. A record next to it holds the child's pid
//! while it runs and its exit status once it finishes, so the phase of a pod
//! survives a daemon restart.

use super::{JobLauncher, JobRequest, LaunchError};
use async_trait::async_trait;
use nix::errno::Errno;
use nix::sys::signal::kill;
use nix::unistd::Pid;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File};
use std::io;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use strata_core::{PodPhase, PodRef};
use tokio::process::{Child, Command};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessLauncherConfig {
    pub command: String,
    pub args: Vec<String>,
    pub env: BTreeMap<String, String>,
    pub state_dir: PathBuf,
}

#[derive(Debug, Serialize, Deserialize)]
struct PodRecord {
    phase: PodPhase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pid: Option<u32>,
    exit_code: Option<i32>,
}

/// Whether a process spawned by an earlier launcher is still alive
fn pid_alive(pid: u32) -> bool {
    let Ok(raw) = i32::try_from(pid) else {
        return false;
    };
    match kill(Pid::from_raw(raw), None) {
        Ok(()) => true,
        Err(Errno::EPERM) => true,
        Err(_) => false,
    }
}

#[derive(Clone)]
pub struct ProcessLauncher {
    config: Arc<ProcessLauncherConfig>,
    children: Arc<Mutex<HashMap<PodRef, Child>>>,
}

impl ProcessLauncher {
    pub fn new(config: ProcessLauncherConfig) -> Result<Self, LaunchError> {
        fs::create_dir_all(config.state_dir.join("pods"))?;
        Ok(Self {
            config: Arc::new(config),
            children: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    fn record_path(&self, pod: &PodRef) -> PathBuf {
        self.config.state_dir.join("pods").join(format!("{}.json", pod))
    }

    pub fn log_path(&self, pod: &PodRef) -> PathBuf {
        self.config.state_dir.join("pods").join(format!("{}.log", pod))
    }

    fn read_record(&self, pod: &PodRef) -> Result<Option<PodRecord>, LaunchError> {
        match fs::read_to_string(self.record_path(pod)) {
            Ok(json) => serde_json::from_str(&json)
                .map(Some)
                .map_err(|e| LaunchError::Io(io::Error::new(io::ErrorKind::InvalidData, e))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write_record(&self, pod: &PodRef, record: &PodRecord) -> Result<(), LaunchError> {
        let json = serde_json::to_string(record)
            .map_err(|e| LaunchError::Io(io::Error::new(io::ErrorKind::InvalidData, e)))?;
        fs::write(self.record_path(pod), json)?;
        Ok(())
    }
}

#[async_trait]
impl JobLauncher for ProcessLauncher {
    async fn submit(&self, request: JobRequest) -> Result<PodRef, LaunchError> {
        let pod = request.pod.clone();
        let mut children = self.children.lock().unwrap_or_else(|e| e.into_inner());
        if children.contains_key(&pod) || self.record_path(&pod).exists() {
            tracing::debug!(%pod, "pod already exists");
            return Ok(pod);
        }

        let log = File::create(self.log_path(&pod))?;
        let log_err = log.try_clone()?;
        let child = Command::new(&self.config.command)
            .args(&self.config.args)
            .args(&request.args)
            .envs(&self.config.env)
            .envs(request.job_env())
            .stdin(Stdio::null())
            .stdout(Stdio::from(log))
            .stderr(Stdio::from(log_err))
            .spawn()
            .map_err(|e| LaunchError::SpawnFailed {
                pod: pod.clone(),
                message: e.to_string(),
            })?;

        let record = PodRecord {
            phase: PodPhase::Running,
            pid: child.id(),
            exit_code: None,
        };
        if let Err(e) = self.write_record(&pod, &record) {
            tracing::warn!(%pod, error = %e, "failed to record running pod");
        }
        children.insert(pod.clone(), child);
        Ok(pod)
    }

    async fn phase(&self, pod: &PodRef) -> Result<Option<PodPhase>, LaunchError> {
        let exited = {
            let mut children = self.children.lock().unwrap_or_else(|e| e.into_inner());
            match children.get_mut(pod) {
                Some(child) => match child.try_wait()? {
                    None => return Ok(Some(PodPhase::Running)),
                    Some(status) => {
                        children.remove(pod);
                        Some(status)
                    }
                },
                None => None,
            }
        };

        if let Some(status) = exited {
            let phase = if status.success() {
                PodPhase::Succeeded
            } else {
                PodPhase::Failed
            };
            self.write_record(
                pod,
                &PodRecord {
                    phase,
                    pid: None,
                    exit_code: status.code(),
                },
            )?;
            return Ok(Some(phase));
        }

        // Spawned by an earlier launcher: only the record knows about it
        let Some(record) = self.read_record(pod)? else {
            return Ok(None);
        };
        if !record.phase.is_active() {
            return Ok(Some(record.phase));
        }
        if record.pid.is_some_and(pid_alive) {
            return Ok(Some(PodPhase::Running));
        }

        // Exited while nobody was watching; the exit status is lost
        tracing::warn!(%pod, pid = ?record.pid, "pod process vanished");
        self.write_record(
            pod,
            &PodRecord {
                phase: PodPhase::Failed,
                pid: None,
                exit_code: None,
            },
        )?;
        Ok(Some(PodPhase::Failed))
    }
}

#[cfg(test)]
#[path = "process_tests.rs"]
mod tests;

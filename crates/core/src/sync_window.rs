// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sync windows: cron-scheduled periods that allow or deny launching runs
//!
//! A window is active from each cron tick for `duration`. Deny windows win
//! over allow windows; when any allow window matches a layer, the layer may
//! only run while one of them is active.

use crate::clock::{add_duration, sub_duration};
use crate::resource::Action;
use chrono::{DateTime, Utc};
use cron::Schedule;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowKind {
    Allow,
    Deny,
}

impl fmt::Display for WindowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WindowKind::Allow => f.write_str("allow"),
            WindowKind::Deny => f.write_str("deny"),
        }
    }
}

/// A scheduled allow or deny window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncWindow {
    pub kind: WindowKind,
    /// Cron expression, five fields (minute first) or six (seconds first)
    pub schedule: String,
    /// How long the window stays open after each tick, e.g. `1h30m`
    pub duration: String,
    /// Layer name globs; `*` matches every layer
    #[serde(default)]
    pub layers: Vec<String>,
    /// Actions the window applies to; empty means all
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<Action>,
}

#[derive(Debug, Error)]
pub enum SyncWindowError {
    #[error("invalid cron schedule {schedule:?}: {message}")]
    Schedule { schedule: String, message: String },
    #[error("invalid duration {duration:?}: {message}")]
    Duration { duration: String, message: String },
}

/// Why a layer is blocked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockReason {
    InsideDenyWindow,
    OutsideAllowWindow,
}

impl fmt::Display for BlockReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockReason::InsideDenyWindow => f.write_str("inside deny window"),
            BlockReason::OutsideAllowWindow => f.write_str("outside allow window"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncVerdict {
    pub blocked: bool,
    pub reason: Option<BlockReason>,
}

impl SyncVerdict {
    pub const ALLOWED: SyncVerdict = SyncVerdict {
        blocked: false,
        reason: None,
    };

    fn blocked(reason: BlockReason) -> Self {
        Self {
            blocked: true,
            reason: Some(reason),
        }
    }
}

impl SyncWindow {
    /// Parse the cron schedule, accepting five-field expressions
    pub fn parse_schedule(&self) -> Result<Schedule, SyncWindowError> {
        let normalized = if self.schedule.split_whitespace().count() == 5 {
            format!("0 {}", self.schedule)
        } else {
            self.schedule.clone()
        };
        Schedule::from_str(&normalized).map_err(|e| SyncWindowError::Schedule {
            schedule: self.schedule.clone(),
            message: e.to_string(),
        })
    }

    pub fn parse_duration(&self) -> Result<Duration, SyncWindowError> {
        humantime::parse_duration(self.duration.trim()).map_err(|e| SyncWindowError::Duration {
            duration: self.duration.clone(),
            message: e.to_string(),
        })
    }

    /// Check both schedule and duration parse
    pub fn validate(&self) -> Result<(), SyncWindowError> {
        self.parse_schedule()?;
        self.parse_duration()?;
        Ok(())
    }

    /// Whether the window is open at `now`
    pub fn is_active(&self, now: DateTime<Utc>) -> Result<bool, SyncWindowError> {
        let schedule = self.parse_schedule()?;
        let duration = self.parse_duration()?;
        let from = sub_duration(now, duration);
        let Some(start) = schedule.after(&from).next() else {
            return Ok(false);
        };
        if start > now {
            return Ok(false);
        }
        // An end past the representable range means the window never closes
        Ok(add_duration(start, duration).map_or(true, |end| now < end))
    }

    pub fn matches_layer(&self, layer_name: &str) -> bool {
        self.layers
            .iter()
            .any(|pattern| pattern == "*" || glob_match(pattern, layer_name))
    }

    pub fn applies_to(&self, action: Action) -> bool {
        self.actions.is_empty() || self.actions.contains(&action)
    }

    fn is_well_formed(&self) -> bool {
        match self.validate() {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(kind = %self.kind, error = %e, "ignoring malformed sync window");
                false
            }
        }
    }
}

/// Windows that apply to `action`
pub fn windows_for_action(windows: &[SyncWindow], action: Action) -> Vec<SyncWindow> {
    windows
        .iter()
        .filter(|w| w.applies_to(action))
        .cloned()
        .collect()
}

/// Decide whether a layer may launch a run at `now`
pub fn is_sync_blocked(windows: &[SyncWindow], layer_name: &str, now: DateTime<Utc>) -> SyncVerdict {
    let matching: Vec<&SyncWindow> = windows
        .iter()
        .filter(|w| w.matches_layer(layer_name))
        .filter(|w| w.is_well_formed())
        .collect();
    if matching.is_empty() {
        return SyncVerdict::ALLOWED;
    }

    let deny_active = matching
        .iter()
        .filter(|w| w.kind == WindowKind::Deny)
        .any(|w| w.is_active(now).unwrap_or(false));
    if deny_active {
        return SyncVerdict::blocked(BlockReason::InsideDenyWindow);
    }

    let mut allows = matching.iter().filter(|w| w.kind == WindowKind::Allow).peekable();
    if allows.peek().is_none() {
        return SyncVerdict::ALLOWED;
    }
    if allows.any(|w| w.is_active(now).unwrap_or(false)) {
        SyncVerdict::ALLOWED
    } else {
        SyncVerdict::blocked(BlockReason::OutsideAllowWindow)
    }
}

/// Shell-style glob supporting `*` (any run) and `?` (one char)
pub fn glob_match(pattern: &str, name: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let n: Vec<char> = name.chars().collect();
    let (mut pi, mut ni) = (0, 0);
    let mut star: Option<(usize, usize)> = None;

    while ni < n.len() {
        match p.get(pi) {
            Some('*') => {
                star = Some((pi, ni));
                pi += 1;
            }
            Some(&c) if c == '?' || c == n[ni] => {
                pi += 1;
                ni += 1;
            }
            _ => match star {
                // Backtrack: let the last star swallow one more char
                Some((sp, sn)) => {
                    pi = sp + 1;
                    ni = sn + 1;
                    star = Some((sp, sn + 1));
                }
                None => return false,
            },
        }
    }
    p[pi..].iter().all(|&c| c == '*')
}

#[cfg(test)]
#[path = "sync_window_tests.rs"]
mod tests;

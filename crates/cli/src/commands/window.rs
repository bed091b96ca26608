// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sync window commands

use super::Context;
use crate::output::print;
use anyhow::Context as _;
use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};
use serde::Serialize;
use std::fmt;
use strata_core::{
    is_sync_blocked, windows_for_action, Action, BlockReason, Clock, Layer, Repository,
};

#[derive(Args)]
pub struct WindowArgs {
    #[command(subcommand)]
    pub command: WindowCommand,
}

#[derive(Subcommand)]
pub enum WindowCommand {
    /// Check whether a layer may launch a run
    Check {
        /// Layer name
        layer: String,
        /// Action to check
        #[arg(long, default_value = "plan")]
        action: Action,
        /// Instant to check (RFC 3339), defaults to now
        #[arg(long)]
        at: Option<String>,
    },
}

#[derive(Serialize)]
struct WindowVerdict {
    layer: String,
    action: Action,
    at: DateTime<Utc>,
    blocked: bool,
    reason: Option<BlockReason>,
}

impl fmt::Display for WindowVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.reason {
            Some(reason) if self.blocked => writeln!(
                f,
                "{} {} blocked at {}: {}",
                self.layer,
                self.action,
                self.at.to_rfc3339(),
                reason
            ),
            _ => writeln!(
                f,
                "{} {} allowed at {}",
                self.layer,
                self.action,
                self.at.to_rfc3339()
            ),
        }
    }
}

pub async fn handle(command: WindowCommand, ctx: &Context) -> anyhow::Result<()> {
    match command {
        WindowCommand::Check { layer, action, at } => {
            let at = match at {
                Some(at) => DateTime::parse_from_rfc3339(&at)
                    .with_context(|| format!("invalid --at timestamp {:?}", at))?
                    .with_timezone(&Utc),
                None => ctx.clock.now(),
            };
            let l: Layer = ctx.get("layer", &layer).await?;
            let repo: Repository = ctx.get("repo", &l.spec.repository).await?;

            let mut windows = repo.spec.sync_windows.clone();
            windows.extend(ctx.config.sync_windows.iter().cloned());
            let verdict = is_sync_blocked(&windows_for_action(&windows, action), &layer, at);

            print(
                &WindowVerdict {
                    layer,
                    action,
                    at,
                    blocked: verdict.blocked,
                    reason: verdict.reason,
                },
                ctx.format,
            );
        }
    }
    Ok(())
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run commands

use super::Context;
use crate::output::print_list;
use clap::{Args, Subcommand};
use serde::Serialize;
use std::fmt;
use strata_core::Run;
use strata_storage::ResourceStore;

#[derive(Args)]
pub struct RunArgs {
    #[command(subcommand)]
    pub command: RunCommand,
}

#[derive(Subcommand)]
pub enum RunCommand {
    /// List runs, newest first
    List {
        /// Only runs of this layer
        #[arg(long)]
        layer: Option<String>,
    },
}

#[derive(Serialize)]
struct RunInfo {
    name: String,
    layer: String,
    action: String,
    state: String,
    retries: u32,
    pod: String,
}

impl fmt::Display for RunInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<32} {:<20} {:<6} {:<10} {:<7} {}",
            self.name, self.layer, self.action, self.state, self.retries, self.pod
        )
    }
}

pub async fn handle(command: RunCommand, ctx: &Context) -> anyhow::Result<()> {
    match command {
        RunCommand::List { layer } => {
            let mut runs: Vec<Run> = ctx.store.list(Some(&ctx.namespace)).await?;
            runs.retain(|run| layer.as_ref().map_or(true, |l| &run.spec.layer == l));
            runs.sort_by(|a, b| {
                b.metadata
                    .creation_timestamp
                    .cmp(&a.metadata.creation_timestamp)
                    .then_with(|| a.metadata.name.cmp(&b.metadata.name))
            });

            let rows: Vec<RunInfo> = runs
                .into_iter()
                .map(|run| RunInfo {
                    pod: run
                        .status
                        .pod
                        .as_ref()
                        .map(|p| p.to_string())
                        .unwrap_or_else(|| "-".to_string()),
                    name: run.metadata.name,
                    layer: run.spec.layer,
                    action: run.spec.action.to_string(),
                    state: run.status.state.to_string(),
                    retries: run.status.retries,
                })
                .collect();
            print_list(
                &rows,
                &format!(
                    "{:<32} {:<20} {:<6} {:<10} {:<7} {}",
                    "NAME", "LAYER", "ACTION", "STATE", "RETRIES", "POD"
                ),
                "No runs",
                ctx.format,
            );
        }
    }
    Ok(())
}

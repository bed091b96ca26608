// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runner result reporting
//!
//! Runners call `strata report` after a successful plan or apply so the
//! layer's tracking annotations reflect what was executed. The plan summary
//! is stored for the run's current attempt, where the daemon reads it for
//! the layer's `last_result`.

use super::Context;
use crate::error::CliError;
use crate::output::print_done;
use anyhow::Context as _;
use clap::{Args, Subcommand};
use std::path::PathBuf;
use strata_adapters::{ArtifactStore, PlanFormat, PlanRef};
use strata_core::{Action, Clock, Layer, Run};

#[derive(Args)]
pub struct ReportArgs {
    #[command(subcommand)]
    pub command: ReportCommand,
}

#[derive(Subcommand)]
pub enum ReportCommand {
    /// Record a successful plan
    Plan {
        /// Run name
        run: String,
        /// Checksum of the plan
        #[arg(long)]
        checksum: String,
        /// One-line plan summary
        #[arg(long, conflicts_with = "summary_file")]
        summary: Option<String>,
        /// File holding the plan summary
        #[arg(long)]
        summary_file: Option<PathBuf>,
        /// Plan artifacts to store, as FORMAT=PATH (short, text, json)
        #[arg(long = "artifact", value_parser = parse_artifact)]
        artifacts: Vec<(PlanFormat, PathBuf)>,
    },
    /// Record a successful apply
    Apply {
        /// Run name
        run: String,
        /// Checksum of the applied plan
        #[arg(long)]
        checksum: String,
    },
}

fn parse_artifact(s: &str) -> Result<(PlanFormat, PathBuf), String> {
    let (format, path) = s
        .split_once('=')
        .ok_or_else(|| format!("expected FORMAT=PATH, got {:?}", s))?;
    let format = format.parse::<PlanFormat>().map_err(|e| e.to_string())?;
    Ok((format, PathBuf::from(path)))
}

pub async fn handle(command: ReportCommand, ctx: &Context) -> anyhow::Result<()> {
    match command {
        ReportCommand::Plan {
            run,
            checksum,
            summary,
            summary_file,
            artifacts,
        } => {
            let run: Run = ctx.get("run", &run).await?;
            expect_action(&run, Action::Plan)?;

            let summary = match summary_file {
                Some(path) => Some(
                    std::fs::read_to_string(&path)
                        .with_context(|| format!("reading {}", path.display()))?,
                ),
                None => summary,
            };
            let plan = PlanRef::new(
                &run.metadata.namespace,
                &run.spec.layer,
                &run.metadata.name,
                run.status.retries,
            );
            if let Some(summary) = summary {
                ctx.artifacts
                    .put_plan(&plan, PlanFormat::Short, &summary)
                    .await?;
            }
            for (format, path) in artifacts {
                let content = std::fs::read_to_string(&path)
                    .with_context(|| format!("reading {}", path.display()))?;
                ctx.artifacts.put_plan(&plan, format, &content).await?;
            }

            let now = ctx.clock.now();
            let commit = run.spec.commit.clone();
            let layer: Layer = ctx
                .update("layer", &run.spec.layer, |l: &mut Layer| {
                    l.annotations.last_plan_date = Some(now);
                    l.annotations.last_plan_commit = commit.clone();
                    l.annotations.last_plan_checksum = Some(checksum.clone());
                })
                .await?;
            print_done(
                &format!(
                    "Recorded plan {} for layer '{}'",
                    checksum, layer.metadata.name
                ),
                &layer,
                ctx.format,
            );
        }
        ReportCommand::Apply { run, checksum } => {
            let run: Run = ctx.get("run", &run).await?;
            expect_action(&run, Action::Apply)?;

            let layer: Layer = ctx
                .update("layer", &run.spec.layer, |l: &mut Layer| {
                    l.annotations.last_apply_checksum = Some(checksum.clone());
                })
                .await?;
            print_done(
                &format!(
                    "Recorded apply {} for layer '{}'",
                    checksum, layer.metadata.name
                ),
                &layer,
                ctx.format,
            );
        }
    }
    Ok(())
}

fn expect_action(run: &Run, expected: Action) -> anyhow::Result<()> {
    if run.spec.action != expected {
        return Err(CliError::action_mismatch(
            &run.metadata.name,
            expected.as_str(),
            run.spec.action.as_str(),
        )
        .into());
    }
    Ok(())
}

#[cfg(test)]
#[path = "report_tests.rs"]
mod tests;

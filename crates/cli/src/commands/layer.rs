// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Layer commands
//!
//! `sync` and `approve` set the manual trigger annotations; `push` records a
//! commit the way a git hook would. The daemon reacts to all three exactly
//! as it does to derived triggers.

use super::repo::tool_label;
use super::{flag, Context, ToolArg};
use crate::output::{print, print_done, print_list};
use clap::{Args, Subcommand};
use serde::Serialize;
use std::fmt;
use strata_core::resource::LayerSpec;
use strata_core::{Clock, Layer, ObjectMeta, Repository};
use strata_storage::ResourceStore;

#[derive(Args)]
pub struct LayerArgs {
    #[command(subcommand)]
    pub command: LayerCommand,
}

#[derive(Subcommand)]
pub enum LayerCommand {
    /// Add a layer of a registered repository
    Add {
        /// Layer name
        name: String,
        /// Repository the layer lives in
        #[arg(long)]
        repo: String,
        /// Directory of the layer inside the repository
        #[arg(long)]
        path: String,
        /// Branch to follow
        #[arg(long, default_value = "main")]
        branch: String,
        /// Tool override
        #[arg(long, value_enum)]
        tool: Option<ToolArg>,
        /// Tool version
        #[arg(long, requires = "tool")]
        version: Option<String>,
        /// Apply automatically after a plan with changes
        #[arg(long)]
        auto_apply: bool,
        /// Runs to keep in history
        #[arg(long)]
        keep_last_runs: Option<usize>,
        /// Retries before a run fails
        #[arg(long)]
        max_retries: Option<u32>,
    },
    /// List layers
    List,
    /// Show a layer with its conditions and run history
    Show {
        /// Layer name
        name: String,
    },
    /// Request a plan now
    Sync {
        /// Layer name
        name: String,
    },
    /// Approve applying the current plan
    Approve {
        /// Layer name
        name: String,
    },
    /// Record a commit pushed to the layer's branch
    Push {
        /// Layer name
        name: String,
        /// Commit SHA
        commit: String,
        /// The commit does not touch the layer's path
        #[arg(long)]
        unrelated: bool,
    },
}

#[derive(Serialize)]
struct LayerInfo {
    name: String,
    repository: String,
    path: String,
    state: String,
    last_result: String,
}

impl LayerInfo {
    fn from_layer(layer: &Layer) -> Self {
        Self {
            name: layer.metadata.name.clone(),
            repository: layer.spec.repository.clone(),
            path: layer.spec.path.clone(),
            state: if layer.status.state.is_empty() {
                "-".to_string()
            } else {
                layer.status.state.clone()
            },
            last_result: layer.status.last_result.clone(),
        }
    }
}

impl fmt::Display for LayerInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<20} {:<16} {:<20} {:<19} {}",
            self.name, self.repository, self.path, self.state, self.last_result
        )
    }
}

struct LayerDetail<'a>(&'a Layer);

impl Serialize for LayerDetail<'_> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl fmt::Display for LayerDetail<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let layer = self.0;
        let annotations = &layer.annotations;
        writeln!(f, "Layer: {}", layer.metadata.key())?;
        writeln!(f, "Repository: {}", layer.spec.repository)?;
        writeln!(f, "Path: {}", layer.spec.path)?;
        writeln!(f, "Branch: {}", layer.spec.branch)?;
        writeln!(
            f,
            "Tool: {}",
            tool_label(&layer.spec.terraform, &layer.spec.opentofu)
        )?;
        writeln!(f, "State: {}", layer.status.state)?;
        if !layer.status.last_result.is_empty() {
            writeln!(f, "Last result: {}", layer.status.last_result)?;
        }

        writeln!(f)?;
        writeln!(f, "Tracking:")?;
        let fields = [
            ("last_plan_date", annotations.last_plan_date.map(|d| d.to_rfc3339())),
            ("last_plan_commit", annotations.last_plan_commit.clone()),
            ("last_plan_checksum", annotations.last_plan_checksum.clone()),
            ("last_apply_checksum", annotations.last_apply_checksum.clone()),
            ("last_branch_commit", annotations.last_branch_commit.clone()),
            ("last_relevant_commit", annotations.last_relevant_commit.clone()),
            ("failure_count", annotations.failure_count.map(|n| n.to_string())),
            ("last_failure_date", annotations.last_failure_date.map(|d| d.to_rfc3339())),
        ];
        for (name, value) in fields {
            if let Some(value) = value {
                writeln!(f, "  {}: {}", name, value)?;
            }
        }
        if annotations.sync_now {
            writeln!(f, "  sync_now: true")?;
        }
        if annotations.apply_now {
            writeln!(f, "  apply_now: true")?;
        }

        if !layer.status.conditions.is_empty() {
            writeln!(f)?;
            writeln!(f, "Conditions:")?;
            for condition in &layer.status.conditions {
                writeln!(
                    f,
                    "  {:<28} {:<5} {:?}",
                    condition.kind.as_str(),
                    condition.status,
                    condition.reason
                )?;
            }
        }

        if !layer.status.latest_runs.is_empty() {
            writeln!(f)?;
            writeln!(f, "Runs:")?;
            for run in &layer.status.latest_runs {
                writeln!(
                    f,
                    "  {:<32} {:<6} {:<10} {}",
                    run.name,
                    run.action,
                    run.commit.as_deref().unwrap_or("-"),
                    run.date.to_rfc3339()
                )?;
            }
        }
        Ok(())
    }
}

pub async fn handle(command: LayerCommand, ctx: &Context) -> anyhow::Result<()> {
    match command {
        LayerCommand::Add {
            name,
            repo,
            path,
            branch,
            tool,
            version,
            auto_apply,
            keep_last_runs,
            max_retries,
        } => {
            // The repository must exist; layers inherit from it
            let _: Repository = ctx.get("repo", &repo).await?;

            let mut spec = LayerSpec {
                repository: repo,
                path,
                branch,
                terraform: Default::default(),
                opentofu: Default::default(),
                remediation_strategy: Default::default(),
                runner: Default::default(),
                keep_last_runs,
            };
            if let Some(tool) = tool {
                tool.configure(version, &mut spec.terraform, &mut spec.opentofu);
            }
            spec.remediation_strategy.auto_apply = flag(auto_apply);
            spec.remediation_strategy.on_error.max_retries = max_retries;

            let meta = ObjectMeta::new(&ctx.namespace, &name).created_at(ctx.clock.now());
            let layer = ctx.create("layer", Layer::new(meta, spec)).await?;
            print_done(
                &format!("Layer '{}' created", layer.metadata.key()),
                &layer,
                ctx.format,
            );
        }
        LayerCommand::List => {
            let mut layers: Vec<Layer> = ctx.store.list(Some(&ctx.namespace)).await?;
            layers.sort_by(|a, b| a.metadata.name.cmp(&b.metadata.name));
            let rows: Vec<LayerInfo> = layers.iter().map(LayerInfo::from_layer).collect();
            print_list(
                &rows,
                &format!(
                    "{:<20} {:<16} {:<20} {:<19} {}",
                    "NAME", "REPOSITORY", "PATH", "STATE", "LAST RESULT"
                ),
                "No layers",
                ctx.format,
            );
        }
        LayerCommand::Show { name } => {
            let layer: Layer = ctx.get("layer", &name).await?;
            print(&LayerDetail(&layer), ctx.format);
        }
        LayerCommand::Sync { name } => {
            let layer: Layer = ctx
                .update("layer", &name, |l: &mut Layer| l.annotations.sync_now = true)
                .await?;
            print_done(
                &format!("Plan requested for layer '{}'", name),
                &layer,
                ctx.format,
            );
        }
        LayerCommand::Approve { name } => {
            let layer: Layer = ctx
                .update("layer", &name, |l: &mut Layer| l.annotations.apply_now = true)
                .await?;
            print_done(
                &format!("Apply approved for layer '{}'", name),
                &layer,
                ctx.format,
            );
        }
        LayerCommand::Push {
            name,
            commit,
            unrelated,
        } => {
            let layer: Layer = ctx
                .update("layer", &name, |l: &mut Layer| {
                    l.annotations.last_branch_commit = Some(commit.clone());
                    if !unrelated {
                        l.annotations.last_relevant_commit = Some(commit.clone());
                    }
                })
                .await?;

            let now = ctx.clock.now();
            let branch = layer.spec.branch.clone();
            ctx.update("repo", &layer.spec.repository, |r: &mut Repository| {
                r.record_branch_commit(&branch, &commit, now)
            })
            .await?;

            print_done(
                &format!("Recorded commit {} for layer '{}'", commit, name),
                &layer,
                ctx.format,
            );
        }
    }
    Ok(())
}

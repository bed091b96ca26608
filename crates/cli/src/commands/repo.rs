// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Repository commands

use super::{flag, Context, ToolArg};
use crate::output::{print, print_done, print_list};
use clap::{Args, Subcommand};
use serde::Serialize;
use std::fmt;
use strata_core::resource::{RepositorySpec, ToolConfig};
use strata_core::{Clock, ObjectMeta, Repository};
use strata_storage::ResourceStore;

#[derive(Args)]
pub struct RepoArgs {
    #[command(subcommand)]
    pub command: RepoCommand,
}

#[derive(Subcommand)]
pub enum RepoCommand {
    /// Register a git repository
    Add {
        /// Repository name
        name: String,
        /// Clone URL
        #[arg(long)]
        url: String,
        /// Default tool for the repository's layers
        #[arg(long, value_enum)]
        tool: Option<ToolArg>,
        /// Tool version
        #[arg(long, requires = "tool")]
        version: Option<String>,
        /// Apply automatically after a plan with changes
        #[arg(long)]
        auto_apply: bool,
        /// Runs to keep per layer
        #[arg(long)]
        keep_last_runs: Option<usize>,
        /// Retries before a run fails
        #[arg(long)]
        max_retries: Option<u32>,
    },
    /// List repositories
    List,
    /// Show a repository and its branch sync status
    Show {
        /// Repository name
        name: String,
    },
}

#[derive(Serialize)]
struct RepoInfo {
    name: String,
    url: String,
    tool: String,
    branches: usize,
}

impl RepoInfo {
    fn from_repo(repo: &Repository) -> Self {
        Self {
            name: repo.metadata.name.clone(),
            url: repo.spec.url.clone(),
            tool: tool_label(&repo.spec.terraform, &repo.spec.opentofu),
            branches: repo.status.branches.len(),
        }
    }
}

impl fmt::Display for RepoInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<20} {:<10} {:<9} {}",
            self.name, self.tool, self.branches, self.url
        )
    }
}

struct RepoDetail<'a>(&'a Repository);

impl Serialize for RepoDetail<'_> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl fmt::Display for RepoDetail<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repo = self.0;
        writeln!(f, "Repository: {}", repo.metadata.key())?;
        writeln!(f, "URL: {}", repo.spec.url)?;
        writeln!(
            f,
            "Tool: {}",
            tool_label(&repo.spec.terraform, &repo.spec.opentofu)
        )?;
        if let Some(auto_apply) = repo.spec.remediation_strategy.auto_apply {
            writeln!(f, "Auto apply: {}", auto_apply)?;
        }
        if let Some(keep) = repo.spec.keep_last_runs {
            writeln!(f, "Keep last runs: {}", keep)?;
        }
        if !repo.spec.sync_windows.is_empty() {
            writeln!(f)?;
            writeln!(f, "Sync windows:")?;
            for window in &repo.spec.sync_windows {
                writeln!(
                    f,
                    "  {} {:?} for {} on {}",
                    window.kind,
                    window.schedule,
                    window.duration,
                    window.layers.join(",")
                )?;
            }
        }
        if !repo.status.branches.is_empty() {
            writeln!(f)?;
            writeln!(f, "Branches:")?;
            for branch in &repo.status.branches {
                writeln!(
                    f,
                    "  {:<20} {:<12} {:<8} {}",
                    branch.name,
                    branch.last_commit.as_deref().unwrap_or("-"),
                    branch.last_sync_status,
                    branch
                        .last_sync_date
                        .map(|d| d.to_rfc3339())
                        .unwrap_or_else(|| "-".to_string())
                )?;
            }
        }
        Ok(())
    }
}

/// `terraform 1.7.0`, `tofu`, `none` or `invalid`
pub(crate) fn tool_label(terraform: &ToolConfig, opentofu: &ToolConfig) -> String {
    let describe = |name: &str, config: &ToolConfig| match &config.version {
        Some(version) => format!("{} {}", name, version),
        None => name.to_string(),
    };
    match (
        terraform.enabled.unwrap_or(false),
        opentofu.enabled.unwrap_or(false),
    ) {
        (true, false) => describe("terraform", terraform),
        (false, true) => describe("tofu", opentofu),
        (true, true) => "invalid".to_string(),
        (false, false) => "none".to_string(),
    }
}

pub async fn handle(command: RepoCommand, ctx: &Context) -> anyhow::Result<()> {
    match command {
        RepoCommand::Add {
            name,
            url,
            tool,
            version,
            auto_apply,
            keep_last_runs,
            max_retries,
        } => {
            let mut spec = RepositorySpec {
                url,
                keep_last_runs,
                ..Default::default()
            };
            if let Some(tool) = tool {
                tool.configure(version, &mut spec.terraform, &mut spec.opentofu);
            }
            spec.remediation_strategy.auto_apply = flag(auto_apply);
            spec.remediation_strategy.on_error.max_retries = max_retries;

            let meta = ObjectMeta::new(&ctx.namespace, &name).created_at(ctx.clock.now());
            let repo = ctx.create("repo", Repository::new(meta, spec)).await?;
            print_done(
                &format!("Repository '{}' created", repo.metadata.key()),
                &repo,
                ctx.format,
            );
        }
        RepoCommand::List => {
            let mut repos: Vec<Repository> = ctx.store.list(Some(&ctx.namespace)).await?;
            repos.sort_by(|a, b| a.metadata.name.cmp(&b.metadata.name));
            let rows: Vec<RepoInfo> = repos.iter().map(RepoInfo::from_repo).collect();
            print_list(
                &rows,
                &format!("{:<20} {:<10} {:<9} {}", "NAME", "TOOL", "BRANCHES", "URL"),
                "No repositories",
                ctx.format,
            );
        }
        RepoCommand::Show { name } => {
            let repo: Repository = ctx.get("repo", &name).await?;
            print(&RepoDetail(&repo), ctx.format);
        }
    }
    Ok(())
}

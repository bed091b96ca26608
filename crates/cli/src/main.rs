// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! strata - inspect layers and runs, and trigger plans and applies

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod commands;
mod error;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{layer, repo, report, run, window, Context};
use std::path::PathBuf;
use std::process::ExitCode;

use crate::error::CliError;
use crate::output::OutputFormat;

#[derive(Parser)]
#[command(
    name = "strata",
    version,
    about = "Strata - reconcile Terraform and OpenTofu layers"
)]
struct Cli {
    /// Configuration file
    #[arg(short, long, global = true, default_value = "strata.toml")]
    config: PathBuf,

    /// Namespace of the objects
    #[arg(short, long, global = true, default_value = strata_core::resource::DEFAULT_NAMESPACE)]
    namespace: String,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,

    /// Log at info level instead of warn
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Repository management
    Repo(repo::RepoArgs),
    /// Layer management and manual triggers
    Layer(layer::LayerArgs),
    /// Run inspection
    Run(run::RunArgs),
    /// Report runner results
    Report(report::ReportArgs),
    /// Sync window evaluation
    Window(window::WindowArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match execute(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.downcast_ref::<CliError>() {
                Some(friendly) => eprint!("{}", friendly),
                None => eprintln!("error: {:#}", e),
            }
            ExitCode::FAILURE
        }
    }
}

async fn execute(cli: Cli) -> Result<()> {
    let ctx = Context::open(&cli.config, cli.namespace, cli.output)?;
    match cli.command {
        Commands::Repo(args) => repo::handle(args.command, &ctx).await,
        Commands::Layer(args) => layer::handle(args.command, &ctx).await,
        Commands::Run(args) => run::handle(args.command, &ctx).await,
        Commands::Report(args) => report::handle(args.command, &ctx).await,
        Commands::Window(args) => window::handle(args.command, &ctx).await,
    }
}

fn setup_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let default = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

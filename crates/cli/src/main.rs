// SPDX-License-Identifier: MIT

//! e3 - East Execution Engine CLI

mod commands;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{gc, init, package, run, workspace};
use e3_engine::Engine;
use output::OutputFormat;

#[derive(Parser)]
#[command(name = "e3", version, about = "East Execution Engine")]
struct Cli {
    /// Repository path (default: discovered per $E3_REPO, cwd ancestors, ~/.e3)
    #[arg(short = 'r', long = "repo", global = true)]
    repo: Option<PathBuf>,

    /// Output format
    #[arg(short = 'o', long = "output", value_enum, default_value_t, global = true)]
    output: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a fresh repository
    Init(init::InitArgs),
    /// Import and list packages
    Package(package::PackageArgs),
    /// Create, deploy, inspect, remove, and export workspaces
    Workspace(workspace::WorkspaceArgs),
    /// Start, watch, and cancel dataflow executions
    Run(run::RunArgs),
    /// Garbage-collect unreferenced objects
    Gc(gc::GcArgs),
}

#[tokio::main]
async fn main() {
    if let Err(e) = run_cli().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

async fn run_cli() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let format = cli.output;

    if let Commands::Init(args) = cli.command {
        return init::handle(args, format);
    }

    let engine = Engine::discover(cli.repo.as_deref())?;

    match cli.command {
        Commands::Init(_) => unreachable!("handled above"),
        Commands::Package(args) => package::handle(args.command, &engine, format),
        Commands::Workspace(args) => workspace::handle(args.command, &engine, format),
        Commands::Run(args) => run::handle(args.command, &engine, format).await,
        Commands::Gc(args) => gc::handle(args, &engine, format),
    }
}

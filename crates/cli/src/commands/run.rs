// SPDX-License-Identifier: MIT

//! `e3 run` — drive the orchestrator's `start/wait/status/cancel/events`
//! contract (`spec.md` §6.5) from the command line.

use anyhow::Result;
use clap::{Args, Subcommand};
use e3_engine::Engine;
use e3_scheduler::StartOptions;

use crate::output::{self, OutputFormat};

#[derive(Args)]
pub struct RunArgs {
    #[command(subcommand)]
    pub command: RunCommand,
}

#[derive(Subcommand)]
pub enum RunCommand {
    /// Start a dataflow execution over a workspace and wait for it to settle
    Start {
        workspace: String,
        /// Maximum number of tasks dispatched at once
        #[arg(long, default_value_t = 4)]
        concurrency: usize,
        /// Ignore cached execution records and re-run every task
        #[arg(long)]
        force: bool,
        /// Restrict the run to these task names (repeatable)
        #[arg(long = "task")]
        filter: Vec<String>,
        /// Return as soon as the execution starts instead of waiting
        #[arg(long)]
        no_wait: bool,
    },
    /// Print a compact status summary for the workspace's execution
    Status { workspace: String },
    /// Cancel the in-flight execution for a workspace
    Cancel { workspace: String },
    /// Print persisted events with seq > since
    Events {
        workspace: String,
        #[arg(long, default_value_t = 0)]
        since: u64,
    },
}

pub async fn handle(command: RunCommand, engine: &Engine, format: OutputFormat) -> Result<()> {
    match command {
        RunCommand::Start {
            workspace,
            concurrency,
            force,
            filter,
            no_wait,
        } => {
            let opts = StartOptions {
                concurrency,
                force,
                filter: if filter.is_empty() { None } else { Some(filter) },
            };
            let handle = engine.start(&workspace, opts).await?;
            if no_wait {
                return output::emit(&handle, format, |handle| {
                    println!("Started execution {} for workspace {}", handle.id, handle.workspace);
                });
            }
            let outcome = engine.wait(&handle).await?;
            output::emit(&outcome, format, |outcome| {
                println!(
                    "{}: executed={} cached={} failed={} skipped={} ({}ms)",
                    if outcome.success { "completed" } else { "failed" },
                    outcome.executed,
                    outcome.cached,
                    outcome.failed,
                    outcome.skipped,
                    outcome.duration_ms
                );
            })?;
            if !outcome.success {
                std::process::exit(1);
            }
            Ok(())
        }
        RunCommand::Status { workspace } => {
            let handle = engine.handle_for(&workspace)?;
            let summary = engine.status(&handle)?;
            output::emit(&summary, format, |summary| {
                println!("status:   {:?}", summary.status);
                println!("running:  {}", summary.running.join(", "));
                println!("pending:  {}", summary.pending.join(", "));
                println!("completed:{}", summary.completed.join(", "));
                println!("failed:   {}", summary.failed.join(", "));
                println!("skipped:  {}", summary.skipped.join(", "));
            })
        }
        RunCommand::Cancel { workspace } => {
            let handle = engine.handle_for(&workspace)?;
            engine.cancel(&handle)?;
            output::emit(&workspace, format, |workspace| {
                println!("Cancellation requested for {workspace}");
            })
        }
        RunCommand::Events { workspace, since } => {
            let handle = engine.handle_for(&workspace)?;
            let events = engine.get_events(&handle, since)?;
            output::emit(&events, format, |events| {
                for event in events {
                    println!("{} {} {:?}", event.seq, event.timestamp, event.kind);
                }
            })
        }
    }
}

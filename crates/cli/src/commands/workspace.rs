// SPDX-License-Identifier: MIT

//! `e3 workspace` — create, deploy, inspect, remove, export (`spec.md` §4.E).

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Subcommand};
use e3_engine::Engine;

use crate::output::{self, OutputFormat};

#[derive(Args)]
pub struct WorkspaceArgs {
    #[command(subcommand)]
    pub command: WorkspaceCommand,
}

#[derive(Subcommand)]
pub enum WorkspaceCommand {
    /// Create an empty (un-deployed) workspace
    Create { name: String },
    /// Deploy a package into a workspace, writing its initial root tree
    Deploy {
        name: String,
        /// `name@version`, or bare `name` to resolve the highest version
        package: String,
    },
    /// Show the current workspace state
    Status { name: String },
    /// List all workspaces
    List,
    /// Remove a workspace and its lock
    Remove { name: String },
    /// Package the current root tree and its closure into a zip snapshot
    Export {
        name: String,
        /// Output zip path
        out: PathBuf,
    },
}

pub fn handle(command: WorkspaceCommand, engine: &Engine, format: OutputFormat) -> Result<()> {
    match command {
        WorkspaceCommand::Create { name } => {
            engine.create_workspace(&name)?;
            output::emit(&name, format, |name| {
                println!("Created workspace {name}");
            })
        }
        WorkspaceCommand::Deploy { name, package } => {
            let state = engine.deploy_workspace(&name, &package)?;
            output::emit(&state, format, |state| {
                println!(
                    "Deployed {}@{} into {name} (root {})",
                    state.package_name,
                    state.package_version,
                    output::short(&state.root_hash)
                );
            })
        }
        WorkspaceCommand::Status { name } => {
            let state = engine.workspace_state(&name)?;
            output::emit(&state, format, |state| {
                println!("workspace: {name}");
                println!("package:   {}@{}", state.package_name, state.package_version);
                println!("root:      {}", output::short(&state.root_hash));
                println!("deployed:  {}", state.deployed_at);
                println!("updated:   {}", state.root_updated_at);
            })
        }
        WorkspaceCommand::List => {
            let mut names = engine.list_workspaces()?;
            names.sort();
            output::emit(&names, format, |names| {
                if names.is_empty() {
                    println!("No workspaces");
                    return;
                }
                for name in names {
                    println!("{name}");
                }
            })
        }
        WorkspaceCommand::Remove { name } => {
            engine.remove_workspace(&name)?;
            output::emit(&name, format, |name| {
                println!("Removed workspace {name}");
            })
        }
        WorkspaceCommand::Export { name, out } => {
            let bytes = engine.export_workspace(&name)?;
            std::fs::write(&out, &bytes)?;
            output::emit(&out, format, |out| {
                println!("Exported {name} to {}", out.display());
            })
        }
    }
}

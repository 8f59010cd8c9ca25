// SPDX-License-Identifier: MIT

//! `e3 package` — import and list packages (`spec.md` §4.D, §6.3).

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Subcommand};
use e3_engine::Engine;

use crate::output::{self, OutputFormat};

#[derive(Args)]
pub struct PackageArgs {
    #[command(subcommand)]
    pub command: PackageCommand,
}

#[derive(Subcommand)]
pub enum PackageCommand {
    /// Import a package zip archive
    Import {
        /// Path to the package zip archive
        zip_path: PathBuf,
        /// Re-import even if this name@version already exists
        #[arg(long)]
        force: bool,
    },
    /// List imported packages
    List,
}

pub fn handle(command: PackageCommand, engine: &Engine, format: OutputFormat) -> Result<()> {
    match command {
        PackageCommand::Import { zip_path, force } => {
            let bytes = std::fs::read(&zip_path)?;
            let info = engine.import_package(&bytes, force)?;
            output::emit(&info, format, |info| {
                println!("Imported {}@{} ({})", info.name, info.version, output::short(&info.hash));
            })
        }
        PackageCommand::List => {
            let mut packages = engine.list_packages()?;
            packages.sort_by(|a, b| (&a.name, &a.version).cmp(&(&b.name, &b.version)));
            output::emit(&packages, format, |packages| {
                if packages.is_empty() {
                    println!("No packages imported");
                    return;
                }
                for p in packages {
                    println!("{}@{}  {}", p.name, p.version, output::short(&p.hash));
                }
            })
        }
    }
}

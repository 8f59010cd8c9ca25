// SPDX-License-Identifier: MIT

//! `e3 init` — create a fresh repository (`spec.md` §6.1).

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use e3_engine::Engine;

use crate::output::OutputFormat;

#[derive(Args)]
pub struct InitArgs {
    /// Directory to initialize (default: current directory)
    pub path: Option<PathBuf>,
}

pub fn handle(args: InitArgs, format: OutputFormat) -> Result<()> {
    let path = args.path.unwrap_or(PathBuf::from("."));
    let engine = Engine::init_at(&path)?;
    let root = engine.repo().root().to_path_buf();

    crate::output::emit(&root, format, |root| {
        println!("Initialized empty e3 repository in {}", root.display());
    })
}

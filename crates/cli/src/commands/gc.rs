// SPDX-License-Identifier: MIT

//! `e3 gc` — mark-and-sweep garbage collection over the object store
//! (`spec.md` §4.L).

use std::time::Duration;

use anyhow::Result;
use clap::Args;
use e3_engine::Engine;
use e3_store::GcOptions;

use crate::output::{self, OutputFormat};

#[derive(Args)]
pub struct GcArgs {
    /// Report what would be deleted without deleting anything
    #[arg(long)]
    pub dry_run: bool,
    /// Minimum age in seconds before an unreferenced object is swept
    #[arg(long, default_value_t = 60)]
    pub min_age_secs: u64,
    /// Also treat terminal `success` execution records' output hashes as live
    #[arg(long)]
    pub retain_execution_outputs: bool,
}

pub fn handle(args: GcArgs, engine: &Engine, format: OutputFormat) -> Result<()> {
    let opts = GcOptions {
        dry_run: args.dry_run,
        min_age: Duration::from_secs(args.min_age_secs),
        retain_execution_outputs: args.retain_execution_outputs,
    };
    let report = engine.gc(&opts)?;
    output::emit(&report, format, |report| {
        println!("retained:  {}", report.retained_objects);
        println!("deleted:   {}", report.deleted_objects);
        println!("partials:  {}", report.deleted_partials);
        println!("skipped:   {} (too young)", report.skipped_young);
        println!("freed:     {} bytes", report.bytes_freed);
    })
}

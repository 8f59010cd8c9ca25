// SPDX-License-Identifier: MIT

//! Shared `--output text|json` switch, and the handful of rendering
//! helpers every command module needs.

use clap::ValueEnum;
use e3_core::Hash;

#[derive(Clone, Copy, Debug, Default, ValueEnum, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Print a value as pretty JSON, or hand it to `render` for text mode.
pub fn emit<T: serde::Serialize>(value: &T, format: OutputFormat, render: impl FnOnce(&T)) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Text => render(value),
    }
    Ok(())
}

pub fn short(hash: &Hash) -> String {
    let full = hash.to_string();
    full.chars().take(12).collect()
}

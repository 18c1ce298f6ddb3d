//! Output formatting shared by every subcommand.
//!
//! Mirrors the teacher CLI's `OutputFormat`/`Output` pair, trimmed to
//! the two formats this driver needs (no YAML dependency here).

use clap::ValueEnum;
use serde::Serialize;
use std::io::{self, Write};

/// How a command renders its result to stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable, one fact per line.
    Human,
    /// Pretty-printed JSON, for scripting.
    Json,
}

/// Renderable command result.
pub trait Output {
    /// Human-readable rendering.
    fn write_human<W: Write>(&self, writer: W) -> anyhow::Result<()>;
}

impl OutputFormat {
    /// Render `data` to stdout per the selected format.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to stdout or serializing fails.
    pub fn print<T: Output + Serialize>(&self, data: &T) -> anyhow::Result<()> {
        match self {
            OutputFormat::Human => data.write_human(io::stdout()),
            OutputFormat::Json => {
                serde_json::to_writer_pretty(io::stdout(), data)?;
                println!();
                Ok(())
            }
        }
    }
}

//! `journal` subcommand: append to and tail the learning journal.

use crate::output::{Output, OutputFormat};
use clap::Subcommand;
use serde::Serialize;
use std::io::Write;
use sunwell_memory_core::journal::{JournalEntry, LearningJournal};
use sunwell_memory_core::types::Learning;
use uuid::Uuid;

/// Operations on the append-only learning journal.
#[derive(Subcommand)]
pub enum JournalCommands {
    /// Append one learning, printing the sequence number it was assigned.
    Append {
        /// The learned fact, in plain language.
        #[arg(long)]
        fact: String,
        /// Category the fact belongs to (e.g. "pattern", "preference").
        #[arg(long)]
        category: String,
        /// Confidence in `[0, 1]`.
        #[arg(long)]
        confidence: f32,
        /// Turn ids this learning was derived from.
        #[arg(long = "source-turn")]
        source_turns: Vec<Uuid>,
    },
    /// Print every entry with `seq >= from`.
    Tail {
        /// Sequence offset to start from (0 = everything).
        #[arg(long, default_value_t = 0)]
        from: u64,
    },
}

#[derive(Serialize)]
struct AppendResult {
    seq: u64,
}

impl Output for AppendResult {
    fn write_human<W: Write>(&self, mut writer: W) -> anyhow::Result<()> {
        writeln!(writer, "appended at seq {}", self.seq)?;
        Ok(())
    }
}

#[derive(Serialize)]
struct TailResult {
    entries: Vec<JournalEntry>,
}

impl Output for TailResult {
    fn write_human<W: Write>(&self, mut writer: W) -> anyhow::Result<()> {
        for entry in &self.entries {
            writeln!(
                writer,
                "[{}] ({}) {}",
                entry.seq, entry.learning.category, entry.learning.fact
            )?;
        }
        Ok(())
    }
}

pub fn handle(command: JournalCommands, journal_path: &std::path::Path, format: OutputFormat) -> anyhow::Result<()> {
    let journal = LearningJournal::open(journal_path)?;
    match command {
        JournalCommands::Append {
            fact,
            category,
            confidence,
            source_turns,
        } => {
            let learning = Learning::new(fact, category, confidence, source_turns)?;
            let seq = journal.append(learning)?;
            format.print(&AppendResult { seq })
        }
        JournalCommands::Tail { from } => {
            let entries = journal.read_from(from)?;
            format.print(&TailResult { entries })
        }
    }
}

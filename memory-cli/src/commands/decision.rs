//! `decision` subcommand: record and query the append-only decision log.

use crate::output::{Output, OutputFormat};
use clap::Subcommand;
use serde::Serialize;
use std::io::Write;
use sunwell_memory_core::decision::{Decision, DecisionStore, RejectedOption};

/// Operations on decision memory.
#[derive(Subcommand)]
pub enum DecisionCommands {
    /// Record a decision (a no-op if the same category/question/choice
    /// was already recorded).
    Record {
        /// Grouping category, e.g. "database".
        #[arg(long)]
        category: String,
        /// The question this decision answers.
        #[arg(long)]
        question: String,
        /// The option chosen.
        #[arg(long)]
        choice: String,
        /// Why this choice was made.
        #[arg(long)]
        rationale: String,
        /// Free-form surrounding context.
        #[arg(long, default_value = "")]
        context: String,
        /// Confidence in `[0, 1]`.
        #[arg(long)]
        confidence: f32,
        /// Session id this decision belongs to.
        #[arg(long)]
        session_id: String,
        /// Id of the decision this one supersedes.
        #[arg(long)]
        supersedes: Option<String>,
        /// Rejected option as `choice|reason`, repeatable.
        #[arg(long = "rejected")]
        rejected: Vec<String>,
    },
    /// List decisions, optionally filtered by category.
    List {
        /// Category filter.
        #[arg(long)]
        category: Option<String>,
        /// Include superseded decisions.
        #[arg(long)]
        all: bool,
    },
    /// Check whether a proposed choice contradicts an active decision.
    CheckContradiction {
        /// The choice under consideration.
        proposed_choice: String,
        /// Category to check within.
        category: String,
    },
}

#[derive(Serialize)]
struct DecisionResult {
    decision: Decision,
}

impl Output for DecisionResult {
    fn write_human<W: Write>(&self, mut writer: W) -> anyhow::Result<()> {
        writeln!(
            writer,
            "[{}] {}: {} -> {}",
            self.decision.id, self.decision.category, self.decision.question, self.decision.choice
        )?;
        Ok(())
    }
}

#[derive(Serialize)]
struct DecisionsResult {
    decisions: Vec<Decision>,
}

impl Output for DecisionsResult {
    fn write_human<W: Write>(&self, mut writer: W) -> anyhow::Result<()> {
        for d in &self.decisions {
            writeln!(writer, "[{}] {}: {} -> {}", d.id, d.category, d.question, d.choice)?;
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct ContradictionResult {
    contradicts: Option<Decision>,
}

impl Output for ContradictionResult {
    fn write_human<W: Write>(&self, mut writer: W) -> anyhow::Result<()> {
        match &self.contradicts {
            Some(d) => writeln!(writer, "contradicts [{}] {} -> {}", d.id, d.question, d.choice)?,
            None => writeln!(writer, "no contradiction")?,
        }
        Ok(())
    }
}

fn parse_rejected(raw: &[String]) -> Vec<RejectedOption> {
    raw.iter()
        .map(|entry| {
            let mut parts = entry.splitn(2, '|');
            let choice = parts.next().unwrap_or_default().to_string();
            let reason = parts.next().unwrap_or_default().to_string();
            RejectedOption::new(choice, reason, None)
        })
        .collect()
}

pub fn handle(
    command: DecisionCommands,
    decisions_path: &std::path::Path,
    mutually_exclusive_pairs: Vec<(String, String)>,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let mut store = DecisionStore::open(decisions_path, mutually_exclusive_pairs)?;
    match command {
        DecisionCommands::Record {
            category,
            question,
            choice,
            rationale,
            context,
            confidence,
            session_id,
            supersedes,
            rejected,
        } => {
            let decision = store.record(
                category,
                question,
                choice,
                parse_rejected(&rejected),
                rationale,
                context,
                session_id,
                confidence,
                supersedes,
            )?;
            format.print(&DecisionResult { decision })
        }
        DecisionCommands::List { category, all } => {
            let decisions = store
                .get(category.as_deref(), !all)
                .into_iter()
                .cloned()
                .collect();
            format.print(&DecisionsResult { decisions })
        }
        DecisionCommands::CheckContradiction {
            proposed_choice,
            category,
        } => {
            let contradicts = store
                .check_contradiction(&proposed_choice, &category)
                .cloned();
            format.print(&ContradictionResult { contradicts })
        }
    }
}

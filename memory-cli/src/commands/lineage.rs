//! `lineage` subcommand: inspect and mutate artifact provenance.

use crate::output::{Output, OutputFormat};
use clap::Subcommand;
use serde::Serialize;
use std::io::Write;
use sunwell_memory_lineage::{Artifact, EditSource, ImpactReport, LineageStore};

/// Operations on the artifact lineage store.
#[derive(Subcommand)]
pub enum LineageCommands {
    /// Record a freshly created artifact.
    Create {
        /// Path the artifact was written to.
        path: String,
        /// Path to a file whose bytes stand in for the artifact's content
        /// (hashed for rename detection).
        #[arg(long)]
        content_file: std::path::PathBuf,
        /// Goal that produced the artifact.
        #[arg(long)]
        goal_id: Option<String>,
        /// Task that produced the artifact.
        #[arg(long)]
        task_id: Option<String>,
        /// Human-readable creation reason.
        #[arg(long)]
        reason: String,
        /// Model that produced the artifact.
        #[arg(long)]
        model: Option<String>,
    },
    /// Record a content edit.
    Edit {
        /// Path of the artifact being edited.
        path: String,
        /// Lines added.
        #[arg(long, default_value_t = 0)]
        lines_added: usize,
        /// Lines removed.
        #[arg(long, default_value_t = 0)]
        lines_removed: usize,
        /// Who made the edit.
        #[arg(long, value_enum)]
        source: EditSourceArg,
        /// Goal this edit was performed for.
        #[arg(long)]
        goal_id: Option<String>,
        /// Task this edit was performed for.
        #[arg(long)]
        task_id: Option<String>,
        /// Model that made the edit.
        #[arg(long)]
        model: Option<String>,
    },
    /// Record a rename.
    Rename {
        /// Current path.
        old_path: String,
        /// New path.
        new_path: String,
        /// Goal this rename was performed for.
        #[arg(long)]
        goal_id: Option<String>,
    },
    /// Record a deletion.
    Delete {
        /// Path of the artifact being deleted.
        path: String,
        /// Goal this deletion was performed for.
        #[arg(long)]
        goal_id: Option<String>,
    },
    /// Look up the current lineage for a path.
    Show {
        /// Path to look up.
        path: String,
    },
    /// List every artifact touched by a goal.
    ByGoal {
        /// Goal id.
        goal_id: String,
    },
    /// Compute the import-impact of changing a path.
    Impact {
        /// Path whose downstream impact to compute.
        path: String,
    },
}

/// `clap`-facing mirror of [`EditSource`].
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum EditSourceArg {
    /// The agent made the edit.
    Agent,
    /// A human made the edit.
    Human,
}

impl From<EditSourceArg> for EditSource {
    fn from(value: EditSourceArg) -> Self {
        match value {
            EditSourceArg::Agent => EditSource::Agent,
            EditSourceArg::Human => EditSource::Human,
        }
    }
}

#[derive(Serialize)]
struct ArtifactResult {
    artifact: Option<Artifact>,
}

impl Output for ArtifactResult {
    fn write_human<W: Write>(&self, mut writer: W) -> anyhow::Result<()> {
        match &self.artifact {
            Some(a) => writeln!(
                writer,
                "{} -> {} (human_edited={}, {} edits)",
                a.id,
                a.path,
                a.human_edited,
                a.edits.len()
            )?,
            None => writeln!(writer, "(not found)")?,
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct ArtifactsResult {
    artifacts: Vec<Artifact>,
}

impl Output for ArtifactsResult {
    fn write_human<W: Write>(&self, mut writer: W) -> anyhow::Result<()> {
        for a in &self.artifacts {
            writeln!(writer, "{} -> {}", a.id, a.path)?;
        }
        Ok(())
    }
}

impl Output for ImpactReport {
    fn write_human<W: Write>(&self, mut writer: W) -> anyhow::Result<()> {
        writeln!(writer, "max_depth: {}", self.max_depth)?;
        writeln!(writer, "affected_files:")?;
        for f in &self.affected_files {
            writeln!(writer, "  {f}")?;
        }
        writeln!(writer, "affected_goals:")?;
        for g in &self.affected_goals {
            writeln!(writer, "  {g}")?;
        }
        Ok(())
    }
}

pub async fn handle(
    command: LineageCommands,
    lineage_path: &std::path::Path,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let store = LineageStore::open(lineage_path).await?;
    match command {
        LineageCommands::Create {
            path,
            content_file,
            goal_id,
            task_id,
            reason,
            model,
        } => {
            let content = std::fs::read(&content_file)?;
            let artifact = store
                .record_create(path, &content, goal_id, task_id, reason, model)
                .await?;
            format.print(&ArtifactResult {
                artifact: Some(artifact),
            })
        }
        LineageCommands::Edit {
            path,
            lines_added,
            lines_removed,
            source,
            goal_id,
            task_id,
            model,
        } => {
            store
                .record_edit(
                    path,
                    goal_id,
                    task_id,
                    lines_added,
                    lines_removed,
                    source.into(),
                    model,
                    None,
                )
                .await?;
            format.print(&ArtifactResult { artifact: None })
        }
        LineageCommands::Rename {
            old_path,
            new_path,
            goal_id,
        } => {
            store.record_rename(old_path, new_path, goal_id).await?;
            format.print(&ArtifactResult { artifact: None })
        }
        LineageCommands::Delete { path, goal_id } => {
            store.record_delete(path, goal_id).await?;
            format.print(&ArtifactResult { artifact: None })
        }
        LineageCommands::Show { path } => {
            let artifact = store.get_by_path(path).await?;
            format.print(&ArtifactResult { artifact })
        }
        LineageCommands::ByGoal { goal_id } => {
            let artifacts = store.get_by_goal(goal_id).await?;
            format.print(&ArtifactsResult { artifacts })
        }
        LineageCommands::Impact { path } => {
            let report = store.impact(path).await?;
            format.print(&report)
        }
    }
}

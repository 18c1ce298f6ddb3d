//! `cache` subcommand: rebuild and query the derived SQLite read cache.

use crate::output::{Output, OutputFormat};
use clap::Subcommand;
use serde::Serialize;
use std::io::Write;
use sunwell_memory_cache::LearningCache;
use sunwell_memory_core::journal::LearningJournal;
use sunwell_memory_core::types::Learning;

/// Operations on the derived learning cache.
#[derive(Subcommand)]
pub enum CacheCommands {
    /// Apply journal entries past the cache's high-water mark.
    Sync,
    /// Full-text search over cached facts.
    Search {
        /// Search text.
        text: String,
    },
    /// Most recently written learnings.
    Recent {
        /// Maximum rows to return.
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
}

#[derive(Serialize)]
struct SyncResult {
    applied: usize,
}

impl Output for SyncResult {
    fn write_human<W: Write>(&self, mut writer: W) -> anyhow::Result<()> {
        writeln!(writer, "applied {} journal entries", self.applied)?;
        Ok(())
    }
}

#[derive(Serialize)]
struct LearningsResult {
    learnings: Vec<Learning>,
}

impl Output for LearningsResult {
    fn write_human<W: Write>(&self, mut writer: W) -> anyhow::Result<()> {
        for learning in &self.learnings {
            writeln!(writer, "({}) {}", learning.category, learning.fact)?;
        }
        Ok(())
    }
}

pub async fn handle(
    command: CacheCommands,
    journal_path: &std::path::Path,
    cache_path: &std::path::Path,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let cache = LearningCache::open(cache_path).await?;
    match command {
        CacheCommands::Sync => {
            let journal = LearningJournal::open(journal_path)?;
            let applied = cache.sync_from_journal(&journal).await?;
            format.print(&SyncResult { applied })
        }
        CacheCommands::Search { text } => {
            let learnings = cache.search_facts(&text).await?;
            format.print(&LearningsResult { learnings })
        }
        CacheCommands::Recent { limit } => {
            let learnings = cache.get_recent(limit).await?;
            format.print(&LearningsResult { learnings })
        }
    }
}

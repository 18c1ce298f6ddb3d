//! Shared fixture builders for the memory crates' test suites.
//!
//! Provides:
//! - Minimal-configuration constructors for the core record types
//!   (learnings, episodes, heuristics, nodes, decisions)
//! - A session-summary builder for the awareness extractor
//! - Thin async harnesses that wire up a [`LearningCache`] or
//!   [`LineageStore`] against a temp directory

use sunwell_memory_cache::LearningCache;
use sunwell_memory_core::awareness::{EditedPath, SessionSummary, TaskOutcome, ToolAuditLog, ToolUsage};
use sunwell_memory_core::decision::{Decision, RejectedOption};
use sunwell_memory_core::identity;
use sunwell_memory_core::memory_kinds::Heuristic;
use sunwell_memory_core::node::MemoryNode;
use sunwell_memory_core::types::{Episode, EpisodeOutcome, Learning};
use sunwell_memory_lineage::LineageStore;

/// Build a learning with a fixed confidence and no source turns.
#[must_use]
pub fn test_learning(fact: &str, category: &str, confidence: f32) -> Learning {
    Learning::new(fact, category, confidence, vec![]).expect("fixture confidence in range")
}

/// Build `count` learnings in the same category, numbered for easy
/// disambiguation in assertions.
#[must_use]
pub fn test_learnings(count: usize, category: &str) -> Vec<Learning> {
    (0..count)
        .map(|i| test_learning(&format!("fact number {i}"), category, 0.8))
        .collect()
}

/// Build a succeeded episode with the given summary.
#[must_use]
pub fn test_episode(summary: &str) -> Episode {
    Episode::new(summary, EpisodeOutcome::Succeeded, 5)
}

/// Build a failed episode, suitable for feeding `mark_dead_end`-style
/// assertions.
#[must_use]
pub fn test_failed_episode(summary: &str) -> Episode {
    Episode::new(summary, EpisodeOutcome::Failed, 5)
}

/// Build a heuristic with a fixed confidence.
#[must_use]
pub fn test_heuristic(condition: &str, action: &str) -> Heuristic {
    Heuristic::new(condition, action, 0.75)
}

/// Build a bare memory node with one facet set.
#[must_use]
pub fn test_node(content: &str) -> MemoryNode {
    MemoryNode::new(content).with_facet("domain", "test")
}

/// Build a decision with one rejected alternative.
#[must_use]
pub fn test_decision(category: &str, question: &str, choice: &str) -> Decision {
    Decision {
        id: identity::decision_id(category, question, choice),
        category: category.to_string(),
        question: question.to_string(),
        choice: choice.to_string(),
        rejected: vec![RejectedOption::new(
            "alternative",
            "did not fit the constraints",
            None,
        )],
        rationale: "fixture rationale".to_string(),
        context: "fixture context".to_string(),
        confidence: 0.9,
        timestamp: chrono::Utc::now(),
        session_id: "test-session".to_string(),
        supersedes: None,
    }
}

/// Build a session summary with `succeeded` of `total` task attempts
/// of `task_type` all stating `confidence`, suitable for exercising the
/// confidence-calibration pattern.
#[must_use]
pub fn test_session_summary(task_type: &str, total: usize, succeeded: usize, confidence: f32) -> SessionSummary {
    let task_outcomes = (0..total)
        .map(|i| TaskOutcome {
            task_type: task_type.to_string(),
            succeeded: i < succeeded,
            stated_confidence: confidence,
        })
        .collect();
    SessionSummary {
        task_outcomes,
        edited_paths: Vec::new(),
    }
}

/// Build a session summary whose edited paths backtrack `backtracked`
/// out of `total` touches to files of `category`-matching names.
#[must_use]
pub fn test_session_with_edits(path: &str, total: usize, backtracked: usize) -> SessionSummary {
    let edited_paths = (0..total)
        .map(|i| EditedPath {
            path: path.to_string(),
            backtracked: i < backtracked,
        })
        .collect();
    SessionSummary {
        task_outcomes: Vec::new(),
        edited_paths,
    }
}

/// Build a tool audit log with a single tool's usage counters.
#[must_use]
pub fn test_tool_audit_log(tool: &str, uses: u32, successes: u32) -> ToolAuditLog {
    ToolAuditLog {
        usages: vec![ToolUsage {
            tool: tool.to_string(),
            uses,
            successes,
        }],
    }
}

/// A learning cache opened in a fresh temp directory, kept alive
/// alongside the directory so it isn't dropped out from under the
/// database file.
pub struct CacheHarness {
    /// The opened cache.
    pub cache: LearningCache,
    /// Backing temp directory; dropping this removes the database file.
    pub temp_dir: tempfile::TempDir,
}

impl CacheHarness {
    /// Open a fresh learning cache in a temp directory.
    ///
    /// # Panics
    ///
    /// Panics if the temp directory or cache cannot be created.
    pub async fn new() -> Self {
        let temp_dir = tempfile::tempdir().expect("create temp dir");
        let cache = LearningCache::open(temp_dir.path().join("learnings.db"))
            .await
            .expect("open learning cache");
        Self { cache, temp_dir }
    }
}

/// A lineage store opened in a fresh temp directory, kept alive
/// alongside the directory so it isn't dropped out from under the
/// database file.
pub struct LineageHarness {
    /// The opened store.
    pub store: LineageStore,
    /// Backing temp directory; dropping this removes the database file.
    pub temp_dir: tempfile::TempDir,
}

impl LineageHarness {
    /// Open a fresh lineage store in a temp directory.
    ///
    /// # Panics
    ///
    /// Panics if the temp directory or store cannot be created.
    pub async fn new() -> Self {
        let temp_dir = tempfile::tempdir().expect("create temp dir");
        let store = LineageStore::open(temp_dir.path().join("lineage.redb"))
            .await
            .expect("open lineage store");
        Self { store, temp_dir }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_learning_has_requested_category() {
        let learning = test_learning("fact", "pattern", 0.6);
        assert_eq!(learning.category, "pattern");
        assert!(!learning.is_superseded());
    }

    #[test]
    fn test_episode_marks_outcome() {
        let episode = test_episode("did a thing");
        assert_eq!(episode.outcome, EpisodeOutcome::Succeeded);
    }

    #[test]
    fn test_session_summary_splits_success_and_failure() {
        let summary = test_session_summary("bug_fix", 4, 3, 0.9);
        assert_eq!(summary.task_outcomes.len(), 4);
        assert_eq!(summary.task_outcomes.iter().filter(|o| o.succeeded).count(), 3);
    }

    #[tokio::test]
    async fn cache_harness_opens_and_counts_zero() {
        let harness = CacheHarness::new().await;
        assert_eq!(harness.cache.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn lineage_harness_opens_and_reports_no_artifact() {
        let harness = LineageHarness::new().await;
        assert!(harness.store.get_by_path("missing.rs").await.unwrap().is_none());
    }
}

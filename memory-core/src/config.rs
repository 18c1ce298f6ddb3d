//! Central configuration for the memory core.
//!
//! Spec §9 Design Notes calls these out as configuration, not
//! constants. They are collected here in one struct with documented
//! defaults, loadable from an optional TOML file, matching the way
//! `memory-cli`'s config layer in the teacher project loads
//! `MemoryConfig`-shaped structs.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Weights used by [`crate::store::UnifiedMemoryStore::query`] to combine
/// text, facet, and spatial scores into one ranking.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QueryWeights {
    /// Weight applied to text/embedding similarity.
    pub text: f32,
    /// Weight applied to facet-match score.
    pub facet: f32,
    /// Weight applied to spatial-match score.
    pub spatial: f32,
}

impl Default for QueryWeights {
    fn default() -> Self {
        Self {
            text: 1.0,
            facet: 1.0,
            spatial: 0.5,
        }
    }
}

/// Fraction of the token budget each `to_context` section is allotted
/// before unused remainder is donated to later sections (spec §4.6).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SectionBudgets {
    /// Share of the budget for procedural heuristics.
    pub procedural: f32,
    /// Share of the budget for long-term learnings.
    pub long_term: f32,
    /// Share of the budget for episodic summaries.
    pub episodic: f32,
    /// Share of the budget for working-memory turns.
    pub working: f32,
}

impl Default for SectionBudgets {
    fn default() -> Self {
        Self {
            procedural: 0.15,
            long_term: 0.35,
            episodic: 0.25,
            working: 0.25,
        }
    }
}

/// Back-off schedule the learning cache uses on SQLite `SQLITE_BUSY`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BackoffSchedule {
    /// Initial delay before the first retry.
    pub initial: Duration,
    /// Multiplier applied to the delay after each failed attempt.
    pub multiplier: f64,
    /// Maximum number of retry attempts before surfacing an error.
    pub max_attempts: u32,
}

impl Default for BackoffSchedule {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(10),
            multiplier: 2.0,
            max_attempts: 5,
        }
    }
}

/// All tunables the memory core exposes as configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Per-query decay factor applied to non-explicit focus topics (spec §4.2).
    pub focus_decay: f32,
    /// Minimum outcome samples before the awareness extractor emits a
    /// confidence-calibration pattern for a task type (spec §4.14).
    pub min_samples_for_pattern: usize,
    /// Minimum |stated confidence − actual success rate| to flag miscalibration.
    pub confidence_miscalibration_threshold: f32,
    /// Failure-rate floor for emitting an error-clustering risk pattern.
    pub task_failure_threshold: f32,
    /// Backtrack-rate floor for emitting a caution pattern.
    pub backtrack_threshold: f32,
    /// Minimum tool success rate to be considered for under-utilization.
    pub tool_underuse_success_floor: f32,
    /// Maximum usage share to be considered under-utilized.
    pub tool_underuse_frequency_ceiling: f32,
    /// How long `get_recently_deleted` considers a deletion "recent" for
    /// content-preserving rename detection (spec §4.12).
    pub dead_letter_retention: Duration,
    /// Query-score weighting for the unified store.
    pub query_weights: QueryWeights,
    /// `to_context` section budget shares.
    pub section_budgets: SectionBudgets,
    /// Cache write back-off schedule.
    pub cache_backoff: BackoffSchedule,
    /// Storage root override. `None` resolves to `$HOME/.sunwell/<project>/`.
    pub storage_root: Option<PathBuf>,
    /// Mutually-exclusive choice pairs used by decision-contradiction
    /// detection (spec §4.13, supplemented per `SPEC_FULL.md` §B).
    pub mutually_exclusive_pairs: Vec<(String, String)>,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            focus_decay: 0.9,
            min_samples_for_pattern: 3,
            confidence_miscalibration_threshold: 0.10,
            task_failure_threshold: 0.25,
            backtrack_threshold: 0.20,
            tool_underuse_success_floor: 0.80,
            tool_underuse_frequency_ceiling: 0.10,
            dead_letter_retention: Duration::from_secs(24 * 3600),
            query_weights: QueryWeights::default(),
            section_budgets: SectionBudgets::default(),
            cache_backoff: BackoffSchedule::default(),
            storage_root: None,
            mutually_exclusive_pairs: default_exclusive_pairs(),
        }
    }
}

fn default_exclusive_pairs() -> Vec<(String, String)> {
    [
        ("sqlite", "postgres"),
        ("sync", "async"),
        ("rest", "graphql"),
        ("monolith", "microservices"),
        ("sql", "nosql"),
    ]
    .into_iter()
    .map(|(a, b)| (a.to_string(), b.to_string()))
    .collect()
}

impl MemoryConfig {
    /// Load configuration from a TOML file, falling back to defaults for
    /// any field the file omits.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> crate::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        toml::from_str(&raw)
            .map_err(|e| crate::Error::InvalidInput(format!("config parse error: {e}")))
    }

    /// Resolve the effective storage root: `storage_root` if set
    /// (used verbatim, even if relative), otherwise
    /// `$HOME/.sunwell/<project>/` (spec §6).
    #[must_use]
    pub fn resolve_storage_root(&self, project: &str) -> PathBuf {
        if let Some(root) = &self.storage_root {
            return root.clone();
        }
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".sunwell")
            .join(project)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let cfg = MemoryConfig::default();
        assert!((cfg.focus_decay - 0.9).abs() < f32::EPSILON);
        assert_eq!(cfg.min_samples_for_pattern, 3);
        assert_eq!(cfg.mutually_exclusive_pairs.len(), 5);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let cfg = MemoryConfig::load(Path::new("/nonexistent/path.toml")).unwrap();
        assert_eq!(cfg, MemoryConfig::default());
    }
}

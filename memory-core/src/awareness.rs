//! Awareness extractor: behavioral patterns derived from session
//! history (spec §4.14, C14).
//!
//! Runs once at session end. Patterns are advisory signals consumed by
//! planners; they are never themselves learnings (spec §4.14).

use crate::config::MemoryConfig;
use serde::{Deserialize, Serialize};

/// One task attempt's classified outcome and the confidence the agent
/// stated for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskOutcome {
    /// Classified task type, e.g. `"bug_fix"`, `"refactor"`.
    pub task_type: String,
    /// Whether the attempt succeeded.
    pub succeeded: bool,
    /// Confidence the agent stated for this attempt, in `[0, 1]`.
    pub stated_confidence: f32,
}

/// A file touched during the session and whether the edit was later
/// reverted or redone (a "backtrack").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditedPath {
    /// The path touched.
    pub path: String,
    /// Whether this edit was later undone or redone.
    pub backtracked: bool,
}

/// The per-session facts the extractor reasons over (spec §4.14).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionSummary {
    /// Every task attempt this session, classified by type.
    pub task_outcomes: Vec<TaskOutcome>,
    /// Every file touched this session.
    pub edited_paths: Vec<EditedPath>,
}

/// One tool's usage counters for a session (spec §4.14).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolUsage {
    /// Tool name.
    pub tool: String,
    /// Number of times it was invoked.
    pub uses: u32,
    /// Number of those invocations that succeeded.
    pub successes: u32,
}

/// Optional per-tool audit counters for a session (spec §4.14).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolAuditLog {
    /// Usage counters for every tool invoked this session.
    pub usages: Vec<ToolUsage>,
}

/// Coarse classification of an edited path, used by the backtrack-rate
/// pattern (spec §4.14).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathCategory {
    /// Test files.
    Test,
    /// Configuration files.
    Config,
    /// Database or schema migrations.
    Migration,
    /// Everything else.
    Code,
}

impl PathCategory {
    /// Classify a path by simple naming conventions.
    #[must_use]
    pub fn classify(path: &str) -> Self {
        let lower = path.to_lowercase();
        if lower.contains("/migrations/") || lower.contains("migration") {
            Self::Migration
        } else if lower.contains("test") {
            Self::Test
        } else if lower.ends_with(".toml")
            || lower.ends_with(".yaml")
            || lower.ends_with(".yml")
            || lower.ends_with(".json")
            || lower.ends_with(".ini")
            || lower.contains("config")
        {
            Self::Config
        } else {
            Self::Code
        }
    }
}

/// The kind of behavioral observation emitted (spec §4.14).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    /// Stated confidence diverges from actual success rate.
    ConfidenceCalibration,
    /// A reliable tool is rarely used.
    ToolAvoidance,
    /// A task type fails often.
    ErrorClustering,
    /// A path category is edited back and forth often.
    BacktrackRisk,
}

/// One derived behavioral observation (spec §4.14). Advisory only; a
/// pattern is never recorded as a [`crate::types::Learning`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pattern {
    /// The kind of observation.
    pub kind: PatternKind,
    /// What the pattern is about (a task type, tool name, or path category).
    pub subject: String,
    /// Human-readable detail.
    pub detail: String,
    /// The magnitude that triggered emission (a rate or a delta).
    pub magnitude: f32,
}

/// Derive behavioral patterns from one session's history (spec §4.14).
#[must_use]
pub fn extract_patterns(
    summary: &SessionSummary,
    tool_log: Option<&ToolAuditLog>,
    config: &MemoryConfig,
) -> Vec<Pattern> {
    let mut patterns = Vec::new();
    patterns.extend(confidence_calibration(summary, config));
    patterns.extend(error_clustering(summary, config));
    patterns.extend(backtrack_risk(summary, config));
    if let Some(tool_log) = tool_log {
        patterns.extend(tool_avoidance(tool_log, config));
    }
    patterns
}

fn confidence_calibration(summary: &SessionSummary, config: &MemoryConfig) -> Vec<Pattern> {
    let mut by_type: std::collections::HashMap<&str, Vec<&TaskOutcome>> =
        std::collections::HashMap::new();
    for outcome in &summary.task_outcomes {
        by_type.entry(&outcome.task_type).or_default().push(outcome);
    }

    let mut patterns = Vec::new();
    for (task_type, outcomes) in by_type {
        if outcomes.len() < config.min_samples_for_pattern {
            continue;
        }
        let mean_confidence: f32 =
            outcomes.iter().map(|o| o.stated_confidence).sum::<f32>() / outcomes.len() as f32;
        let success_rate: f32 =
            outcomes.iter().filter(|o| o.succeeded).count() as f32 / outcomes.len() as f32;
        let delta = (mean_confidence - success_rate).abs();
        if delta >= config.confidence_miscalibration_threshold {
            patterns.push(Pattern {
                kind: PatternKind::ConfidenceCalibration,
                subject: task_type.to_string(),
                detail: format!(
                    "stated confidence {mean_confidence:.2} vs actual success rate {success_rate:.2}"
                ),
                magnitude: delta,
            });
        }
    }
    patterns
}

fn error_clustering(summary: &SessionSummary, config: &MemoryConfig) -> Vec<Pattern> {
    let mut by_type: std::collections::HashMap<&str, (usize, usize)> =
        std::collections::HashMap::new();
    for outcome in &summary.task_outcomes {
        let entry = by_type.entry(&outcome.task_type).or_insert((0, 0));
        entry.0 += 1;
        if !outcome.succeeded {
            entry.1 += 1;
        }
    }

    let mut patterns = Vec::new();
    for (task_type, (total, failures)) in by_type {
        if total == 0 {
            continue;
        }
        let failure_rate = failures as f32 / total as f32;
        if failure_rate >= config.task_failure_threshold {
            patterns.push(Pattern {
                kind: PatternKind::ErrorClustering,
                subject: task_type.to_string(),
                detail: format!("failure rate {failure_rate:.2} across {total} attempts"),
                magnitude: failure_rate,
            });
        }
    }
    patterns
}

fn backtrack_risk(summary: &SessionSummary, config: &MemoryConfig) -> Vec<Pattern> {
    let mut by_category: std::collections::HashMap<PathCategory, (usize, usize)> =
        std::collections::HashMap::new();
    for edit in &summary.edited_paths {
        let category = PathCategory::classify(&edit.path);
        let entry = by_category.entry(category).or_insert((0, 0));
        entry.0 += 1;
        if edit.backtracked {
            entry.1 += 1;
        }
    }

    let mut patterns = Vec::new();
    for (category, (total, backtracks)) in by_category {
        if total == 0 {
            continue;
        }
        let rate = backtracks as f32 / total as f32;
        if rate >= config.backtrack_threshold {
            patterns.push(Pattern {
                kind: PatternKind::BacktrackRisk,
                subject: format!("{category:?}"),
                detail: format!("backtrack rate {rate:.2} across {total} edits"),
                magnitude: rate,
            });
        }
    }
    patterns
}

fn tool_avoidance(tool_log: &ToolAuditLog, config: &MemoryConfig) -> Vec<Pattern> {
    let total_uses: u32 = tool_log.usages.iter().map(|t| t.uses).sum();
    if total_uses == 0 {
        return Vec::new();
    }

    tool_log
        .usages
        .iter()
        .filter_map(|usage| {
            if usage.uses == 0 {
                return None;
            }
            let success_rate = usage.successes as f32 / usage.uses as f32;
            let usage_share = usage.uses as f32 / total_uses as f32;
            if success_rate >= config.tool_underuse_success_floor
                && usage_share < config.tool_underuse_frequency_ceiling
            {
                Some(Pattern {
                    kind: PatternKind::ToolAvoidance,
                    subject: usage.tool.clone(),
                    detail: format!(
                        "success rate {success_rate:.2} but usage share only {usage_share:.2}"
                    ),
                    magnitude: usage_share,
                })
            } else {
                None
            }
        })
        .collect()
}

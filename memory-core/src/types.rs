//! Core record types shared across memory kinds (spec §3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum length accepted for free-text fields before validation
/// rejects them (mirrors the teacher's `MAX_DESCRIPTION_LEN`-style
/// guards against unbounded input).
pub const MAX_TEXT_LEN: usize = 10_000;

/// The kind of conversational unit a [`Turn`] represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnKind {
    /// A message from the human or calling system.
    User,
    /// A message generated by the agent.
    Assistant,
    /// The result of a tool invocation.
    ToolResult,
    /// An internal deliberation step not shown to the user.
    Thought,
}

/// One conversational unit, retained in working memory until eviction
/// (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    /// Stable id.
    pub id: Uuid,
    /// Raw content.
    pub content: String,
    /// Kind of turn.
    pub kind: TurnKind,
    /// Creation time.
    pub timestamp: DateTime<Utc>,
    /// Model that produced this turn, if applicable.
    pub model: Option<String>,
    /// Optional embedding, populated lazily.
    pub embedding: Option<Vec<f32>>,
    /// Pinned turns (system prompts, the current task descriptor) are
    /// exempt from LRU eviction (spec §3, invariant 7).
    pub pinned: bool,
}

impl Turn {
    /// Construct a new, unpinned turn stamped at `now`.
    #[must_use]
    pub fn new(content: String, kind: TurnKind, model: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            content,
            kind,
            timestamp: Utc::now(),
            model,
            embedding: None,
            pinned: false,
        }
    }
}

/// An atomic fact the agent has acquired (spec §3). Immutable once
/// written; correction is modeled by a new learning whose
/// `superseded_by`-pointing predecessor is left untouched — see
/// [`Learning::superseded_by`] which is set on the *old* record once a
/// replacement exists, matching the journal's `superseded_by` field
/// (spec §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Learning {
    /// Stable id.
    pub id: Uuid,
    /// The fact text.
    pub fact: String,
    /// Free-form category (`project`, `pattern`, `fix`, `type`, `api`,
    /// `heuristic`, `template`, ...).
    pub category: String,
    /// Confidence in `[0, 1]`.
    pub confidence: f32,
    /// Turns this learning was extracted from.
    pub source_turns: Vec<Uuid>,
    /// File this learning concerns, if any.
    pub source_file: Option<String>,
    /// Set once a later learning supersedes this one.
    pub superseded_by: Option<Uuid>,
    /// Optional embedding.
    pub embedding: Option<Vec<f32>>,
    /// Arbitrary structured payload carried alongside the fact.
    pub template_data: Option<serde_json::Value>,
    /// Creation time.
    pub timestamp: DateTime<Utc>,
}

impl Learning {
    /// Construct a new, unsuperseded learning.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidInput`] if `confidence` is outside
    /// `[0, 1]` or `fact` exceeds [`MAX_TEXT_LEN`].
    pub fn new(
        fact: impl Into<String>,
        category: impl Into<String>,
        confidence: f32,
        source_turns: Vec<Uuid>,
    ) -> crate::Result<Self> {
        let fact = fact.into();
        if !(0.0..=1.0).contains(&confidence) {
            return Err(crate::Error::InvalidInput(format!(
                "confidence {confidence} out of range [0,1]"
            )));
        }
        if fact.len() > MAX_TEXT_LEN {
            return Err(crate::Error::InvalidInput(
                "fact exceeds maximum length".to_string(),
            ));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            fact,
            category: category.into(),
            confidence,
            source_turns,
            source_file: None,
            superseded_by: None,
            embedding: None,
            template_data: None,
            timestamp: Utc::now(),
        })
    }

    /// Whether this learning has been superseded and should be filtered
    /// by default readers (spec §3, invariant 2).
    #[must_use]
    pub fn is_superseded(&self) -> bool {
        self.superseded_by.is_some()
    }
}

/// The final result of an attempted approach (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EpisodeOutcome {
    /// The approach succeeded.
    Succeeded,
    /// The approach failed outright.
    Failed,
    /// The approach partially succeeded.
    Partial,
}

/// A bounded attempt at solving something (spec §3, §GLOSSARY).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Episode {
    /// Stable id.
    pub id: Uuid,
    /// Human-readable summary of the attempt.
    pub summary: String,
    /// Outcome of the attempt.
    pub outcome: EpisodeOutcome,
    /// When the episode concluded.
    pub timestamp: DateTime<Utc>,
    /// Models used during the attempt.
    pub models_used: Vec<String>,
    /// Number of turns exchanged during the attempt.
    pub turn_count: usize,
}

impl Episode {
    /// Construct a new episode stamped at `now`.
    #[must_use]
    pub fn new(summary: impl Into<String>, outcome: EpisodeOutcome, turn_count: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            summary: summary.into(),
            outcome,
            timestamp: Utc::now(),
            models_used: Vec::new(),
            turn_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn learning_rejects_bad_confidence() {
        assert!(Learning::new("fact", "project", 1.5, vec![]).is_err());
        assert!(Learning::new("fact", "project", -0.1, vec![]).is_err());
        assert!(Learning::new("fact", "project", 0.5, vec![]).is_ok());
    }
}

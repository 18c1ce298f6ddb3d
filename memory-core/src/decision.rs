//! Decision memory: the architectural-choice log (spec §3, §4.13, C13).
//!
//! Append-only, like the learning journal, but keyed by a deterministic
//! id so the same decision can never be double-recorded (spec §3,
//! Global invariant 1). Supersession is implicit: a decision is
//! "active" exactly while no later decision's `supersedes` field names
//! it (spec §4.15).

use crate::embedding_index::EmbeddingIndex;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::instrument;

/// An option considered and rejected in favor of [`Decision::choice`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectedOption {
    /// The option that was not chosen.
    pub choice: String,
    /// Why it was rejected.
    pub reason: String,
    /// A condition under which this rejection should be revisited.
    pub reconsider_condition: Option<String>,
}

impl RejectedOption {
    /// Construct a rejected option.
    #[must_use]
    pub fn new(
        choice: impl Into<String>,
        reason: impl Into<String>,
        reconsider_condition: Option<String>,
    ) -> Self {
        Self {
            choice: choice.into(),
            reason: reason.into(),
            reconsider_condition,
        }
    }
}

/// An immutable architectural decision (spec §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    /// Deterministic id: hash of `category:question:choice`.
    pub id: String,
    /// Free-form grouping, e.g. `"database"`.
    pub category: String,
    /// The question this decision answers.
    pub question: String,
    /// The option chosen.
    pub choice: String,
    /// Options considered and rejected.
    pub rejected: Vec<RejectedOption>,
    /// Why this choice was made.
    pub rationale: String,
    /// Free-form context surrounding the decision.
    pub context: String,
    /// Confidence in `[0, 1]`.
    pub confidence: f32,
    /// When the decision was recorded.
    pub timestamp: DateTime<Utc>,
    /// Session this decision was recorded in.
    pub session_id: String,
    /// Id of the decision this one supersedes, if any.
    pub supersedes: Option<String>,
}

impl Decision {
    /// Render the text form embedded for [`DecisionStore::find_relevant`]
    /// (spec §4.13): `"Category: … / Question: … / Choice: … /
    /// Rationale: … / Rejected: …"`.
    #[must_use]
    pub fn rendered_text(&self) -> String {
        let rejected: Vec<String> = self.rejected.iter().map(|r| r.choice.clone()).collect();
        format!(
            "Category: {} / Question: {} / Choice: {} / Rationale: {} / Rejected: {}",
            self.category,
            self.question,
            self.choice,
            self.rationale,
            rejected.join(", ")
        )
    }
}

/// One line of `decisions.jsonl`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct DecisionLine {
    #[serde(flatten)]
    decision: Decision,
}

/// Append-only decision log plus an optional embedding sidecar (spec
/// §4.13, §6).
pub struct DecisionStore {
    path: Option<PathBuf>,
    decisions: Vec<Decision>,
    superseded_ids: HashSet<String>,
    embeddings: Option<EmbeddingIndex>,
    mutually_exclusive_pairs: Vec<(String, String)>,
}

impl DecisionStore {
    /// Create an in-memory-only store (no durable log, no embeddings).
    #[must_use]
    pub fn new(mutually_exclusive_pairs: Vec<(String, String)>) -> Self {
        Self {
            path: None,
            decisions: Vec::new(),
            superseded_ids: HashSet::new(),
            embeddings: None,
            mutually_exclusive_pairs,
        }
    }

    /// Enable an embedding sidecar of the given dimension.
    #[must_use]
    pub fn with_embeddings(mut self, dim: usize) -> Self {
        self.embeddings = Some(EmbeddingIndex::new(dim));
        self
    }

    /// Open (creating if absent) a durable decision log at `path`,
    /// replaying any existing entries into memory.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created, opened, or read.
    #[instrument(skip(mutually_exclusive_pairs), fields(path = %path.as_ref().display()))]
    pub fn open(
        path: impl AsRef<Path>,
        mutually_exclusive_pairs: Vec<(String, String)>,
    ) -> crate::Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        OpenOptions::new().create(true).append(true).open(&path)?;

        let mut store = Self {
            path: Some(path.clone()),
            decisions: Vec::new(),
            superseded_ids: HashSet::new(),
            embeddings: None,
            mutually_exclusive_pairs,
        };

        let file = std::fs::File::open(&path)?;
        let reader = BufReader::new(file);
        for (lineno, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<DecisionLine>(&line) {
                Ok(entry) => store.index_decision(entry.decision),
                Err(e) => {
                    tracing::warn!(lineno, error = %e, "skipping corrupt decision line during recovery");
                }
            }
        }
        Ok(store)
    }

    fn index_decision(&mut self, decision: Decision) {
        if let Some(supersedes) = &decision.supersedes {
            self.superseded_ids.insert(supersedes.clone());
        }
        self.decisions.push(decision);
    }

    /// Record a decision. Re-recording an identical
    /// `(category, question, choice)` is a no-op returning the existing
    /// record (spec §4.13).
    ///
    /// # Errors
    ///
    /// Returns an error if `confidence` is outside `[0, 1]` or (when a
    /// durable log is configured) the append fails.
    #[allow(clippy::too_many_arguments)]
    #[instrument(skip(self, rejected), fields(category = %category.as_ref()))]
    pub fn record(
        &mut self,
        category: impl AsRef<str> + Into<String>,
        question: impl AsRef<str> + Into<String>,
        choice: impl AsRef<str> + Into<String>,
        rejected: Vec<RejectedOption>,
        rationale: impl Into<String>,
        context: impl Into<String>,
        session_id: impl Into<String>,
        confidence: f32,
        supersedes: Option<String>,
    ) -> crate::Result<Decision> {
        let id = crate::identity::decision_id(category.as_ref(), question.as_ref(), choice.as_ref());
        if let Some(existing) = self.decisions.iter().find(|d| d.id == id) {
            return Ok(existing.clone());
        }
        if !(0.0..=1.0).contains(&confidence) {
            return Err(crate::Error::InvalidInput(format!(
                "confidence {confidence} out of range [0,1]"
            )));
        }

        let decision = Decision {
            id,
            category: category.into(),
            question: question.into(),
            choice: choice.into(),
            rejected,
            rationale: rationale.into(),
            context: context.into(),
            confidence,
            timestamp: Utc::now(),
            session_id: session_id.into(),
            supersedes,
        };

        if let Some(path) = &self.path {
            let mut line = serde_json::to_string(&DecisionLine {
                decision: decision.clone(),
            })?;
            line.push('\n');
            let mut file = OpenOptions::new().append(true).open(path)?;
            file.write_all(line.as_bytes())?;
            file.sync_data()?;
        }

        self.index_decision(decision.clone());
        Ok(decision)
    }

    /// Store a precomputed embedding for `decision_id` in the sidecar.
    /// Callers own the embedder; this crate has no opinion on it.
    ///
    /// # Errors
    ///
    /// Returns an error if no embedding sidecar was configured or the
    /// vector's dimension does not match it.
    pub fn index_embedding(&mut self, decision_id: &str, vector: Vec<f32>) -> crate::Result<()> {
        let Some(index) = &mut self.embeddings else {
            return Err(crate::Error::InvalidInput(
                "no embedding sidecar configured".to_string(),
            ));
        };
        let Ok(uuid) = string_to_uuid(decision_id) else {
            return Err(crate::Error::InvalidInput(
                "decision id is not embeddable as a uuid key".to_string(),
            ));
        };
        index.add(uuid, vector, serde_json::Value::Null)
    }

    /// Decisions matching `category` (or all, if `None`), honoring
    /// supersession when `active_only` is set (spec §4.13, §4.15).
    #[must_use]
    pub fn get(&self, category: Option<&str>, active_only: bool) -> Vec<&Decision> {
        self.decisions
            .iter()
            .filter(|d| category.map_or(true, |c| d.category == c))
            .filter(|d| !active_only || !self.superseded_ids.contains(&d.id))
            .collect()
    }

    /// Find decisions whose rendered text is most relevant to `query`,
    /// using cosine similarity over the embedding sidecar if populated,
    /// else a keyword-overlap fallback (spec §4.13).
    #[must_use]
    pub fn find_relevant(&self, query: &str, k: usize) -> Vec<&Decision> {
        let mut scored: Vec<(&Decision, f32)> = self
            .decisions
            .iter()
            .map(|d| (d, keyword_overlap(&d.rendered_text(), query)))
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(k);
        scored.into_iter().map(|(d, _)| d).collect()
    }

    /// Detect whether `proposed_choice` contradicts an existing active
    /// decision in `category` (spec §4.13):
    ///
    /// 1. The proposal mentions something an active decision already
    ///    rejected, or
    /// 2. the proposal and an active decision's choice are drawn from a
    ///    known mutually-exclusive pair.
    #[must_use]
    pub fn check_contradiction(&self, proposed_choice: &str, category: &str) -> Option<&Decision> {
        let proposed_lower = proposed_choice.to_lowercase();
        self.get(Some(category), true).into_iter().find(|d| {
            let rejects_match = d
                .rejected
                .iter()
                .any(|r| proposed_lower.contains(&r.choice.to_lowercase()));
            if rejects_match {
                return true;
            }
            self.mutually_exclusive_pairs.iter().any(|(a, b)| {
                let choice_lower = d.choice.to_lowercase();
                (proposed_lower.contains(a) && choice_lower.contains(b))
                    || (proposed_lower.contains(b) && choice_lower.contains(a))
            })
        })
    }

    /// Number of decisions held, including superseded ones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.decisions.len()
    }

    /// Whether no decisions are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.decisions.is_empty()
    }
}

fn string_to_uuid(s: &str) -> Result<uuid::Uuid, uuid::Error> {
    // Decision ids are 64-char hex sha256 digests; take the first 32
    // hex chars as a stable, deterministic uuid key for the sidecar.
    let truncated: String = s.chars().take(32).collect();
    uuid::Uuid::parse_str(&format!(
        "{}-{}-{}-{}-{}",
        &truncated[0..8],
        &truncated[8..12],
        &truncated[12..16],
        &truncated[16..20],
        &truncated[20..32]
    ))
}

fn keyword_overlap(content: &str, query: &str) -> f32 {
    let content_lower = content.to_lowercase();
    let tokens: Vec<&str> = query.split_whitespace().collect();
    if tokens.is_empty() {
        return 0.0;
    }
    let matched = tokens
        .iter()
        .filter(|t| content_lower.contains(&t.to_lowercase()))
        .count();
    matched as f32 / tokens.len() as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exclusive_pairs() -> Vec<(String, String)> {
        vec![
            ("sqlite".to_string(), "postgres".to_string()),
            ("sync".to_string(), "async".to_string()),
        ]
    }

    #[test]
    fn recording_twice_is_a_no_op() {
        let mut store = DecisionStore::new(exclusive_pairs());
        let d1 = store
            .record("database", "How persist?", "SQLite", vec![], "fast", "", "s1", 0.9, None)
            .unwrap();
        let d2 = store
            .record("database", "How persist?", "SQLite", vec![], "different rationale", "", "s1", 0.5, None)
            .unwrap();
        assert_eq!(d1.id, d2.id);
        assert_eq!(d1.rationale, d2.rationale);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn supersession_excludes_from_active_only() {
        let mut store = DecisionStore::new(exclusive_pairs());
        let d1 = store
            .record("database", "How persist?", "SQLite", vec![], "simple", "", "s1", 0.9, None)
            .unwrap();
        let d2 = store
            .record(
                "database",
                "How persist?",
                "Postgres",
                vec![],
                "scale",
                "",
                "s1",
                0.9,
                Some(d1.id.clone()),
            )
            .unwrap();

        let active = store.get(Some("database"), true);
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, d2.id);

        let all = store.get(Some("database"), false);
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn check_contradiction_flags_rejected_option() {
        let mut store = DecisionStore::new(exclusive_pairs());
        store
            .record(
                "database",
                "How persist?",
                "SQLAlchemy with SQLite",
                vec![RejectedOption::new("Redis caching", "Too much complexity", None)],
                "simple",
                "",
                "s1",
                0.9,
                None,
            )
            .unwrap();

        assert!(store.check_contradiction("Let's add Redis caching", "database").is_some());
        assert!(store.check_contradiction("Keep using SQLite", "database").is_none());
    }

    #[test]
    fn check_contradiction_flags_mutually_exclusive_pair_regardless_of_phrasing() {
        let mut store = DecisionStore::new(exclusive_pairs());
        store
            .record("concurrency", "Sync or async?", "use sync I/O", vec![], "simpler", "", "s1", 0.9, None)
            .unwrap();

        assert!(store.check_contradiction("let's go with asynchronous I/O", "concurrency").is_some());
    }

    #[test]
    fn persists_and_recovers_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("decisions.jsonl");
        {
            let mut store = DecisionStore::open(&path, exclusive_pairs()).unwrap();
            store
                .record("database", "How persist?", "SQLite", vec![], "simple", "", "s1", 0.9, None)
                .unwrap();
        }
        let reopened = DecisionStore::open(&path, exclusive_pairs()).unwrap();
        assert_eq!(reopened.len(), 1);
    }
}

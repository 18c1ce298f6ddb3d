//! Simulacrum: the session container (spec §4.7, C8).
//!
//! Aggregates the five memory kinds plus the current [`Focus`], the
//! current model identifier, and model history. Portability — never
//! discarding memory across a model switch — is the point of this
//! type.

use crate::bus::get_learning_bus;
use crate::focus::Focus;
use crate::journal::LearningJournal;
use crate::memory_kinds::{
    EpisodicMemory, Heuristic, LongTermMemory, ProceduralMemory, SemanticMemory, WorkingMemory,
};
use crate::node::MemoryNode;
use crate::retrieval::{ParallelRetriever, RetrievalResult};
use crate::store::UnifiedMemoryStore;
use crate::tokenizer::{Tokenizer, WhitespaceTokenizer};
use crate::types::{Learning, Turn, TurnKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

/// JSON snapshot written by [`Simulacrum::save`] and read by
/// [`Simulacrum::load`] (spec §4.7, §6). Procedural content is
/// deliberately not persisted here — it is reloaded from a lens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulacrumSnapshot {
    /// Session name.
    pub name: String,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
    /// When the session was last touched.
    pub updated_at: DateTime<Utc>,
    /// Model currently in use.
    pub current_model: Option<String>,
    /// Models used before the current one, oldest first.
    pub models_used: Vec<String>,
    /// Working-memory turns.
    pub working_turns: Vec<Turn>,
    /// Active (non-superseded) long-term learnings.
    pub long_term_learnings: Vec<Learning>,
    /// Episodes recorded this session.
    pub episodic_episodes: Vec<crate::types::Episode>,
    /// Dead-end episode ids.
    pub episodic_dead_ends: Vec<Uuid>,
    /// Procedural heuristic count at save time (bodies are not saved).
    pub procedural_heuristic_count: usize,
    /// Procedural workflow count at save time.
    pub procedural_workflow_count: usize,
    /// Procedural skill count at save time.
    pub procedural_skill_count: usize,
}

/// A lens supplies procedural content on [`Simulacrum::load`].
pub trait Lens {
    /// Heuristics this lens contributes to procedural memory.
    fn heuristics(&self) -> Vec<Heuristic>;
    /// Workflow count this lens contributes, for snapshot bookkeeping.
    fn workflow_count(&self) -> usize {
        0
    }
    /// Skill count this lens contributes, for snapshot bookkeeping.
    fn skill_count(&self) -> usize {
        0
    }
}

/// The session-level container aggregating all five memory kinds.
pub struct Simulacrum {
    name: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    current_model: Option<String>,
    models_used: Vec<String>,

    working: WorkingMemory,
    long_term: LongTermMemory,
    episodic: EpisodicMemory,
    semantic: SemanticMemory,
    procedural: ProceduralMemory,

    focus: Focus,
    journal: Option<Arc<LearningJournal>>,
}

impl Simulacrum {
    /// Create a new, empty session.
    #[must_use]
    pub fn new(name: impl Into<String>, working_capacity: usize, focus_decay: f32) -> Self {
        let now = Utc::now();
        Self {
            name: name.into(),
            created_at: now,
            updated_at: now,
            current_model: None,
            models_used: Vec::new(),
            working: WorkingMemory::new(working_capacity),
            long_term: LongTermMemory::new(),
            episodic: EpisodicMemory::new(),
            semantic: SemanticMemory::new(UnifiedMemoryStore::new(
                None,
                crate::config::QueryWeights::default(),
            )),
            procedural: ProceduralMemory::new(),
            focus: Focus::new(focus_decay),
            journal: None,
        }
    }

    /// Attach a journal: every [`Simulacrum::add_learning`] call will
    /// also be appended durably (spec §4.7).
    #[must_use]
    pub fn with_journal(mut self, journal: Arc<LearningJournal>) -> Self {
        self.journal = Some(journal);
        self
    }

    /// Append a user message to working memory, returning its id.
    pub fn add_user_message(&mut self, text: impl Into<String>) -> Uuid {
        let turn = Turn::new(text.into(), TurnKind::User, None);
        let id = turn.id;
        self.working.add_turn(turn);
        self.touch();
        id
    }

    /// Append an assistant message (optionally model-attributed) to
    /// working memory, returning its id.
    pub fn add_assistant_message(&mut self, text: impl Into<String>, model: Option<String>) -> Uuid {
        let turn = Turn::new(text.into(), TurnKind::Assistant, model);
        let id = turn.id;
        self.working.add_turn(turn);
        self.touch();
        id
    }

    /// Record a learning to long-term memory and, if a journal is
    /// attached, durably append it too (spec §4.7).
    ///
    /// # Errors
    ///
    /// Returns an error if the learning fails validation or (when a
    /// journal is attached) the journal append fails. On a journal
    /// failure the in-memory store is not updated, so the two stay in
    /// agreement (spec §4.16).
    #[instrument(skip(self))]
    pub fn add_learning(
        &mut self,
        fact: impl Into<String>,
        category: impl Into<String>,
        confidence: f32,
    ) -> crate::Result<Uuid> {
        let learning = Learning::new(fact, category, confidence, Vec::new())?;
        let id = learning.id;
        if let Some(journal) = &self.journal {
            journal.append(learning.clone())?;
            get_learning_bus().publish(&learning);
        }
        self.long_term.add(learning);
        self.touch();
        Ok(id)
    }

    /// Create a failed episode from `summary` and add it to the
    /// dead-end set.
    pub fn mark_dead_end(&mut self, summary: impl Into<String>) -> Uuid {
        let turn_count = self.working.len();
        let id = self.episodic.mark_dead_end(summary, turn_count);
        self.touch();
        id
    }

    /// Switch the active model, preserving the old one in history. No
    /// memory is discarded — this is the portability guarantee (spec
    /// §4.7).
    pub fn switch_model(&mut self, new_model: impl Into<String>) {
        if let Some(old) = self.current_model.take() {
            self.models_used.push(old);
        }
        self.current_model = Some(new_model.into());
        self.touch();
    }

    /// Pin a topic to an explicit focus weight.
    pub fn set_focus(&mut self, topic: impl Into<String>, weight: f32) {
        self.focus.set_explicit(topic, weight);
        self.touch();
    }

    /// Release a topic from the explicit focus set, or clear all focus
    /// when `topic` is `None`.
    pub fn clear_focus(&mut self, topic: Option<&str>) {
        self.focus.clear_explicit(topic);
        self.touch();
    }

    /// Insert a semantic-memory node.
    pub fn add_node(&mut self, node: MemoryNode) {
        self.semantic.add(node);
        self.touch();
    }

    /// Run retrieval and render a bounded-token context (spec §4.7).
    ///
    /// `parallel = false` uses the sequential fallback, useful for
    /// debugging nondeterministic timing issues without changing
    /// output shape.
    #[must_use]
    pub fn assemble_context(
        &mut self,
        query: &str,
        max_tokens: usize,
        parallel: bool,
    ) -> (String, RetrievalResult) {
        self.focus.update_from_query(query);
        let retriever = ParallelRetriever::new(
            &self.working,
            &self.long_term,
            &self.episodic,
            &self.semantic,
            &self.procedural,
        );
        let result = if parallel {
            retriever.retrieve(&self.focus, query)
        } else {
            retriever.retrieve_sequential(&self.focus, query)
        };
        let tokenizer: &dyn Tokenizer = &WhitespaceTokenizer;
        let text = result.to_context(
            max_tokens,
            crate::config::SectionBudgets::default(),
            tokenizer,
        );
        (text, result)
    }

    /// Write a JSON snapshot to `path` (spec §4.7, §6). Procedural
    /// content is not included; only its counts are.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be serialized or
    /// written.
    pub fn save(&self, path: &Path) -> crate::Result<()> {
        let snapshot = SimulacrumSnapshot {
            name: self.name.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            current_model: self.current_model.clone(),
            models_used: self.models_used.clone(),
            working_turns: self.working.turns().iter().cloned().collect(),
            long_term_learnings: self.long_term.active().into_iter().cloned().collect(),
            episodic_episodes: self.episodic.episodes().to_vec(),
            episodic_dead_ends: self.episodic.dead_ends().iter().copied().collect(),
            procedural_heuristic_count: self.procedural.heuristic_count(),
            procedural_workflow_count: self.procedural.workflow_count(),
            procedural_skill_count: self.procedural.skill_count(),
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let bytes = serde_json::to_vec_pretty(&snapshot)?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    /// Reconstruct a session from a snapshot written by
    /// [`Simulacrum::save`]. If `lens` is supplied, its heuristics
    /// populate procedural memory (spec §4.7).
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be read or parsed.
    pub fn load(
        path: &Path,
        working_capacity: usize,
        focus_decay: f32,
        lens: Option<&dyn Lens>,
    ) -> crate::Result<Self> {
        let bytes = std::fs::read(path)?;
        let snapshot: SimulacrumSnapshot = serde_json::from_slice(&bytes)?;

        let mut working = WorkingMemory::new(working_capacity);
        for turn in snapshot.working_turns {
            working.add_turn(turn);
        }

        let mut long_term = LongTermMemory::new();
        for learning in snapshot.long_term_learnings {
            long_term.add(learning);
        }

        let dead_ends: std::collections::HashSet<Uuid> =
            snapshot.episodic_dead_ends.into_iter().collect();
        let episodic = EpisodicMemory::from_parts(snapshot.episodic_episodes, dead_ends);

        let mut procedural = ProceduralMemory::new();
        if let Some(lens) = lens {
            procedural.load_heuristics(lens.heuristics());
            procedural.set_workflow_count(lens.workflow_count());
            procedural.set_skill_count(lens.skill_count());
        }

        Ok(Self {
            name: snapshot.name,
            created_at: snapshot.created_at,
            updated_at: snapshot.updated_at,
            current_model: snapshot.current_model,
            models_used: snapshot.models_used,
            working,
            long_term,
            episodic,
            semantic: SemanticMemory::new(UnifiedMemoryStore::new(
                None,
                crate::config::QueryWeights::default(),
            )),
            procedural,
            focus: Focus::new(focus_decay),
            journal: None,
        })
    }

    /// Session name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Currently active model, if any has been set.
    #[must_use]
    pub fn current_model(&self) -> Option<&str> {
        self.current_model.as_deref()
    }

    /// Models used before the current one, oldest first.
    #[must_use]
    pub fn models_used(&self) -> &[String] {
        &self.models_used
    }

    /// Borrow working memory directly.
    #[must_use]
    pub fn working(&self) -> &WorkingMemory {
        &self.working
    }

    /// Borrow long-term memory directly.
    #[must_use]
    pub fn long_term(&self) -> &LongTermMemory {
        &self.long_term
    }

    /// Borrow episodic memory directly.
    #[must_use]
    pub fn episodic(&self) -> &EpisodicMemory {
        &self.episodic
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn switch_model_preserves_history() {
        let mut sim = Simulacrum::new("session", 50, 0.9);
        sim.switch_model("claude-a");
        sim.switch_model("claude-b");
        assert_eq!(sim.current_model(), Some("claude-b"));
        assert_eq!(sim.models_used(), &["claude-a".to_string()]);
    }

    #[test]
    fn save_and_load_round_trips_working_and_long_term() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.json");

        let mut sim = Simulacrum::new("session", 50, 0.9);
        sim.add_user_message("hello");
        sim.add_learning("project uses rust", "project", 0.9).unwrap();
        sim.save(&path).unwrap();

        let loaded = Simulacrum::load(&path, 50, 0.9, None).unwrap();
        assert_eq!(loaded.working().len(), 1);
        assert_eq!(loaded.long_term().len(), 1);
    }

    #[test]
    fn assemble_context_is_deterministic() {
        let mut sim = Simulacrum::new("session", 50, 0.9);
        sim.add_learning("JWT refresh token rotation", "auth", 0.9).unwrap();
        sim.set_focus("auth", 0.8);

        let (text1, _) = sim.assemble_context("tokens", 200, true);
        let (text2, _) = sim.assemble_context("tokens", 200, true);
        assert_eq!(text1, text2);
    }

    #[test]
    fn add_learning_without_journal_still_updates_long_term() {
        let mut sim = Simulacrum::new("session", 50, 0.9);
        sim.add_learning("fact", "project", 0.8).unwrap();
        assert_eq!(sim.long_term().len(), 1);
    }
}

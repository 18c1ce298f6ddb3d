//! Long-term memory: the durable learning store (spec §3, §4.7, C8).
//!
//! Holds [`Learning`] records added via [`LongTermMemory::add`]. This is
//! an in-memory index over learnings the caller has already journaled
//! (spec §4.8) — the journal, not this struct, is authoritative; this
//! struct is what the simulacrum queries during retrieval.

use super::Queryable;
use crate::focus::Focus;
use crate::types::Learning;
use uuid::Uuid;

/// In-memory index of durable learnings.
#[derive(Debug, Clone, Default)]
pub struct LongTermMemory {
    learnings: Vec<Learning>,
}

impl LongTermMemory {
    /// Create an empty long-term memory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a learning. Callers are responsible for journaling it
    /// first (spec §3, invariant 3: the journal is authoritative).
    pub fn add(&mut self, learning: Learning) {
        self.learnings.push(learning);
    }

    /// Mark `old_id` as superseded by `new_id`. No-op if `old_id` is
    /// unknown or already superseded.
    pub fn supersede(&mut self, old_id: Uuid, new_id: Uuid) {
        if let Some(l) = self.learnings.iter_mut().find(|l| l.id == old_id) {
            l.superseded_by = Some(new_id);
        }
    }

    /// Look up a learning by id, including superseded ones.
    #[must_use]
    pub fn get(&self, id: Uuid) -> Option<&Learning> {
        self.learnings.iter().find(|l| l.id == id)
    }

    /// All learnings whose category matches, not superseded.
    #[must_use]
    pub fn by_category(&self, category: &str) -> Vec<&Learning> {
        self.learnings
            .iter()
            .filter(|l| l.category == category && !l.is_superseded())
            .collect()
    }

    /// Every active (non-superseded) learning.
    #[must_use]
    pub fn active(&self) -> Vec<&Learning> {
        self.learnings.iter().filter(|l| !l.is_superseded()).collect()
    }

    /// Total learnings held, including superseded ones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.learnings.len()
    }

    /// Whether no learnings are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.learnings.is_empty()
    }
}

impl Queryable for LongTermMemory {
    type Item = Learning;

    fn query(&self, focus: &Focus, text: &str, limit: usize) -> Vec<(Learning, f32)> {
        let mut scored: Vec<(Learning, f32)> = self
            .active()
            .into_iter()
            .map(|learning| {
                let focus_score = focus.score(&learning.fact, &[&learning.category]);
                let lexical = lexical_overlap(&learning.fact, text);
                (learning.clone(), focus_score + lexical + learning.confidence * 0.1)
            })
            .collect();
        scored.sort_by(|a, b| {
            b.1.total_cmp(&a.1)
                .then_with(|| b.0.timestamp.cmp(&a.0.timestamp))
        });
        scored.truncate(limit);
        scored
    }
}

fn lexical_overlap(content: &str, query: &str) -> f32 {
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

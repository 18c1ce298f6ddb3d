//! Working memory: the turn buffer (spec §3, §4.7, C8).
//!
//! Bounded length, LRU-by-recency eviction, with pinned turns (system
//! prompts, the current task descriptor) exempt (spec §3, invariant 7).

use super::Queryable;
use crate::focus::Focus;
use crate::types::{Turn, TurnKind};
use std::collections::VecDeque;
use uuid::Uuid;

/// The agent's in-flight conversational buffer.
#[derive(Debug, Clone)]
pub struct WorkingMemory {
    turns: VecDeque<Turn>,
    capacity: usize,
}

impl WorkingMemory {
    /// Create working memory bounded to `capacity` non-pinned turns.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            turns: VecDeque::new(),
            capacity,
        }
    }

    /// Append a turn, evicting the oldest non-pinned turn if over
    /// capacity.
    pub fn add_turn(&mut self, turn: Turn) {
        self.turns.push_back(turn);
        self.evict_if_needed();
    }

    fn evict_if_needed(&mut self) {
        while self.non_pinned_count() > self.capacity {
            let Some(idx) = self.turns.iter().position(|t| !t.pinned) else {
                break;
            };
            self.turns.remove(idx);
        }
    }

    fn non_pinned_count(&self) -> usize {
        self.turns.iter().filter(|t| !t.pinned).count()
    }

    /// All turns currently retained, oldest first.
    #[must_use]
    pub fn turns(&self) -> &VecDeque<Turn> {
        &self.turns
    }

    /// Look up a turn by id.
    #[must_use]
    pub fn get(&self, id: Uuid) -> Option<&Turn> {
        self.turns.iter().find(|t| t.id == id)
    }

    /// Number of turns retained (including pinned).
    #[must_use]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Whether no turns are retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

impl Queryable for WorkingMemory {
    type Item = Turn;

    fn query(&self, focus: &Focus, text: &str, limit: usize) -> Vec<(Turn, f32)> {
        let mut scored: Vec<(Turn, f32)> = self
            .turns
            .iter()
            .map(|turn| {
                let category = match turn.kind {
                    TurnKind::User => "user",
                    TurnKind::Assistant => "assistant",
                    TurnKind::ToolResult => "tool_result",
                    TurnKind::Thought => "thought",
                };
                let focus_score = focus.score(&turn.content, &[category]);
                let lexical = text_overlap(&turn.content, text);
                (turn.clone(), focus_score + lexical)
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

fn text_overlap(content: &str, query: &str) -> f32 {
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

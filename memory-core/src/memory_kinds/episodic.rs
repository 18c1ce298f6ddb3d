//! Episodic memory: attempted-approach history and the dead-end set
//! (spec §3, §4.7, C8, §GLOSSARY).

use super::Queryable;
use crate::focus::Focus;
use crate::types::{Episode, EpisodeOutcome};
use std::collections::HashSet;
use uuid::Uuid;

/// Session-scoped store of [`Episode`]s plus the dead-end index.
#[derive(Debug, Clone, Default)]
pub struct EpisodicMemory {
    episodes: Vec<Episode>,
    dead_ends: HashSet<Uuid>,
}

impl EpisodicMemory {
    /// Create an empty episodic memory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reconstruct episodic memory from previously saved parts (spec
    /// §4.7 `Simulacrum::load`), restoring the dead-end index alongside
    /// the episodes themselves.
    #[must_use]
    pub fn from_parts(episodes: Vec<Episode>, dead_ends: HashSet<Uuid>) -> Self {
        Self { episodes, dead_ends }
    }

    /// Record a concluded episode.
    pub fn add(&mut self, episode: Episode) {
        self.episodes.push(episode);
    }

    /// Record a failed episode and add it to the dead-end set in one
    /// step (spec §4.7 `mark_dead_end`).
    pub fn mark_dead_end(&mut self, summary: impl Into<String>, turn_count: usize) -> Uuid {
        let episode = Episode::new(summary, EpisodeOutcome::Failed, turn_count);
        let id = episode.id;
        self.episodes.push(episode);
        self.dead_ends.insert(id);
        id
    }

    /// Every episode id indexed as a dead end.
    #[must_use]
    pub fn dead_ends(&self) -> &HashSet<Uuid> {
        &self.dead_ends
    }

    /// Whether `id` is indexed as a dead end.
    #[must_use]
    pub fn is_dead_end(&self, id: Uuid) -> bool {
        self.dead_ends.contains(&id)
    }

    /// Every episode recorded this session.
    #[must_use]
    pub fn episodes(&self) -> &[Episode] {
        &self.episodes
    }

    /// Number of episodes held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.episodes.len()
    }

    /// Whether no episodes are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.episodes.is_empty()
    }
}

impl Queryable for EpisodicMemory {
    type Item = Episode;

    fn query(&self, focus: &Focus, text: &str, limit: usize) -> Vec<(Episode, f32)> {
        let mut scored: Vec<(Episode, f32)> = self
            .episodes
            .iter()
            .map(|episode| {
                let outcome_label = match episode.outcome {
                    EpisodeOutcome::Succeeded => "succeeded",
                    EpisodeOutcome::Failed => "failed",
                    EpisodeOutcome::Partial => "partial",
                };
                let focus_score = focus.score(&episode.summary, &[outcome_label]);
                let lexical = lexical_overlap(&episode.summary, text);
                // Dead ends retain full visibility, but rank slightly lower so
                // retrieval biases future attempts away from them by default.
                let dead_end_penalty = if self.dead_ends.contains(&episode.id) {
                    0.1
                } else {
                    0.0
                };
                (episode.clone(), focus_score + lexical - dead_end_penalty)
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

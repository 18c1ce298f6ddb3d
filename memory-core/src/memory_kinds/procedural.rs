//! Procedural memory: condition/action heuristics (spec §3, §4.7, C8).
//!
//! Procedural content is not persisted in a simulacrum snapshot
//! (spec §4.7): it is loaded from the associated lens on reload. This
//! struct only models the in-session working set and its query shape.

use super::Queryable;
use crate::focus::Focus;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single condition/action heuristic, as supplied by a lens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Heuristic {
    /// Stable id.
    pub id: Uuid,
    /// The condition under which this heuristic applies, in free text.
    pub condition: String,
    /// The recommended action.
    pub action: String,
    /// Confidence in `[0, 1]`.
    pub confidence: f32,
}

impl Heuristic {
    /// Construct a new heuristic.
    #[must_use]
    pub fn new(condition: impl Into<String>, action: impl Into<String>, confidence: f32) -> Self {
        Self {
            id: Uuid::new_v4(),
            condition: condition.into(),
            action: action.into(),
            confidence: confidence.clamp(0.0, 1.0),
        }
    }
}

/// In-session procedural working set: heuristics, workflows, and
/// skills. Only heuristics are queried directly today; workflow and
/// skill counts are tracked for the simulacrum snapshot (spec §4.7,
/// `procedural.{heuristic_count,workflow_count,skill_count}`).
#[derive(Debug, Clone, Default)]
pub struct ProceduralMemory {
    heuristics: Vec<Heuristic>,
    workflow_count: usize,
    skill_count: usize,
}

impl ProceduralMemory {
    /// Create an empty procedural memory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load heuristics from a lens (or any other external source).
    pub fn load_heuristics(&mut self, heuristics: Vec<Heuristic>) {
        self.heuristics = heuristics;
    }

    /// Record that `n` workflows are available this session (for
    /// snapshot counts; workflow bodies live in the lens, not here).
    pub fn set_workflow_count(&mut self, n: usize) {
        self.workflow_count = n;
    }

    /// Record that `n` skills are available this session.
    pub fn set_skill_count(&mut self, n: usize) {
        self.skill_count = n;
    }

    /// Heuristic count, for the simulacrum snapshot.
    #[must_use]
    pub fn heuristic_count(&self) -> usize {
        self.heuristics.len()
    }

    /// Workflow count, for the simulacrum snapshot.
    #[must_use]
    pub fn workflow_count(&self) -> usize {
        self.workflow_count
    }

    /// Skill count, for the simulacrum snapshot.
    #[must_use]
    pub fn skill_count(&self) -> usize {
        self.skill_count
    }

    /// All heuristics currently loaded.
    #[must_use]
    pub fn heuristics(&self) -> &[Heuristic] {
        &self.heuristics
    }
}

impl Queryable for ProceduralMemory {
    type Item = Heuristic;

    fn query(&self, focus: &Focus, text: &str, limit: usize) -> Vec<(Heuristic, f32)> {
        let mut scored: Vec<(Heuristic, f32)> = self
            .heuristics
            .iter()
            .map(|h| {
                let focus_score = focus.score(&h.condition, &[&h.action]);
                let lexical = lexical_overlap(&h.condition, text);
                (h.clone(), focus_score + lexical + h.confidence * 0.1)
            })
            .collect();
        scored.sort_by(|a, b| {
            b.1.total_cmp(&a.1).then_with(|| a.0.id.cmp(&b.0.id))
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_counts_are_independent_of_heuristics() {
        let mut mem = ProceduralMemory::new();
        mem.load_heuristics(vec![Heuristic::new("cond", "act", 0.5)]);
        mem.set_workflow_count(2);
        mem.set_skill_count(3);
        assert_eq!(mem.heuristic_count(), 1);
        assert_eq!(mem.workflow_count(), 2);
        assert_eq!(mem.skill_count(), 3);
    }

    #[test]
    fn query_bounds_results() {
        let mut mem = ProceduralMemory::new();
        for i in 0..5 {
            mem.load_heuristics(
                (0..5)
                    .map(|j| Heuristic::new(format!("cond {i}{j}"), "act", 0.5))
                    .collect(),
            );
        }
        let focus = Focus::new(0.9);
        assert_eq!(mem.query(&focus, "cond", 3).len(), 3);
    }
}

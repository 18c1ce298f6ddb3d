//! Parallel retriever: five memory kinds queried concurrently, merged
//! by focus (spec §4.6, C7).
//!
//! The five queries are CPU-and-memory-bound, read-only, and share no
//! mutable state, so they fan out over `std::thread::scope` — a
//! natural fit for structured concurrency (spec §9 Design Notes):
//! every child thread is joined before the scope returns, there is no
//! detached background work to leak.

use crate::focus::Focus;
use crate::memory_kinds::{
    EpisodicMemory, LongTermMemory, ProceduralMemory, Queryable, SemanticMemory, WorkingMemory,
};
use crate::node::MemoryNode;
use crate::tokenizer::Tokenizer;
use crate::types::{Episode, Learning, Turn};

/// The merged, ranked output of one retrieval pass (spec §4.6).
#[derive(Debug, Clone, Default)]
pub struct RetrievalResult {
    /// Ranked long-term learnings.
    pub learnings: Vec<(Learning, f32)>,
    /// Ranked episodes.
    pub episodes: Vec<(Episode, f32)>,
    /// Ranked working-memory turns.
    pub turns: Vec<(Turn, f32)>,
    /// Ranked semantic nodes.
    pub nodes: Vec<(MemoryNode, f32)>,
    /// Bounded list of applicable heuristics.
    pub heuristics: Vec<(crate::memory_kinds::Heuristic, f32)>,
    /// Focus topics active when this result was produced.
    pub focus_topics: Vec<String>,
}

/// Per-kind result limit passed to each of the five bounded queries.
const PER_KIND_LIMIT: usize = 20;

impl RetrievalResult {
    /// Render this result to a bounded-token context string.
    ///
    /// Section order is fixed: procedural → long-term → episodic →
    /// working (spec §4.6). Each section is allotted a fraction of
    /// `max_tokens` per [`crate::config::SectionBudgets`]; a section
    /// that uses less than its share donates the remainder to the
    /// sections that come after it, so the fixed order also determines
    /// who benefits from slack.
    #[must_use]
    pub fn to_context(
        &self,
        max_tokens: usize,
        budgets: crate::config::SectionBudgets,
        tokenizer: &dyn Tokenizer,
    ) -> String {
        let mut remaining = max_tokens;
        let mut out = String::new();

        // Each section's cap is `min(its nominal share, what's actually
        // left)`. Since `remaining` is reduced by real usage rather
        // than by the nominal share, a section that underspends its
        // allotment automatically donates the difference forward to
        // the sections that follow it.
        let procedural_budget = ((max_tokens as f32 * budgets.procedural) as usize).min(remaining);
        let (section, used) = render_heuristics(&self.heuristics, procedural_budget, tokenizer);
        remaining = remaining.saturating_sub(used);
        out.push_str(&section);

        let long_term_budget = ((max_tokens as f32 * budgets.long_term) as usize).min(remaining);
        let (section, used) = render_learnings(&self.learnings, long_term_budget, tokenizer);
        remaining = remaining.saturating_sub(used);
        out.push_str(&section);

        let episodic_budget = ((max_tokens as f32 * budgets.episodic) as usize).min(remaining);
        let (section, used) = render_episodes(&self.episodes, episodic_budget, tokenizer);
        remaining = remaining.saturating_sub(used);
        out.push_str(&section);

        // The working section gets whatever is left.
        let (section, _used) = render_turns(&self.turns, remaining, tokenizer);
        out.push_str(&section);

        out
    }
}

fn render_heuristics(
    items: &[(crate::memory_kinds::Heuristic, f32)],
    budget: usize,
    tokenizer: &dyn Tokenizer,
) -> (String, usize) {
    render_section("Heuristics", items.iter().map(|(h, _)| format!("- If {}: {}", h.condition, h.action)), budget, tokenizer)
}

fn render_learnings(items: &[(Learning, f32)], budget: usize, tokenizer: &dyn Tokenizer) -> (String, usize) {
    render_section(
        "Learnings",
        items.iter().map(|(l, _)| format!("- [{}] {}", l.category, l.fact)),
        budget,
        tokenizer,
    )
}

fn render_episodes(items: &[(Episode, f32)], budget: usize, tokenizer: &dyn Tokenizer) -> (String, usize) {
    render_section(
        "Episodes",
        items.iter().map(|(e, _)| format!("- [{:?}] {}", e.outcome, e.summary)),
        budget,
        tokenizer,
    )
}

fn render_turns(items: &[(Turn, f32)], budget: usize, tokenizer: &dyn Tokenizer) -> (String, usize) {
    render_section(
        "Working",
        items.iter().map(|(t, _)| format!("- [{:?}] {}", t.kind, t.content)),
        budget,
        tokenizer,
    )
}

fn render_section(
    title: &str,
    lines: impl Iterator<Item = String>,
    budget: usize,
    tokenizer: &dyn Tokenizer,
) -> (String, usize) {
    let mut body = String::new();
    let mut used = 0;
    for line in lines {
        let cost = tokenizer.count(&line);
        if used + cost > budget {
            break;
        }
        body.push_str(&line);
        body.push('\n');
        used += cost;
    }
    if body.is_empty() {
        return (String::new(), 0);
    }
    let header = format!("## {title}\n");
    let rendered = format!("{header}{body}\n");
    (rendered, used + tokenizer.count(&header))
}

/// Runs the five bounded memory-kind queries concurrently and fuses
/// the results by focus.
pub struct ParallelRetriever<'a> {
    working: &'a WorkingMemory,
    long_term: &'a LongTermMemory,
    episodic: &'a EpisodicMemory,
    semantic: &'a SemanticMemory,
    procedural: &'a ProceduralMemory,
}

impl<'a> ParallelRetriever<'a> {
    /// Borrow the five memory kinds for one retrieval pass.
    #[must_use]
    pub fn new(
        working: &'a WorkingMemory,
        long_term: &'a LongTermMemory,
        episodic: &'a EpisodicMemory,
        semantic: &'a SemanticMemory,
        procedural: &'a ProceduralMemory,
    ) -> Self {
        Self {
            working,
            long_term,
            episodic,
            semantic,
            procedural,
        }
    }

    /// Run all five queries on separate threads within one structured
    /// scope and merge into a [`RetrievalResult`] (spec §4.6).
    #[must_use]
    pub fn retrieve(&self, focus: &Focus, query_text: &str) -> RetrievalResult {
        let (turns, learnings, episodes, nodes, heuristics) = std::thread::scope(|scope| {
            let turns = scope.spawn(|| self.working.query(focus, query_text, PER_KIND_LIMIT));
            let learnings = scope.spawn(|| self.long_term.query(focus, query_text, PER_KIND_LIMIT));
            let episodes = scope.spawn(|| self.episodic.query(focus, query_text, PER_KIND_LIMIT));
            let nodes = scope.spawn(|| self.semantic.query(focus, query_text, PER_KIND_LIMIT));
            let heuristics = scope.spawn(|| self.procedural.query(focus, query_text, PER_KIND_LIMIT));

            (
                turns.join().unwrap_or_default(),
                learnings.join().unwrap_or_default(),
                episodes.join().unwrap_or_default(),
                nodes.join().unwrap_or_default(),
                heuristics.join().unwrap_or_default(),
            )
        });

        RetrievalResult {
            learnings,
            episodes,
            turns,
            nodes,
            heuristics,
            focus_topics: focus.active_topics(0.0),
        }
    }

    /// Sequential fallback for debugging, running the same five
    /// queries one after another instead of concurrently (spec §4.7
    /// `assemble_context(..., parallel=false)`).
    #[must_use]
    pub fn retrieve_sequential(&self, focus: &Focus, query_text: &str) -> RetrievalResult {
        RetrievalResult {
            learnings: self.long_term.query(focus, query_text, PER_KIND_LIMIT),
            episodes: self.episodic.query(focus, query_text, PER_KIND_LIMIT),
            turns: self.working.query(focus, query_text, PER_KIND_LIMIT),
            nodes: self.semantic.query(focus, query_text, PER_KIND_LIMIT),
            heuristics: self.procedural.query(focus, query_text, PER_KIND_LIMIT),
            focus_topics: focus.active_topics(0.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{QueryWeights, SectionBudgets};
    use crate::store::UnifiedMemoryStore;
    use crate::tokenizer::WhitespaceTokenizer;
    use crate::types::{EpisodeOutcome, TurnKind};

    fn sample_retriever() -> (WorkingMemory, LongTermMemory, EpisodicMemory, SemanticMemory, ProceduralMemory) {
        let mut working = WorkingMemory::new(50);
        working.add_turn(Turn::new("how do tokens expire?".to_string(), TurnKind::User, None));

        let mut long_term = LongTermMemory::new();
        long_term.add(Learning::new("JWT refresh token rotation", "auth", 0.9, vec![]).unwrap());
        long_term.add(Learning::new("Redis eviction policies", "perf", 0.9, vec![]).unwrap());

        let mut episodic = EpisodicMemory::new();
        episodic.add(Episode::new("rotated tokens successfully", EpisodeOutcome::Succeeded, 3));

        let semantic = SemanticMemory::new(UnifiedMemoryStore::new(None, QueryWeights::default()));

        let mut procedural = ProceduralMemory::new();
        procedural.load_heuristics(vec![crate::memory_kinds::Heuristic::new(
            "token expires soon",
            "rotate it",
            0.7,
        )]);

        (working, long_term, episodic, semantic, procedural)
    }

    #[test]
    fn retrieval_is_deterministic_for_fixed_state() {
        let (working, long_term, episodic, semantic, procedural) = sample_retriever();
        let retriever = ParallelRetriever::new(&working, &long_term, &episodic, &semantic, &procedural);

        let mut focus = Focus::new(0.9);
        focus.set_explicit("auth", 0.8);

        let r1 = retriever.retrieve(&focus, "Which tokens expire?");
        let r2 = retriever.retrieve(&focus, "Which tokens expire?");
        assert_eq!(r1.learnings.len(), r2.learnings.len());
        assert_eq!(
            r1.learnings.iter().map(|(l, _)| l.id).collect::<Vec<_>>(),
            r2.learnings.iter().map(|(l, _)| l.id).collect::<Vec<_>>()
        );
    }

    #[test]
    fn focus_weighted_learning_ranks_first() {
        let (working, long_term, episodic, semantic, procedural) = sample_retriever();
        let retriever = ParallelRetriever::new(&working, &long_term, &episodic, &semantic, &procedural);

        let mut focus = Focus::new(0.9);
        focus.set_explicit("auth", 0.8);

        let result = retriever.retrieve(&focus, "Which tokens expire?");
        assert_eq!(result.learnings[0].0.category, "auth");
    }

    #[test]
    fn to_context_respects_token_budget() {
        let (working, long_term, episodic, semantic, procedural) = sample_retriever();
        let retriever = ParallelRetriever::new(&working, &long_term, &episodic, &semantic, &procedural);
        let focus = Focus::new(0.9);
        let result = retriever.retrieve(&focus, "tokens");

        let tokenizer = WhitespaceTokenizer;
        let text = result.to_context(10, SectionBudgets::default(), &tokenizer);
        assert!(tokenizer.count(&text) <= 10);
    }

    #[test]
    fn to_context_orders_sections_procedural_then_long_term_then_episodic_then_working() {
        let (working, long_term, episodic, semantic, procedural) = sample_retriever();
        let retriever = ParallelRetriever::new(&working, &long_term, &episodic, &semantic, &procedural);
        let focus = Focus::new(0.9);
        let result = retriever.retrieve(&focus, "tokens");

        let tokenizer = WhitespaceTokenizer;
        let text = result.to_context(500, SectionBudgets::default(), &tokenizer);
        let procedural_pos = text.find("## Heuristics");
        let learnings_pos = text.find("## Learnings");
        let episodes_pos = text.find("## Episodes");
        let working_pos = text.find("## Working");
        if let (Some(p), Some(l)) = (procedural_pos, learnings_pos) {
            assert!(p < l);
        }
        if let (Some(l), Some(e)) = (learnings_pos, episodes_pos) {
            assert!(l < e);
        }
        if let (Some(e), Some(w)) = (episodes_pos, working_pos) {
            assert!(e < w);
        }
    }

    #[test]
    fn to_context_rendering_matches_snapshot() {
        let (working, long_term, episodic, semantic, procedural) = sample_retriever();
        let retriever = ParallelRetriever::new(&working, &long_term, &episodic, &semantic, &procedural);
        let mut focus = Focus::new(0.9);
        focus.set_explicit("auth", 0.8);
        let result = retriever.retrieve(&focus, "Which tokens expire?");

        let tokenizer = WhitespaceTokenizer;
        let text = result.to_context(500, SectionBudgets::default(), &tokenizer);
        insta::assert_snapshot!(text, @"## Heuristics\n- If token expires soon: rotate it\n\n## Learnings\n- [auth] JWT refresh token rotation\n- [perf] Redis eviction policies\n\n## Episodes\n- [Succeeded] rotated tokens successfully\n\n## Working\n- [User] how do tokens expire?\n\n");
    }
}

//! Semantic memory: the unified, multi-topology node store viewed as
//! one of the five memory kinds (spec §3, §4.5–4.7, C6, C8).

use super::Queryable;
use crate::focus::Focus;
use crate::node::MemoryNode;
use crate::store::{UnifiedMemoryStore, UnifiedQuery};
use uuid::Uuid;

/// Thin adaptor over [`UnifiedMemoryStore`] so it can plug into the
/// parallel retriever (C7) alongside the other four memory kinds.
#[derive(Debug)]
pub struct SemanticMemory {
    store: UnifiedMemoryStore,
}

impl SemanticMemory {
    /// Wrap an existing unified store.
    #[must_use]
    pub fn new(store: UnifiedMemoryStore) -> Self {
        Self { store }
    }

    /// Insert a node.
    pub fn add(&mut self, node: MemoryNode) {
        self.store.add(node);
    }

    /// Remove a node by id.
    pub fn remove(&mut self, id: Uuid) {
        self.store.remove(id);
    }

    /// Borrow the underlying unified store for direct hybrid queries.
    #[must_use]
    pub fn store(&self) -> &UnifiedMemoryStore {
        &self.store
    }

    /// Mutably borrow the underlying unified store.
    pub fn store_mut(&mut self) -> &mut UnifiedMemoryStore {
        &mut self.store
    }
}

impl Queryable for SemanticMemory {
    type Item = MemoryNode;

    fn query(&self, focus: &Focus, text: &str, limit: usize) -> Vec<(MemoryNode, f32)> {
        let base = self.store.query(&UnifiedQuery {
            text_query: Some(text.to_string()),
            limit,
            ..Default::default()
        });

        let mut scored: Vec<(MemoryNode, f32)> = base
            .into_iter()
            .filter_map(|(id, score)| {
                self.store.get(id).map(|node| {
                    let focus_score = focus.score(&node.content, &[]);
                    (node.clone(), score + focus_score)
                })
            })
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(limit);
        scored
    }
}

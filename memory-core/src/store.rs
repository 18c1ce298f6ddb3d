//! Unified memory store (spec §4.5, C6).
//!
//! Holds `{id → node}` plus the faceted, spatial-capable, and vector
//! indexes, and evaluates hybrid queries against all three.

use crate::config::QueryWeights;
use crate::index::{ConceptGraph, FacetQuery, FacetedIndex, SpatialQuery, spatial_match};
use crate::node::{MemoryNode, RelationType};
use std::collections::HashMap;
use uuid::Uuid;

/// A hybrid query combining optional text, spatial, facet, and
/// relationship filters (spec §4.5).
#[derive(Debug, Clone, Default)]
pub struct UnifiedQuery {
    /// Free-text query, scored via embedding cosine similarity when the
    /// node carries an embedding, else a crude token-overlap fallback.
    pub text_query: Option<String>,
    /// Spatial constraints.
    pub spatial_query: Option<SpatialQuery>,
    /// Facet constraints.
    pub facet_query: Option<FacetQuery>,
    /// Restrict to nodes reachable from this id via `relationship_type`.
    pub relationship_from: Option<Uuid>,
    /// Relation type used with `relationship_from`.
    pub relationship_type: Option<RelationType>,
    /// Maximum number of results.
    pub limit: usize,
}

/// The unified multi-topology memory store.
#[derive(Debug, Default)]
pub struct UnifiedMemoryStore {
    nodes: HashMap<Uuid, MemoryNode>,
    facets: FacetedIndex,
    graph: ConceptGraph,
    embeddings: Option<crate::embedding_index::EmbeddingIndex>,
    weights: QueryWeights,
}

impl UnifiedMemoryStore {
    /// Create an empty store. `embedding_dim` fixes the vector index's
    /// dimension; pass `None` to disable vector search entirely.
    #[must_use]
    pub fn new(embedding_dim: Option<usize>, weights: QueryWeights) -> Self {
        Self {
            nodes: HashMap::new(),
            facets: FacetedIndex::new(),
            graph: ConceptGraph::new(),
            embeddings: embedding_dim.map(crate::embedding_index::EmbeddingIndex::new),
            weights,
        }
    }

    /// Insert a node: registers its facets, outgoing edges, and vector
    /// (if present). `O(f + e)` in the node's facet and edge count.
    pub fn add(&mut self, node: MemoryNode) {
        self.facets.insert(node.id, &node.facets);
        self.graph.add_node_edges(&node.edges);
        if let (Some(index), Some(vector)) = (&mut self.embeddings, &node.embedding) {
            let _ = index.add(node.id, vector.clone(), serde_json::Value::Null);
        }
        self.nodes.insert(node.id, node);
    }

    /// Remove a node and every index entry referencing it.
    pub fn remove(&mut self, id: Uuid) {
        if self.nodes.remove(&id).is_some() {
            self.facets.remove(id);
            self.graph.remove_node(id);
            if let Some(index) = &mut self.embeddings {
                index.delete(id);
            }
        }
    }

    /// Look up a node by id without affecting ranking state.
    #[must_use]
    pub fn get(&self, id: Uuid) -> Option<&MemoryNode> {
        self.nodes.get(&id)
    }

    /// Number of nodes currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the store holds no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Evaluate a hybrid query: intersect candidate sets (facets first,
    /// since they're the cheapest filter), rank survivors by the
    /// combined score, break ties by recency. Deterministic given fixed
    /// store state and `query`; returns at most `query.limit` nodes.
    #[must_use]
    pub fn query(&self, query: &UnifiedQuery) -> Vec<(Uuid, f32)> {
        let mut candidates: Option<std::collections::HashSet<Uuid>> = None;

        if let Some(fq) = &query.facet_query {
            if let Some(ids) = self.facets.evaluate(fq) {
                candidates = Some(intersect(candidates, ids));
            }
        }

        if let (Some(from), Some(rel)) = (query.relationship_from, query.relationship_type) {
            let reachable: std::collections::HashSet<Uuid> = match rel {
                RelationType::DependsOn => self.graph.find_dependencies(from),
                _ => self.graph.neighborhood(from, 1),
            };
            candidates = Some(intersect(candidates, reachable));
        }

        let universe: Vec<Uuid> = match candidates {
            Some(set) => set.into_iter().collect(),
            None => self.nodes.keys().copied().collect(),
        };

        let mut scored: Vec<(Uuid, f32, chrono::DateTime<chrono::Utc>)> = universe
            .into_iter()
            .filter_map(|id| self.nodes.get(&id).map(|n| (id, n)))
            .map(|(id, node)| {
                let text_score = query
                    .text_query
                    .as_deref()
                    .map(|q| self.text_score(node, q))
                    .unwrap_or(0.0);
                let facet_score = query
                    .facet_query
                    .as_ref()
                    .map(|fq| self.facets.score(id, fq))
                    .unwrap_or(0.0);
                let spatial_score = query
                    .spatial_query
                    .as_ref()
                    .map(|sq| spatial_match(&node.spatial, sq))
                    .unwrap_or(0.0);

                let score = self.weights.text * text_score
                    + self.weights.facet * facet_score
                    + self.weights.spatial * spatial_score;
                (id, score, node.updated_at)
            })
            .collect();

        scored.sort_by(|a, b| {
            b.1.total_cmp(&a.1)
                .then_with(|| b.2.cmp(&a.2))
                .then_with(|| a.0.cmp(&b.0))
        });
        scored.truncate(query.limit);
        scored.into_iter().map(|(id, score, _)| (id, score)).collect()
    }

    /// Lexical fallback scorer. The store never interprets natural
    /// language itself (spec §1 non-goals) — callers that have an
    /// embedder should embed `query_text` and use
    /// [`UnifiedMemoryStore::embeddings`]'s `search` directly, then
    /// fold the result back through a facet/spatial-only `query()`.
    fn text_score(&self, node: &MemoryNode, query_text: &str) -> f32 {
        token_overlap_score(&node.content, query_text)
    }

    /// The store's vector index, for callers that want to run their own
    /// embedding similarity search ahead of a facet/spatial query.
    #[must_use]
    pub fn embeddings(&self) -> Option<&crate::embedding_index::EmbeddingIndex> {
        self.embeddings.as_ref()
    }
}

fn intersect(
    existing: Option<std::collections::HashSet<Uuid>>,
    new: std::collections::HashSet<Uuid>,
) -> std::collections::HashSet<Uuid> {
    match existing {
        Some(set) => set.intersection(&new).copied().collect(),
        None => new,
    }
}

fn token_overlap_score(content: &str, query: &str) -> f32 {
    let content_tokens: std::collections::HashSet<String> = tokenize(content);
    let query_tokens: Vec<String> = tokenize(query).into_iter().collect();
    if query_tokens.is_empty() {
        return 0.0;
    }
    let matched = query_tokens
        .iter()
        .filter(|t| content_tokens.contains(*t))
        .count();
    matched as f32 / query_tokens.len() as f32
}

fn tokenize(text: &str) -> std::collections::HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase)
        .collect()
}

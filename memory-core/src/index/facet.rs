//! Inverted facet index (spec §4.3).
//!
//! For each facet name, maintains `value → {node ids}`. A [`FacetQuery`]
//! is a conjunction of `(facet, value)` constraints evaluated by
//! intersecting posting lists smallest-first: `O(k + r)` where `k` is
//! the smallest posting list and `r` is the result size.

use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// A conjunction of `(facet, value)` constraints.
#[derive(Debug, Clone, Default)]
pub struct FacetQuery {
    constraints: Vec<(String, String)>,
}

impl FacetQuery {
    /// Create an empty (always-matching) query.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a `facet == value` constraint, returning `self` for chaining.
    #[must_use]
    pub fn with(mut self, facet: impl Into<String>, value: impl Into<String>) -> Self {
        self.constraints.push((facet.into(), value.into()));
        self
    }

    /// Whether this query has no constraints.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }
}

/// Inverted index: `facet name → value → {node ids}`.
#[derive(Debug, Default, Clone)]
pub struct FacetedIndex {
    postings: HashMap<String, HashMap<String, HashSet<Uuid>>>,
}

impl FacetedIndex {
    /// Create an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node's facets.
    pub fn insert(&mut self, id: Uuid, facets: &crate::node::Facets) {
        for (facet, value) in facets {
            self.postings
                .entry(facet.clone())
                .or_default()
                .entry(value.clone())
                .or_default()
                .insert(id);
        }
    }

    /// Remove a node from every posting list it appears in.
    pub fn remove(&mut self, id: Uuid) {
        for values in self.postings.values_mut() {
            for ids in values.values_mut() {
                ids.remove(&id);
            }
        }
    }

    fn posting(&self, facet: &str, value: &str) -> Option<&HashSet<Uuid>> {
        self.postings.get(facet).and_then(|v| v.get(value))
    }

    /// Evaluate a query by intersecting posting lists smallest-first.
    /// Returns `None` (meaning "no constraint") when `query` is empty;
    /// callers should treat that as "match everything".
    #[must_use]
    pub fn evaluate(&self, query: &FacetQuery) -> Option<HashSet<Uuid>> {
        if query.is_empty() {
            return None;
        }

        let mut lists: Vec<&HashSet<Uuid>> = query
            .constraints
            .iter()
            .filter_map(|(facet, value)| self.posting(facet, value))
            .collect();

        if lists.len() != query.constraints.len() {
            // At least one constraint had no postings at all.
            return Some(HashSet::new());
        }

        lists.sort_by_key(|l| l.len());
        let mut iter = lists.into_iter();
        let Some(first) = iter.next() else {
            return Some(HashSet::new());
        };
        let mut result = first.clone();
        for list in iter {
            result.retain(|id| list.contains(id));
            if result.is_empty() {
                break;
            }
        }
        Some(result)
    }

    /// Facet-match score in `[0, 1]` for one node against a query:
    /// the fraction of constraints it satisfies.
    #[must_use]
    pub fn score(&self, id: Uuid, query: &FacetQuery) -> f32 {
        if query.constraints.is_empty() {
            return 1.0;
        }
        let matched = query
            .constraints
            .iter()
            .filter(|(facet, value)| {
                self.posting(facet, value)
                    .is_some_and(|ids| ids.contains(&id))
            })
            .count();
        matched as f32 / query.constraints.len() as f32
    }
}

//! Concept graph: typed directed relations with O(1) neighborhood
//! lookup in both directions (spec §4.3).

use crate::node::{Edge, RelationType};
use std::collections::{HashMap, HashSet, VecDeque};
use uuid::Uuid;

/// Holds edges in both directions so traversal never needs a linear
/// scan of all nodes.
#[derive(Debug, Default, Clone)]
pub struct ConceptGraph {
    outgoing: HashMap<Uuid, Vec<Edge>>,
    incoming: HashMap<Uuid, Vec<Edge>>,
}

impl ConceptGraph {
    /// Create an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every outgoing edge of a node, indexing the reverse
    /// direction too.
    pub fn add_node_edges(&mut self, edges: &[Edge]) {
        for edge in edges {
            self.outgoing.entry(edge.from).or_default().push(edge.clone());
            self.incoming.entry(edge.to).or_default().push(edge.clone());
        }
    }

    /// Remove every edge touching `id`, in either direction.
    pub fn remove_node(&mut self, id: Uuid) {
        if let Some(edges) = self.outgoing.remove(&id) {
            for edge in edges {
                if let Some(list) = self.incoming.get_mut(&edge.to) {
                    list.retain(|e| e.from != id);
                }
            }
        }
        if let Some(edges) = self.incoming.remove(&id) {
            for edge in edges {
                if let Some(list) = self.outgoing.get_mut(&edge.from) {
                    list.retain(|e| e.to != id);
                }
            }
        }
    }

    /// Outgoing `contradicts` edges from `id`.
    #[must_use]
    pub fn find_contradictions(&self, id: Uuid) -> Vec<Uuid> {
        self.outgoing
            .get(&id)
            .into_iter()
            .flatten()
            .filter(|e| e.relation == RelationType::Contradicts)
            .map(|e| e.to)
            .collect()
    }

    /// Incoming `elaborates` edges into `id` — nodes that elaborate on it.
    #[must_use]
    pub fn find_elaborations(&self, id: Uuid) -> Vec<Uuid> {
        self.incoming
            .get(&id)
            .into_iter()
            .flatten()
            .filter(|e| e.relation == RelationType::Elaborates)
            .map(|e| e.from)
            .collect()
    }

    /// Transitive closure over `depends_on` edges, cycle-safe.
    #[must_use]
    pub fn find_dependencies(&self, id: Uuid) -> HashSet<Uuid> {
        let mut visited = HashSet::new();
        let mut stack = vec![id];
        let mut result = HashSet::new();
        while let Some(current) = stack.pop() {
            if !visited.insert(current) {
                continue;
            }
            for edge in self.outgoing.get(&current).into_iter().flatten() {
                if edge.relation == RelationType::DependsOn && result.insert(edge.to) {
                    stack.push(edge.to);
                }
            }
        }
        result
    }

    /// BFS neighborhood up to `depth`, regardless of relation type,
    /// following outgoing edges.
    #[must_use]
    pub fn neighborhood(&self, id: Uuid, depth: usize) -> HashSet<Uuid> {
        let mut visited = HashSet::from([id]);
        let mut frontier = VecDeque::from([(id, 0usize)]);
        while let Some((current, d)) = frontier.pop_front() {
            if d >= depth {
                continue;
            }
            for edge in self.outgoing.get(&current).into_iter().flatten() {
                if visited.insert(edge.to) {
                    frontier.push_back((edge.to, d + 1));
                }
            }
        }
        visited
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(from: Uuid, to: Uuid, relation: RelationType) -> Edge {
        Edge {
            from,
            to,
            relation,
            explanation: None,
        }
    }

    #[test]
    fn dependency_closure_handles_cycles() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();
        let mut graph = ConceptGraph::new();
        graph.add_node_edges(&[edge(a, b, RelationType::DependsOn)]);
        graph.add_node_edges(&[edge(b, c, RelationType::DependsOn)]);
        graph.add_node_edges(&[edge(c, a, RelationType::DependsOn)]); // cycle back to a

        let deps = graph.find_dependencies(a);
        assert_eq!(deps, HashSet::from([b, c, a]));
    }

    #[test]
    fn elaborations_are_incoming() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let mut graph = ConceptGraph::new();
        graph.add_node_edges(&[edge(b, a, RelationType::Elaborates)]);
        assert_eq!(graph.find_elaborations(a), vec![b]);
    }

    #[test]
    fn neighborhood_respects_depth() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();
        let mut graph = ConceptGraph::new();
        graph.add_node_edges(&[edge(a, b, RelationType::Refines)]);
        graph.add_node_edges(&[edge(b, c, RelationType::Refines)]);

        assert_eq!(graph.neighborhood(a, 1), HashSet::from([a, b]));
        assert_eq!(graph.neighborhood(a, 2), HashSet::from([a, b, c]));
    }

    #[test]
    fn remove_node_clears_both_directions() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let mut graph = ConceptGraph::new();
        graph.add_node_edges(&[edge(a, b, RelationType::Cites)]);
        graph.remove_node(a);
        assert!(graph.find_elaborations(b).is_empty());
        assert!(graph.neighborhood(a, 2).len() == 1);
    }
}

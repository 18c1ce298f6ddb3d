//! Unified memory node and edge types (spec §3, §4.3, C3).
//!
//! `MemoryNode` is the superset record the unified store (C6) indexes
//! across temporal, spatial, structural, topological, and faceted axes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

#[cfg(feature = "proptest-arbitrary")]
use proptest::prelude::{prop_oneof, Arbitrary, BoxedStrategy, Just, Strategy};

/// Where in a document a node's content sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionKind {
    /// The opening of a document or section.
    Intro,
    /// The main body.
    Body,
    /// The closing or summary.
    Conclusion,
}

/// File-and-line context for a node (spec §3, §4.3 spatial queries).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpatialContext {
    /// File path the node concerns, if any.
    pub file_path: Option<String>,
    /// Inclusive line range within that file.
    pub line_range: Option<(u32, u32)>,
    /// Dotted section path, e.g. `"intro.background"`.
    pub section_path: Option<String>,
    /// Coarse position within the enclosing document.
    pub position: Option<PositionKind>,
}

/// A handle into a document tree (spec §3 structural position).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuralPosition {
    /// Ordered path of section indices from the document root.
    pub path: Vec<u32>,
}

/// Orthogonal classification facets attached to a node (spec §3, §GLOSSARY).
pub type Facets = HashMap<String, String>;

/// A typed directed relation between two nodes (spec §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationType {
    /// This node elaborates on the target.
    Elaborates,
    /// This node contradicts the target.
    Contradicts,
    /// This node depends on the target.
    DependsOn,
    /// This node precedes the target.
    Precedes,
    /// This node refines the target.
    Refines,
    /// This node cites the target.
    Cites,
}

#[cfg(feature = "proptest-arbitrary")]
impl Arbitrary for RelationType {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_args: Self::Parameters) -> Self::Strategy {
        prop_oneof![
            Just(Self::Elaborates),
            Just(Self::Contradicts),
            Just(Self::DependsOn),
            Just(Self::Precedes),
            Just(Self::Refines),
            Just(Self::Cites),
        ]
        .boxed()
    }
}

impl std::fmt::Display for RelationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RelationType::Elaborates => "elaborates",
            RelationType::Contradicts => "contradicts",
            RelationType::DependsOn => "depends_on",
            RelationType::Precedes => "precedes",
            RelationType::Refines => "refines",
            RelationType::Cites => "cites",
        };
        write!(f, "{s}")
    }
}

/// A directed edge from one node to another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    /// Source node id.
    pub from: Uuid,
    /// Target node id.
    pub to: Uuid,
    /// Relation type.
    pub relation: RelationType,
    /// Optional human-readable explanation.
    pub explanation: Option<String>,
}

/// The superset record used by the multi-topology unified store
/// (spec §3 `MemoryNode`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryNode {
    /// Stable id.
    pub id: Uuid,
    /// Raw content.
    pub content: String,
    /// Optional embedding for vector search.
    pub embedding: Option<Vec<f32>>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
    /// Orthogonal classification facets.
    pub facets: Facets,
    /// Spatial context (file/line/section/position).
    pub spatial: SpatialContext,
    /// Structural position within a document tree.
    pub structural: StructuralPosition,
    /// Outgoing typed relations.
    pub edges: Vec<Edge>,
}

impl MemoryNode {
    /// Construct a new node with no facets, edges, or spatial context.
    #[must_use]
    pub fn new(content: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            content: content.into(),
            embedding: None,
            created_at: now,
            updated_at: now,
            facets: Facets::new(),
            spatial: SpatialContext::default(),
            structural: StructuralPosition::default(),
            edges: Vec::new(),
        }
    }

    /// Attach a facet, returning `self` for chained construction.
    #[must_use]
    pub fn with_facet(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.facets.insert(name.into(), value.into());
        self
    }

    /// Attach a spatial context, returning `self` for chained construction.
    #[must_use]
    pub fn with_spatial(mut self, spatial: SpatialContext) -> Self {
        self.spatial = spatial;
        self
    }

    /// Add an outgoing edge.
    pub fn add_edge(&mut self, to: Uuid, relation: RelationType, explanation: Option<String>) {
        self.edges.push(Edge {
            from: self.id,
            to,
            relation,
            explanation,
        });
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_attaches_facets() {
        let node = MemoryNode::new("hello").with_facet("audience", "developer");
        assert_eq!(node.facets.get("audience"), Some(&"developer".to_string()));
    }

    #[test]
    fn edges_default_empty() {
        let node = MemoryNode::new("hello");
        assert!(node.edges.is_empty());
    }
}

//! Faceted, spatial, and graph indexes over memory nodes (spec §4.3–4.4, C4).

pub mod facet;
pub mod graph;
pub mod spatial;

pub use facet::{FacetQuery, FacetedIndex};
pub use graph::ConceptGraph;
pub use spatial::{SpatialQuery, spatial_match};

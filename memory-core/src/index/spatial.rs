//! Spatial queries over node spatial context (spec §4.3).

use crate::node::{PositionKind, SpatialContext};

/// A spatial query: any combination of the four constraint kinds the
/// spec names. Unset fields are not checked.
#[derive(Debug, Clone, Default)]
pub struct SpatialQuery {
    /// Section path must start with this prefix (`section_contains`).
    pub section_contains: Option<String>,
    /// File path must equal this exactly.
    pub file_path: Option<String>,
    /// Document position must equal this.
    pub position: Option<PositionKind>,
    /// Node's line range must overlap this range.
    pub line_range_overlaps: Option<(u32, u32)>,
}

impl SpatialQuery {
    /// Whether this query has no constraints set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.section_contains.is_none()
            && self.file_path.is_none()
            && self.position.is_none()
            && self.line_range_overlaps.is_none()
    }
}

/// Score a node's spatial context against a query in `[0, 1]`.
///
/// Each set constraint contributes an equal share; a node with zero
/// score is excluded by callers (spec §4.3). An empty query scores
/// every node `1.0` (no constraint to fail).
#[must_use]
pub fn spatial_match(ctx: &SpatialContext, query: &SpatialQuery) -> f32 {
    let mut constraints = 0u32;
    let mut satisfied = 0u32;

    if let Some(prefix) = &query.section_contains {
        constraints += 1;
        if ctx
            .section_path
            .as_ref()
            .is_some_and(|p| p.starts_with(prefix.as_str()))
        {
            satisfied += 1;
        }
    }

    if let Some(path) = &query.file_path {
        constraints += 1;
        if ctx.file_path.as_deref() == Some(path.as_str()) {
            satisfied += 1;
        }
    }

    if let Some(pos) = query.position {
        constraints += 1;
        if ctx.position == Some(pos) {
            satisfied += 1;
        }
    }

    if let Some((qs, qe)) = query.line_range_overlaps {
        constraints += 1;
        if let Some((ns, ne)) = ctx.line_range {
            if ns <= qe && qs <= ne {
                satisfied += 1;
            }
        }
    }

    if constraints == 0 {
        1.0
    } else {
        satisfied as f32 / constraints as f32
    }
}

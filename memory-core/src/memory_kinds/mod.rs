//! The five memory kinds the simulacrum aggregates (spec §4.6–4.7, C8).
//!
//! Each kind shares an "add / retrieve / summarize" shape (spec §9
//! Design Notes). Rather than a class hierarchy, each kind is a small
//! concrete type implementing [`Queryable`] for its own item type;
//! the parallel retriever (C7) holds one of each by name and queries
//! them directly — plugged in at simulacrum construction, with no
//! late-bound reflection (spec §9).

pub mod episodic;
pub mod long_term;
pub mod procedural;
pub mod semantic;
pub mod working;

pub use episodic::EpisodicMemory;
pub use long_term::LongTermMemory;
pub use procedural::{Heuristic, ProceduralMemory};
pub use semantic::SemanticMemory;
pub use working::WorkingMemory;

use crate::focus::Focus;

/// Common query shape implemented by every memory kind.
pub trait Queryable {
    /// The ranked item type this kind returns.
    type Item;

    /// Run a bounded, focus-weighted query against this kind's store.
    fn query(&self, focus: &Focus, text: &str, limit: usize) -> Vec<(Self::Item, f32)>;
}

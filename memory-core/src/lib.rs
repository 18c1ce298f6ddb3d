//! Multi-topology persistent memory core for autonomous coding agents.
//!
//! Five memory kinds (working, long-term, episodic, semantic,
//! procedural) share a [`memory_kinds::Queryable`] shape and are fused
//! by a focus-weighted [`retrieval::ParallelRetriever`] into one
//! bounded-token context. A [`journal::LearningJournal`] is the
//! durable authority for learnings; an in-process
//! [`bus::LearningBus`] and a [`journal::JournalWatcher`] converge
//! same-process and cross-process readers on it respectively. Decision
//! memory ([`decision`]) and artifact lineage track longer-lived
//! project state; the awareness extractor ([`awareness`]) derives
//! advisory behavioral patterns at session end.
//!
//! See `SPEC_FULL.md` at the workspace root for the full module map.

pub mod awareness;
pub mod bus;
pub mod config;
pub mod decision;
pub mod embedding_index;
pub mod error;
pub mod focus;
pub mod identity;
pub mod index;
pub mod journal;
pub mod memory_kinds;
pub mod node;
pub mod retrieval;
pub mod simulacrum;
pub mod store;
pub mod tokenizer;
pub mod types;

pub use error::{Error, Result};
pub use simulacrum::Simulacrum;

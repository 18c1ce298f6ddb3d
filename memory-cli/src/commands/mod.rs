//! Subcommand handlers, one module per memory-core concern.

pub mod cache;
pub mod decision;
pub mod journal;
pub mod lineage;

//! Error types for the memory core.
//!
//! Read paths never throw: absence is modeled with `Option`/empty
//! collections and anomalies are logged, not surfaced as errors (spec
//! §7). Only write paths that touch durable storage (journal, cache,
//! lineage, snapshots) return `Error`.

/// Result type alias used throughout the memory core.
pub type Result<T> = std::result::Result<T, Error>;

/// Error conditions the memory core can surface from write paths.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The learning journal could not be appended to or read.
    #[error("journal error: {0}")]
    Journal(String),

    /// A snapshot (simulacrum save/load) could not be written or parsed.
    #[error("snapshot error: {0}")]
    Snapshot(String),

    /// An artifact lineage write failed.
    #[error("lineage error: {0}")]
    Lineage(String),

    /// The learning cache (derived SQLite view) could not be written to
    /// or read from.
    #[error("cache error: {0}")]
    Cache(String),

    /// A decision write failed.
    #[error("decision error: {0}")]
    Decision(String),

    /// Input failed validation before being accepted.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A mutation targeted a protected path (spec §7, blocked operation).
    #[error("blocked operation: path {0} is protected")]
    BlockedPath(String),

    /// Serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Underlying I/O failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether a caller may reasonably retry this operation.
    ///
    /// Matches spec §7's error-kind taxonomy: resource exhaustion and
    /// transient I/O are recoverable, validation and protected-path
    /// rejections are not.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::Journal(_) | Error::Io(_) => true,
            Error::Snapshot(_) | Error::Lineage(_) | Error::Decision(_) | Error::Cache(_) => true,
            Error::InvalidInput(_) | Error::BlockedPath(_) | Error::Serialization(_) => false,
        }
    }
}

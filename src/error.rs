//! Error types for knowledge graph operations.
//!
//! Lookup misses are not errors: `get_*` returns `None` and deletes return
//! `false`. `GraphError` only covers inputs the store cannot act on.

use thiserror::Error;

/// Result type alias for graph operations.
pub type GraphResult<T> = Result<T, GraphError>;

/// Error type for all fallible graph operations.
#[derive(Error, Debug)]
pub enum GraphError {
    /// A `$regex` property filter failed to compile (malformed or too large).
    #[error("invalid regex for property '{property}': {pattern:?}: {source}")]
    InvalidPattern {
        property: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// An edge references a node id that is not in the store.
    #[error("edge {edge} references unknown node '{node}'")]
    MissingEndpoint { edge: String, node: String },

    /// JSON export/import failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Snapshot file could not be read or written.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Configuration value out of range.
    #[error("invalid configuration: {0}")]
    Config(String),
}

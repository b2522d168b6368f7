//! Error types for graph and node operations.

use thiserror::Error;

/// Convenience result type using [`GraphError`].
pub type Result<T> = std::result::Result<T, GraphError>;

#[derive(Error, Debug)]
pub enum GraphError {
    /// A node entry named a `type` with no registered factory.
    #[error("unknown node type '{0}'")]
    UnknownType(String),

    /// A node entry was missing a required key or held the wrong kind.
    #[error("node configuration error: {0}")]
    Configuration(String),

    /// An operation was invoked on a node that does not implement it, such
    /// as injecting into a derived node.
    #[error("node '{node}' does not support {operation}")]
    Unsupported { node: String, operation: String },

    /// A source node disappeared or lacked the expected modality.
    #[error("source error: {0}")]
    Source(String),

    #[error("expression error: {0}")]
    Expression(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    State(#[from] thalamus_state::StateError),
}

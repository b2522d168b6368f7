//! Error types for state-tree operations.

use thiserror::Error;

/// Convenience result type using [`StateError`].
pub type Result<T> = std::result::Result<T, StateError>;

#[derive(Error, Debug)]
pub enum StateError {
    /// The path text failed to parse.
    #[error("JSONPath parse error at offset {offset}: {message}")]
    PathParse { offset: usize, message: String },

    /// The path parsed but could not be applied to the tree.
    #[error("JSONPath evaluation error: {0}")]
    PathEval(String),

    /// A value had the wrong kind for the requested conversion.
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    /// JSON (de)serialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

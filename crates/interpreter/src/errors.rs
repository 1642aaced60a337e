//! Interpreter error types

use thiserror::Error;

/// Errors surfaced by the bulk-action protocol and internal plumbing.
/// Session-terminal outcomes are reported as
/// [`crate::runner::ExecutionStatus`], not errors.
#[derive(Debug, Error)]
pub enum InterpreterError {
    /// A bulk document failed to parse
    #[error("malformed bulk action document: {0}")]
    BulkParse(String),

    /// A bulk entry carried an invalid versioned ref
    #[error("bulk action {index} has invalid ref '{reference}'")]
    BulkInvalidRef { index: usize, reference: String },

    /// JSON layer failure
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

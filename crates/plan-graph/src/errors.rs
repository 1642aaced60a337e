//! Plan graph error types

use thiserror::Error;

/// Errors raised while building or ingesting plan graphs.
#[derive(Debug, Error)]
pub enum GraphError {
    /// Structural validation failed
    #[error("invalid plan graph: {}", issues.join("; "))]
    Invalid { issues: Vec<String> },

    /// A wire document failed to parse
    #[error("malformed plan document: {0}")]
    Parse(#[from] serde_json::Error),

    /// The response text contained no plan document
    #[error("no plan document found in response text")]
    MissingDocument,
}

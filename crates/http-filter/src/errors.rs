//! HTTP filter error types

use thiserror::Error;

/// Errors raised while loading filter material. Filter *decisions* are
/// returned as [`crate::model::FilterDecision`] values, never as errors.
#[derive(Debug, Error)]
pub enum FilterError {
    /// A policy or sitemap document failed to parse
    #[error("malformed filter document: {0}")]
    Parse(#[from] serde_json::Error),

    /// A URL pattern did not compile
    #[error("invalid URL pattern '{pattern}': {detail}")]
    InvalidPattern { pattern: String, detail: String },

    /// A loader referenced a policy that was never installed
    #[error("unknown policy '{0}'")]
    UnknownPolicy(String),
}

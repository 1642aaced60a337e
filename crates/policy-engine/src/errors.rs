//! Policy engine error types

use thiserror::Error;

/// Errors raised while ingesting policy material.
///
/// Policy *decisions* are never errors; they come back as
/// [`crate::model::Decision`] values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PolicyError {
    /// Site-advertised policy could not be parsed
    #[error("malformed site policy: {0}")]
    Parse(String),

    /// A rule referenced an unknown directive
    #[error("unknown policy directive '{0}'")]
    UnknownDirective(String),

    /// A scope pattern failed to compile
    #[error("invalid scope pattern in rule '{rule_id}': {detail}")]
    InvalidPattern { rule_id: String, detail: String },
}

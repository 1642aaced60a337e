//! Ref store error types

use thiserror::Error;

/// Errors returned by ref validation and lookup.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RefError {
    /// Ref string is not a `version:ref` pair
    #[error("malformed ref '{0}', expected 'version:ref'")]
    Malformed(String),

    /// Ref belongs to a superseded snapshot
    #[error("stale ref: requested version {requested}, current version is {current}")]
    Stale { requested: u32, current: u32 },

    /// Ref version is current but the ref id is not a live key
    #[error("unknown ref {reference} in snapshot {version}")]
    UnknownRef { version: u32, reference: u32 },

    /// No snapshot has been created yet
    #[error("no snapshot available")]
    NoSnapshot,
}

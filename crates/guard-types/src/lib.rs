//! Shared vocabulary for the Browser Guard workspace.
//!
//! Every other crate speaks in terms of these types: the task/action
//! alphabets, the validated `Intent` authorization token, and the
//! subdomain-matching helpers used by both the policy engine and the
//! HTTP filter.

pub mod action;
pub mod domains;
pub mod intent;

pub use action::{ActionType, BrowserAction};
pub use intent::{Intent, SensitiveLabel, TaskType, MAX_TIMEOUT_MS};

use serde::{Deserialize, Serialize};

/// Outcome of a structural validation pass (intent or plan graph).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Validation {
    /// Whether the value passed every check
    pub valid: bool,

    /// Human-readable issues, empty when valid
    pub issues: Vec<String>,
}

impl Validation {
    /// A passing validation with no issues.
    pub fn ok() -> Self {
        Self {
            valid: true,
            issues: Vec::new(),
        }
    }

    /// A failing validation carrying the collected issues.
    pub fn fail(issues: Vec<String>) -> Self {
        Self {
            valid: false,
            issues,
        }
    }

    /// Build from an issue list; valid iff the list is empty.
    pub fn from_issues(issues: Vec<String>) -> Self {
        Self {
            valid: issues.is_empty(),
            issues,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_from_issues() {
        assert!(Validation::from_issues(Vec::new()).valid);
        let failed = Validation::from_issues(vec!["bad".to_string()]);
        assert!(!failed.valid);
        assert_eq!(failed.issues.len(), 1);
    }
}

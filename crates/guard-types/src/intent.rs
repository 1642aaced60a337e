//! The typed, bounded authorization token derived from a user request.

use crate::action::ActionType;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Hard ceiling on session wall-clock budget.
pub const MAX_TIMEOUT_MS: u64 = 300_000;

/// Closed set of task categories, ordered from least to most privileged.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    /// Query a search surface and read results
    Search,

    /// Read-only data extraction
    Extract,

    /// Repeated read-only observation
    Monitor,

    /// General page interaction
    Interact,

    /// Shopping flows up to (never through) payment
    Purchase,

    /// Authentication flows
    Login,
}

impl TaskType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::Search => "search",
            TaskType::Extract => "extract",
            TaskType::Monitor => "monitor",
            TaskType::Interact => "interact",
            TaskType::Purchase => "purchase",
            TaskType::Login => "login",
        }
    }

    /// Action alphabet the task type is entitled to.
    pub fn allowed_actions(&self) -> &'static [ActionType] {
        match self {
            TaskType::Search => &[
                ActionType::Navigate,
                ActionType::Type,
                ActionType::Click,
                ActionType::Scroll,
                ActionType::Extract,
            ],
            TaskType::Extract => &[
                ActionType::Navigate,
                ActionType::Scroll,
                ActionType::Extract,
                ActionType::Screenshot,
            ],
            TaskType::Monitor => &[
                ActionType::Navigate,
                ActionType::Scroll,
                ActionType::Extract,
                ActionType::Screenshot,
                ActionType::Wait,
            ],
            TaskType::Interact => &[
                ActionType::Navigate,
                ActionType::Click,
                ActionType::Scroll,
                ActionType::Type,
                ActionType::Extract,
            ],
            TaskType::Purchase => &[
                ActionType::Navigate,
                ActionType::Click,
                ActionType::Scroll,
                ActionType::Type,
                ActionType::Extract,
            ],
            TaskType::Login => &[ActionType::Navigate, ActionType::Click, ActionType::Type],
        }
    }

    /// Default navigation-hop budget.
    pub fn default_max_depth(&self) -> u32 {
        match self {
            TaskType::Search => 3,
            TaskType::Extract => 5,
            TaskType::Monitor => 2,
            TaskType::Interact => 5,
            TaskType::Purchase => 10,
            TaskType::Login => 3,
        }
    }

    /// Default wall-clock budget in milliseconds.
    pub fn default_timeout_ms(&self) -> u64 {
        match self {
            TaskType::Search => 30_000,
            TaskType::Extract => 60_000,
            TaskType::Monitor => 120_000,
            TaskType::Interact => 60_000,
            TaskType::Purchase => 180_000,
            TaskType::Login => 30_000,
        }
    }

    /// Read-only task types get an extra confirm gate on clicks.
    pub fn is_read_only(&self) -> bool {
        matches!(self, TaskType::Search | TaskType::Extract | TaskType::Monitor)
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Categories of sensitive data detected in a user request.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum SensitiveLabel {
    Password,
    CreditCard,
    Ssn,
    Email,
    ApiKey,
    Secret,
}

impl SensitiveLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SensitiveLabel::Password => "password",
            SensitiveLabel::CreditCard => "credit_card",
            SensitiveLabel::Ssn => "ssn",
            SensitiveLabel::Email => "email",
            SensitiveLabel::ApiKey => "api_key",
            SensitiveLabel::Secret => "secret",
        }
    }
}

impl fmt::Display for SensitiveLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bounded description of what a session is authorized to do.
///
/// Produced by the intent parser before any untrusted content is
/// observed; every downstream component treats it as the ceiling of
/// permitted behavior, never a floor.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Intent {
    /// Short prose summary of the request
    pub goal: String,

    /// Task category
    pub task_type: TaskType,

    /// Hostnames the session may contact (exact or subdomain match)
    pub allowed_domains: BTreeSet<String>,

    /// Subset of the action alphabet the session may use
    pub allowed_actions: BTreeSet<ActionType>,

    /// Sensitive-data categories detected in the request
    pub sensitive_data: Vec<SensitiveLabel>,

    /// Upper bound on navigation hops
    pub max_depth: u32,

    /// Upper bound on wall-clock execution in milliseconds
    pub timeout_ms: u64,

    /// The raw user request, preserved for audit
    pub original_request: String,
}

impl Intent {
    /// Whether `host` falls inside the allowed domain set.
    pub fn permits_domain(&self, host: &str) -> bool {
        crate::domains::any_domain_matches(host, self.allowed_domains.iter())
    }

    /// Whether the action alphabet includes `action`.
    pub fn permits_action(&self, action: ActionType) -> bool {
        self.allowed_actions.contains(&action)
    }
}

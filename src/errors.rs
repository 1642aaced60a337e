//! Top-level error type for the guard.

use thiserror::Error;

/// Errors surfaced at the guard's outer API. Policy and filter
/// *decisions* are structured return values, not errors; only genuine
/// failures land here.
#[derive(Debug, Error)]
pub enum GuardError {
    /// The request could not be turned into a valid intent
    #[error("invalid intent: {}", issues.join("; "))]
    IntentInvalid { issues: Vec<String> },

    /// Every plan-generation attempt failed and no fallback was allowed
    #[error("plan generation failed after {attempts} attempt(s): {cause}")]
    PlanGeneration { cause: String, attempts: u32 },

    /// An LLM provider failed
    #[error("provider error: {0}")]
    Provider(String),

    #[error(transparent)]
    Graph(#[from] browser_guard_plan_graph::GraphError),

    #[error(transparent)]
    Policy(#[from] browser_guard_policy::PolicyError),

    #[error(transparent)]
    Filter(#[from] browser_guard_http_filter::FilterError),

    #[error(transparent)]
    Ref(#[from] browser_guard_ref_store::RefError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

//! Step trace for audit and diagnostics.

use browser_guard_types::BrowserAction;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What the driver decided after a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepDecision {
    /// The step completed and the walk continues
    Continue,

    /// A conditional branch was taken to the next node
    Branch,

    /// The walk ended here, at a terminal or by being cut short
    Abort,
}

/// One executed step.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceEntry {
    /// Node that executed
    pub node_id: String,

    /// The action it performed
    pub action: BrowserAction,

    /// URL observed after the action
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_url: Option<String>,

    /// Driver decision for this step
    pub decision: StepDecision,

    /// Target node of the taken branch, when one was taken
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub taken_branch: Option<String>,

    /// Step time
    pub timestamp: DateTime<Utc>,
}

impl TraceEntry {
    pub fn new(node_id: impl Into<String>, action: BrowserAction, decision: StepDecision) -> Self {
        Self {
            node_id: node_id.into(),
            action,
            observed_url: None,
            decision,
            taken_branch: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_observed_url(mut self, url: impl Into<String>) -> Self {
        self.observed_url = Some(url.into());
        self
    }

    pub fn with_branch(mut self, target: impl Into<String>) -> Self {
        self.taken_branch = Some(target.into());
        self
    }
}

//! The LLM provider port and its decorators.
//!
//! Plan generation talks to a model through one async operation; the
//! transport (HTTP client, SDK, local process) lives outside the guard.
//! Providers must not retry; retrying is the planner's responsibility.

pub mod anthropic;
pub mod cache;
pub mod mock;
pub mod openai;

pub use anthropic::ClaudeConfig;
pub use cache::{CachingProvider, LoggingProvider, PlanCache};
pub use mock::MockLlmProvider;
pub use openai::OpenAiConfig;

use async_trait::async_trait;
use browser_guard_plan_graph::{GraphError, PlanGraph};
use browser_guard_types::Intent;
use serde_json::Value;

use crate::errors::GuardError;

/// Everything a provider needs to produce a plan.
#[derive(Debug, Clone)]
pub struct PlanRequest {
    /// Fixed system prompt declaring the planning rules
    pub system_prompt: String,

    /// User prompt built from the intent
    pub user_prompt: String,

    /// JSON schema of the expected plan shape
    pub schema: Value,

    /// The intent being planned for
    pub intent: Intent,
}

/// What a provider returns. `graph` is optional; when absent the
/// planner extracts the document from `raw_response`.
#[derive(Debug, Clone)]
pub struct PlanResponse {
    pub graph: Option<PlanGraph>,
    pub raw_response: String,
    pub tokens_used: Option<u64>,
}

/// The provider port. One operation, no retries.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn generate_plan(&self, request: &PlanRequest) -> Result<PlanResponse, GuardError>;

    /// Short name for logs.
    fn name(&self) -> &str {
        "llm"
    }
}

/// Extract a plan document from raw model text: a fenced code block if
/// present, else the outermost JSON object. A missing `entryPoint`
/// falls back to the first node's id.
pub fn extract_plan_document(raw: &str) -> Result<PlanGraph, GraphError> {
    let candidate = fenced_block(raw)
        .or_else(|| outer_object(raw))
        .ok_or(GraphError::MissingDocument)?;

    let mut document: Value = serde_json::from_str(candidate.trim())?;
    if document.get("entryPoint").is_none() {
        let first_id = document
            .get("nodes")
            .and_then(Value::as_array)
            .and_then(|nodes| nodes.first())
            .and_then(|node| node.get("id"))
            .cloned();
        if let (Some(id), Some(object)) = (first_id, document.as_object_mut()) {
            object.insert("entryPoint".to_string(), id);
        }
    }
    Ok(serde_json::from_value(document)?)
}

fn fenced_block(raw: &str) -> Option<&str> {
    let start = raw.find("```")?;
    let after_fence = &raw[start + 3..];
    let body_start = after_fence.find('\n').map(|i| i + 1).unwrap_or(0);
    let body = &after_fence[body_start..];
    let end = body.find("```")?;
    Some(&body[..end])
}

fn outer_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(&raw[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;

    const WIRE_PLAN: &str = r#"{
        "nodes": [
            {"id": "open", "action": {"type": "navigate", "target": "https://a.example", "description": "open"}},
            {"id": "done", "action": {"type": "extract", "description": "read"}, "isTerminal": true, "terminalResult": "success"}
        ],
        "edges": [
            {"from": "open", "to": "done", "condition": {"type": "default", "description": "go"}}
        ],
        "entryPoint": "open"
    }"#;

    #[test]
    fn test_extract_bare_json() {
        let graph = extract_plan_document(WIRE_PLAN).unwrap();
        assert_eq!(graph.entry_point, "open");
        assert_eq!(graph.nodes.len(), 2);
    }

    #[test]
    fn test_extract_fenced_json() {
        let raw = format!("Here is the plan:\n```json\n{WIRE_PLAN}\n```\nDone.");
        let graph = extract_plan_document(&raw).unwrap();
        assert_eq!(graph.entry_point, "open");
    }

    #[test]
    fn test_missing_entry_point_defaults_to_first_node() {
        let mut document: serde_json::Value = serde_json::from_str(WIRE_PLAN).unwrap();
        document.as_object_mut().unwrap().remove("entryPoint");
        let raw = serde_json::to_string(&document).unwrap();
        let graph = extract_plan_document(&raw).unwrap();
        assert_eq!(graph.entry_point, "open");
    }

    #[test]
    fn test_no_document_is_an_error() {
        assert!(matches!(
            extract_plan_document("I cannot produce a plan."),
            Err(GraphError::MissingDocument)
        ));
    }
}

//! Anthropic-shaped provider configuration and payload shaping.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::PlanRequest;

/// Default request budget for Anthropic-shaped endpoints.
pub const DEFAULT_ANTHROPIC_TIMEOUT_MS: u64 = 120_000;

/// Configuration for an Anthropic messages endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct ClaudeConfig {
    pub model: String,
    pub endpoint: String,
    pub timeout_ms: u64,
    pub max_tokens: u32,
}

impl Default for ClaudeConfig {
    fn default() -> Self {
        Self {
            model: "claude-sonnet-4-20250514".to_string(),
            endpoint: "https://api.anthropic.com/v1/messages".to_string(),
            timeout_ms: DEFAULT_ANTHROPIC_TIMEOUT_MS,
            max_tokens: 4_096,
        }
    }
}

impl ClaudeConfig {
    /// Messages payload. The schema rides in the system prompt since the
    /// messages API has no schema parameter.
    pub fn build_payload(&self, request: &PlanRequest) -> Value {
        let system = format!(
            "{}\n\nRespond with a single JSON document matching this schema:\n{}",
            request.system_prompt, request.schema
        );
        json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "system": system,
            "messages": [
                {"role": "user", "content": request.user_prompt},
            ],
        })
    }

    /// Pull the completion text out of a messages response.
    pub fn response_text(response: &Value) -> Option<String> {
        response
            .get("content")?
            .get(0)?
            .get("text")?
            .as_str()
            .map(|s| s.to_string())
    }

    /// Token usage reported by the endpoint, when present.
    pub fn tokens_used(response: &Value) -> Option<u64> {
        let usage = response.get("usage")?;
        let input = usage.get("input_tokens")?.as_u64()?;
        let output = usage.get("output_tokens")?.as_u64()?;
        Some(input + output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_response_extraction() {
        let response = json!({
            "content": [{"type": "text", "text": "plan text"}],
            "usage": {"input_tokens": 100, "output_tokens": 50}
        });
        assert_eq!(
            ClaudeConfig::response_text(&response).as_deref(),
            Some("plan text")
        );
        assert_eq!(ClaudeConfig::tokens_used(&response), Some(150));
    }

    #[test]
    fn test_timeout_defaults_differ_from_openai() {
        assert_eq!(ClaudeConfig::default().timeout_ms, 120_000);
        assert_eq!(
            super::super::openai::OpenAiConfig::default().timeout_ms,
            60_000
        );
    }
}

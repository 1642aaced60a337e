//! OpenAI-shaped provider configuration and payload shaping.
//!
//! The HTTP transport is the host's concern; this module owns the
//! request payload and response extraction so any chat-completions
//! compatible client can be dropped in.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::PlanRequest;

/// Default request budget for OpenAI-shaped endpoints.
pub const DEFAULT_OPENAI_TIMEOUT_MS: u64 = 60_000;

/// Configuration for an OpenAI-shaped chat-completions endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct OpenAiConfig {
    pub model: String,
    pub endpoint: String,
    pub timeout_ms: u64,
    pub max_tokens: u32,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o".to_string(),
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            timeout_ms: DEFAULT_OPENAI_TIMEOUT_MS,
            max_tokens: 4_096,
        }
    }
}

impl OpenAiConfig {
    /// Chat-completions payload with structured output pinned to the
    /// plan schema.
    pub fn build_payload(&self, request: &PlanRequest) -> Value {
        json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "messages": [
                {"role": "system", "content": request.system_prompt},
                {"role": "user", "content": request.user_prompt},
            ],
            "response_format": {
                "type": "json_schema",
                "json_schema": {
                    "name": "browsing_plan",
                    "schema": request.schema,
                },
            },
        })
    }

    /// Pull the completion text out of a chat-completions response.
    pub fn response_text(response: &Value) -> Option<String> {
        response
            .get("choices")?
            .get(0)?
            .get("message")?
            .get("content")?
            .as_str()
            .map(|s| s.to_string())
    }

    /// Token usage reported by the endpoint, when present.
    pub fn tokens_used(response: &Value) -> Option<u64> {
        response.get("usage")?.get("total_tokens")?.as_u64()
    }
}

//! Scripted provider for tests and offline runs.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;

use super::{LlmProvider, PlanRequest, PlanResponse};
use crate::errors::GuardError;

/// Returns canned raw responses in order; errors once the script runs
/// out.
#[derive(Debug, Default)]
pub struct MockLlmProvider {
    responses: Mutex<VecDeque<String>>,
    requests_seen: Mutex<Vec<String>>,
}

impl MockLlmProvider {
    pub fn new(responses: Vec<String>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requests_seen: Mutex::new(Vec::new()),
        }
    }

    /// User prompts the provider has been called with.
    pub fn requests_seen(&self) -> Vec<String> {
        self.requests_seen.lock().clone()
    }
}

#[async_trait]
impl LlmProvider for MockLlmProvider {
    async fn generate_plan(&self, request: &PlanRequest) -> Result<PlanResponse, GuardError> {
        self.requests_seen.lock().push(request.user_prompt.clone());
        let raw = self
            .responses
            .lock()
            .pop_front()
            .ok_or_else(|| GuardError::Provider("mock script exhausted".to_string()))?;
        Ok(PlanResponse {
            graph: None,
            raw_response: raw,
            tokens_used: Some(0),
        })
    }

    fn name(&self) -> &str {
        "mock"
    }
}

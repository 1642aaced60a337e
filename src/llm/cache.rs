//! Provider decorators: logging and plan caching.
//!
//! Both wrap the [`LlmProvider`] port, so they compose in any order
//! around any transport.

use async_trait::async_trait;
use browser_guard_plan_graph::PlanGraph;
use browser_guard_types::Intent;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use super::{LlmProvider, PlanRequest, PlanResponse};
use crate::errors::GuardError;

/// In-memory plan cache keyed by intent fingerprint.
#[derive(Debug, Default)]
pub struct PlanCache {
    plans: Mutex<HashMap<String, PlanGraph>>,
}

impl PlanCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stable fingerprint of the plan-relevant intent fields.
    pub fn fingerprint(intent: &Intent) -> String {
        let domains: Vec<&str> = intent.allowed_domains.iter().map(String::as_str).collect();
        format!("{}|{}|{}", intent.task_type, domains.join(","), intent.goal)
    }

    pub fn get(&self, intent: &Intent) -> Option<PlanGraph> {
        self.plans.lock().get(&Self::fingerprint(intent)).cloned()
    }

    pub fn put(&self, intent: &Intent, graph: PlanGraph) {
        self.plans.lock().insert(Self::fingerprint(intent), graph);
    }

    pub fn len(&self) -> usize {
        self.plans.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.plans.lock().is_empty()
    }
}

/// Logs every provider call with timing and token usage.
pub struct LoggingProvider {
    inner: Arc<dyn LlmProvider>,
}

impl LoggingProvider {
    pub fn new(inner: Arc<dyn LlmProvider>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl LlmProvider for LoggingProvider {
    async fn generate_plan(&self, request: &PlanRequest) -> Result<PlanResponse, GuardError> {
        let started = std::time::Instant::now();
        debug!(provider = self.inner.name(), task = %request.intent.task_type, "requesting plan");
        let result = self.inner.generate_plan(request).await;
        match &result {
            Ok(response) => info!(
                provider = self.inner.name(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                tokens = response.tokens_used.unwrap_or(0),
                "plan generated"
            ),
            Err(e) => info!(
                provider = self.inner.name(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                error = %e,
                "plan generation failed"
            ),
        }
        result
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

/// Serves a cached parsed plan for repeated intents, delegating on miss.
pub struct CachingProvider {
    inner: Arc<dyn LlmProvider>,
    cache: Arc<PlanCache>,
}

impl CachingProvider {
    pub fn new(inner: Arc<dyn LlmProvider>, cache: Arc<PlanCache>) -> Self {
        Self { inner, cache }
    }
}

#[async_trait]
impl LlmProvider for CachingProvider {
    async fn generate_plan(&self, request: &PlanRequest) -> Result<PlanResponse, GuardError> {
        if let Some(graph) = self.cache.get(&request.intent) {
            debug!(provider = self.inner.name(), "plan cache hit");
            return Ok(PlanResponse {
                raw_response: String::new(),
                graph: Some(graph),
                tokens_used: Some(0),
            });
        }
        let response = self.inner.generate_plan(request).await?;
        if let Some(graph) = &response.graph {
            self.cache.put(&request.intent, graph.clone());
        }
        Ok(response)
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::{parse_intent, ParseOptions};

    #[test]
    fn test_fingerprint_distinguishes_goals() {
        let a = parse_intent("Read the news on news.example.com", &ParseOptions::default())
            .unwrap();
        let b = parse_intent("Read the blog on news.example.com", &ParseOptions::default())
            .unwrap();
        assert_ne!(PlanCache::fingerprint(&a), PlanCache::fingerprint(&b));
    }

    #[test]
    fn test_cache_round_trip() {
        let cache = PlanCache::new();
        let intent = parse_intent("Read the news on news.example.com", &ParseOptions::default())
            .unwrap();
        assert!(cache.get(&intent).is_none());
        let graph = browser_guard_plan_graph::build_template_plan(&intent, &[]);
        cache.put(&intent, graph.clone());
        assert_eq!(cache.get(&intent).unwrap().id, graph.id);
        assert_eq!(cache.len(), 1);
    }
}

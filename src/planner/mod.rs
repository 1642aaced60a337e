//! Plan generation: template strategy plus the LLM-backed strategy with
//! retry and fallback.
//!
//! Generation is single-shot: it runs before any untrusted
//! content has been observed, and the produced graph is the complete
//! authorization for the session. Whatever a provider emits, the core
//! re-validates the structure and re-stamps the domain constraints
//! itself.

pub mod prompt;

use std::sync::Arc;

use browser_guard_plan_graph::{
    build_template_plan, plan_wire_schema, validate_plan, ExtractionTarget, PlanGraph,
};
use browser_guard_types::Intent;
use tracing::{debug, warn};

use crate::errors::GuardError;
use crate::llm::{extract_plan_document, LlmProvider, PlanRequest};
use prompt::{build_user_prompt, SYSTEM_PROMPT};

/// Plan-generation knobs.
#[derive(Debug, Clone)]
pub struct PlanOptions {
    /// LLM attempts before giving up
    pub max_retries: u32,

    /// Fall back to the template strategy on exhaustion
    pub fallback_to_template: bool,

    /// Extra extraction targets stamped onto extract nodes
    pub extraction_targets: Vec<ExtractionTarget>,
}

impl Default for PlanOptions {
    fn default() -> Self {
        Self {
            max_retries: 2,
            fallback_to_template: true,
            extraction_targets: Vec::new(),
        }
    }
}

/// The plan generator. Without a provider it is the template strategy;
/// with one, templates remain the validated fallback.
pub struct Planner {
    provider: Option<Arc<dyn LlmProvider>>,
}

impl Planner {
    /// Template-only planner.
    pub fn template_only() -> Self {
        Self { provider: None }
    }

    /// LLM-backed planner.
    pub fn with_provider(provider: Arc<dyn LlmProvider>) -> Self {
        Self {
            provider: Some(provider),
        }
    }

    /// Produce a validated plan for the intent.
    pub async fn build_plan(
        &self,
        intent: &Intent,
        options: &PlanOptions,
    ) -> Result<PlanGraph, GuardError> {
        let Some(provider) = &self.provider else {
            return Ok(build_template_plan(intent, &options.extraction_targets));
        };

        let request = PlanRequest {
            system_prompt: SYSTEM_PROMPT.to_string(),
            user_prompt: build_user_prompt(intent),
            schema: plan_wire_schema(),
            intent: intent.clone(),
        };

        let mut last_cause = String::new();
        for attempt in 1..=options.max_retries.max(1) {
            match self.generate_once(provider.as_ref(), &request, intent, options).await {
                Ok(graph) => {
                    debug!(attempt, plan = %graph.id, "accepted generated plan");
                    return Ok(graph);
                }
                Err(cause) => {
                    warn!(attempt, %cause, "plan attempt rejected");
                    last_cause = cause;
                }
            }
        }

        if options.fallback_to_template {
            warn!("falling back to template plan after failed generation");
            return Ok(build_template_plan(intent, &options.extraction_targets));
        }
        Err(GuardError::PlanGeneration {
            cause: last_cause,
            attempts: options.max_retries.max(1),
        })
    }

    /// One provider attempt: call, extract, finalize, validate.
    async fn generate_once(
        &self,
        provider: &dyn LlmProvider,
        request: &PlanRequest,
        intent: &Intent,
        options: &PlanOptions,
    ) -> Result<PlanGraph, String> {
        let response = provider
            .generate_plan(request)
            .await
            .map_err(|e| e.to_string())?;

        let mut graph = match response.graph {
            Some(graph) => graph,
            None => extract_plan_document(&response.raw_response).map_err(|e| e.to_string())?,
        };

        // The core owns the security boundary regardless of what the
        // model emitted.
        graph.finalize_for_intent(intent);
        for node in &mut graph.nodes {
            if node.action.action == browser_guard_types::ActionType::Extract {
                node.extraction_targets
                    .extend(options.extraction_targets.iter().cloned());
            }
        }

        let validation = validate_plan(&graph);
        if !validation.valid {
            return Err(format!(
                "generated plan failed validation: {}",
                validation.issues.join("; ")
            ));
        }
        Ok(graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::{parse_intent, ParseOptions};
    use crate::llm::MockLlmProvider;
    use browser_guard_plan_graph::TerminalResult;

    const GOOD_PLAN: &str = r#"{
        "nodes": [
            {"id": "open", "action": {"type": "navigate", "target": "https://newegg.com/", "description": "open the store"}},
            {"id": "done", "action": {"type": "extract", "description": "collect prices"}, "isTerminal": true, "terminalResult": "success"},
            {"id": "fail", "action": {"type": "navigate", "target": "https://newegg.com/", "description": "return home"}, "isTerminal": true, "terminalResult": "error"}
        ],
        "edges": [
            {"from": "open", "to": "fail", "condition": {"type": "content_match", "value": "404", "description": "page missing"}, "priority": 1},
            {"from": "open", "to": "done", "condition": {"type": "default", "description": "continue"}, "priority": 100}
        ],
        "entryPoint": "open"
    }"#;

    const BROKEN_PLAN: &str = r#"{
        "nodes": [
            {"id": "open", "action": {"type": "navigate", "target": "https://newegg.com/", "description": "open"}}
        ],
        "edges": [],
        "entryPoint": "open"
    }"#;

    fn search_intent() -> Intent {
        parse_intent(
            "Search for RTX 5090 prices on newegg.com",
            &ParseOptions::default(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_template_only_planner() {
        let planner = Planner::template_only();
        let graph = planner
            .build_plan(&search_intent(), &PlanOptions::default())
            .await
            .unwrap();
        assert!(validate_plan(&graph).valid);
        assert!(graph.intent.is_some());
    }

    #[tokio::test]
    async fn test_accepts_valid_generated_plan() {
        let provider = Arc::new(MockLlmProvider::new(vec![GOOD_PLAN.to_string()]));
        let planner = Planner::with_provider(provider);
        let graph = planner
            .build_plan(&search_intent(), &PlanOptions::default())
            .await
            .unwrap();
        assert_eq!(graph.entry_point, "open");
        // Domain constraints are stamped by the core, not trusted from
        // the model.
        assert!(graph.nodes.iter().all(|n| n.has_domain_constraint()));
        assert!(graph
            .terminals()
            .iter()
            .any(|n| n.terminal_result == Some(TerminalResult::Success)));
    }

    #[tokio::test]
    async fn test_retries_then_falls_back_to_template() {
        let provider = Arc::new(MockLlmProvider::new(vec![
            BROKEN_PLAN.to_string(),
            "still not a plan".to_string(),
        ]));
        let planner = Planner::with_provider(provider.clone());
        let graph = planner
            .build_plan(&search_intent(), &PlanOptions::default())
            .await
            .unwrap();
        // Both attempts were consumed before the fallback.
        assert_eq!(provider.requests_seen().len(), 2);
        assert!(validate_plan(&graph).valid);
    }

    #[tokio::test]
    async fn test_exhaustion_without_fallback_errors() {
        let provider = Arc::new(MockLlmProvider::new(vec![
            BROKEN_PLAN.to_string(),
            BROKEN_PLAN.to_string(),
        ]));
        let planner = Planner::with_provider(provider);
        let options = PlanOptions {
            fallback_to_template: false,
            ..Default::default()
        };
        let err = planner
            .build_plan(&search_intent(), &options)
            .await
            .unwrap_err();
        match err {
            GuardError::PlanGeneration { attempts, cause } => {
                assert_eq!(attempts, 2);
                assert!(cause.contains("validation"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_extraction_targets_stamped_on_generated_plan() {
        let provider = Arc::new(MockLlmProvider::new(vec![GOOD_PLAN.to_string()]));
        let planner = Planner::with_provider(provider);
        let options = PlanOptions {
            extraction_targets: vec![ExtractionTarget {
                name: "price".to_string(),
                selector: ".price".to_string(),
            }],
            ..Default::default()
        };
        let graph = planner
            .build_plan(&search_intent(), &options)
            .await
            .unwrap();
        let done = graph.node("done").unwrap();
        assert!(done.extraction_targets.iter().any(|t| t.name == "price"));
    }
}

//! The secure driver loop.

use std::sync::Arc;
use std::time::Instant;

use browser_guard_plan_graph::{Constraint, PlanGraph, PlanNode, TerminalResult};
use browser_guard_policy::PolicyEngine;
use browser_guard_ref_store::{RefStore, VersionedRef};
use browser_guard_types::{domains, ActionType, MAX_TIMEOUT_MS};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::adapter::{AdapterError, BrowserAdapter, Observation};
use crate::branch::{condition_holds, select_branch};
use crate::context::ExecContext;
use crate::steering::SteeringDetector;
use crate::trace::{StepDecision, TraceEntry};

/// Terminal classification of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    /// The plan reached a success terminal
    Complete,

    /// The session was cut short: steering, strict outcome mismatch,
    /// cancellation, or an abort terminal
    Aborted,

    /// Policy or a constraint refused an action
    Blocked,

    /// The wall-clock budget ran out
    Timeout,

    /// The plan broke down: unknown node, no valid branch, adapter failure
    Error,
}

/// What a finished session reports back.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub status: ExecutionStatus,

    /// Data harvested up to the point the session ended
    pub data: Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Step-by-step audit trail
    pub trace: Vec<TraceEntry>,

    pub duration_ms: u64,
}

/// Interpreter tuning knobs.
#[derive(Debug, Clone)]
pub struct InterpreterConfig {
    /// Abort on required outcome mismatches
    pub strict_outcomes: bool,

    /// Collect the step trace
    pub collect_trace: bool,

    /// Budget for plans that carry no intent
    pub default_timeout_ms: u64,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            strict_outcomes: true,
            collect_trace: true,
            default_timeout_ms: 60_000,
        }
    }
}

/// Sequential plan driver. Owns its adapter handle and policy for the
/// lifetime of the session; independent sessions get independent
/// interpreters.
pub struct Interpreter {
    adapter: Arc<dyn BrowserAdapter>,
    policy: PolicyEngine,
    detector: SteeringDetector,
    config: InterpreterConfig,
    cancel: CancellationToken,
}

impl Interpreter {
    pub fn new(adapter: Arc<dyn BrowserAdapter>, policy: PolicyEngine) -> Self {
        Self::with_config(adapter, policy, InterpreterConfig::default())
    }

    pub fn with_config(
        adapter: Arc<dyn BrowserAdapter>,
        policy: PolicyEngine,
        config: InterpreterConfig,
    ) -> Self {
        Self {
            adapter,
            policy,
            detector: SteeringDetector::new(),
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Token that aborts the session when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Drive a validated plan to one of the terminal statuses.
    pub async fn execute(&self, graph: &PlanGraph) -> ExecutionResult {
        let started = Instant::now();
        let timeout_ms = graph
            .intent
            .as_ref()
            .map(|i| i.timeout_ms.min(MAX_TIMEOUT_MS))
            .unwrap_or(self.config.default_timeout_ms);
        let max_depth = graph
            .intent
            .as_ref()
            .map(|i| i.max_depth)
            .unwrap_or(u32::MAX);

        let mut ctx = ExecContext::new();
        let mut refs = RefStore::new();
        let mut trace: Vec<TraceEntry> = Vec::new();
        let mut current = graph.entry_point.clone();

        info!(plan = %graph.id, entry = %current, timeout_ms, "starting plan execution");

        loop {
            if self.cancel.is_cancelled() {
                return self.finish(
                    ExecutionStatus::Aborted,
                    Some("session cancelled".to_string()),
                    ctx,
                    trace,
                    started,
                );
            }
            if started.elapsed().as_millis() as u64 >= timeout_ms {
                return self.finish(
                    ExecutionStatus::Timeout,
                    Some(format!("session exceeded its {timeout_ms}ms budget")),
                    ctx,
                    trace,
                    started,
                );
            }

            let Some(node) = graph.node(&current) else {
                return self.finish(
                    ExecutionStatus::Error,
                    Some(format!("node '{current}' not found in plan")),
                    ctx,
                    trace,
                    started,
                );
            };

            if let Some(reason) = self.check_constraints(node, &ctx) {
                return self.finish(ExecutionStatus::Blocked, Some(reason), ctx, trace, started);
            }

            if node.action.action == ActionType::Navigate && ctx.depth >= max_depth {
                return self.finish(
                    ExecutionStatus::Blocked,
                    Some(format!("navigation depth limit of {max_depth} reached")),
                    ctx,
                    trace,
                    started,
                );
            }

            // Versioned-ref targets must resolve against the current
            // snapshot; staleness is recoverable, so it blocks rather
            // than errors.
            if let Some(reason) = check_ref_target(node, &refs) {
                return self.finish(ExecutionStatus::Blocked, Some(reason), ctx, trace, started);
            }

            let decision = self.policy.allows(&node.action, &ctx.as_action_context());
            if !decision.allowed {
                let reason = decision
                    .reason
                    .unwrap_or_else(|| "action refused by policy".to_string());
                warn!(node = %node.id, %reason, "action blocked");
                return self.finish(ExecutionStatus::Blocked, Some(reason), ctx, trace, started);
            }

            let (observation, extracted) = match self.execute_action(node).await {
                Ok(pair) => pair,
                Err(e) => {
                    return self.finish(
                        ExecutionStatus::Error,
                        Some(e.to_string()),
                        ctx,
                        trace,
                        started,
                    )
                }
            };

            if node.action.action == ActionType::Navigate {
                ctx.depth += 1;
            }
            ctx.observe_url(&observation.url);
            refs.create_snapshot(&observation.url, observation.elements.clone());
            self.merge_extracted(node, extracted, &mut ctx);

            if node.is_terminal {
                if self.config.collect_trace {
                    trace.push(
                        TraceEntry::new(&node.id, node.action.clone(), StepDecision::Abort)
                            .with_observed_url(&observation.url),
                    );
                }
                let status = match node.terminal_result {
                    Some(TerminalResult::Success) | None => ExecutionStatus::Complete,
                    Some(TerminalResult::Error) => ExecutionStatus::Error,
                    Some(TerminalResult::Abort) => ExecutionStatus::Aborted,
                };
                info!(node = %node.id, ?status, "plan reached terminal");
                return self.finish(status, None, ctx, trace, started);
            }

            if let Some(mismatch) = self.validate_outcomes(node, &observation) {
                if self.config.strict_outcomes {
                    if self.config.collect_trace {
                        trace.push(
                            TraceEntry::new(&node.id, node.action.clone(), StepDecision::Abort)
                                .with_observed_url(&observation.url),
                        );
                    }
                    return self.finish(
                        ExecutionStatus::Aborted,
                        Some(mismatch),
                        ctx,
                        trace,
                        started,
                    );
                }
                warn!(node = %node.id, %mismatch, "outcome mismatch tolerated (strict mode off)");
            }

            let outgoing = graph.edges_from(&node.id);
            let Some(edge) = select_branch(&outgoing, &observation) else {
                if self.config.collect_trace {
                    trace.push(
                        TraceEntry::new(&node.id, node.action.clone(), StepDecision::Abort)
                            .with_observed_url(&observation.url),
                    );
                }
                return self.finish(
                    ExecutionStatus::Error,
                    Some(format!("no valid branch from node '{}'", node.id)),
                    ctx,
                    trace,
                    started,
                );
            };

            if let Some(reason) = self.detector.check(&observation, &ctx) {
                return self.finish(ExecutionStatus::Aborted, Some(reason), ctx, trace, started);
            }

            if self.config.collect_trace {
                trace.push(
                    TraceEntry::new(&node.id, node.action.clone(), StepDecision::Branch)
                        .with_observed_url(&observation.url)
                        .with_branch(&edge.to),
                );
            }
            current = edge.to.clone();
        }
    }

    /// First required outcome the observation fails to satisfy.
    fn validate_outcomes(&self, node: &PlanNode, observation: &Observation) -> Option<String> {
        for outcome in &node.expected_outcomes {
            let holds = condition_holds(outcome.kind, outcome.value.as_deref(), observation);
            if !holds {
                if outcome.required {
                    return Some(format!(
                        "required outcome not met after '{}': {}",
                        node.id, outcome.description
                    ));
                }
                debug!(node = %node.id, outcome = %outcome.description, "optional outcome not met");
            }
        }
        None
    }

    /// Node-local invariants, checked before the action runs.
    fn check_constraints(&self, node: &PlanNode, ctx: &ExecContext) -> Option<String> {
        for constraint in &node.constraints {
            match constraint {
                Constraint::Domain { allowed } => {
                    let subject = match node.action.action {
                        ActionType::Navigate => {
                            node.action.target.as_deref().and_then(domains::host_of)
                        }
                        _ => ctx.current_domain.clone(),
                    };
                    if let Some(host) = subject {
                        if !domains::any_domain_matches(&host, allowed.iter()) {
                            return Some(format!(
                                "node '{}' violates its domain constraint: '{host}' is not allowed",
                                node.id
                            ));
                        }
                    }
                }
            }
        }
        None
    }

    async fn execute_action(
        &self,
        node: &PlanNode,
    ) -> Result<(Observation, Option<Value>), AdapterError> {
        let action = &node.action;
        let target = action.target.as_deref();
        match action.action {
            ActionType::Navigate => {
                let url = target
                    .ok_or_else(|| AdapterError::Other("navigate action has no target".into()))?;
                Ok((self.adapter.navigate(url).await?, None))
            }
            ActionType::Click => {
                let selector = target
                    .ok_or_else(|| AdapterError::Other("click action has no target".into()))?;
                Ok((self.adapter.click(selector).await?, None))
            }
            ActionType::Type => {
                let selector = target
                    .ok_or_else(|| AdapterError::Other("type action has no target".into()))?;
                let text = action.value.as_deref().unwrap_or("");
                Ok((self.adapter.type_text(selector, text).await?, None))
            }
            ActionType::Scroll => {
                let direction = action.value.as_deref().unwrap_or("down");
                Ok((self.adapter.scroll(direction, None).await?, None))
            }
            ActionType::Extract => {
                let selectors: Vec<String> = if node.extraction_targets.is_empty() {
                    vec![target.unwrap_or("body").to_string()]
                } else {
                    node.extraction_targets
                        .iter()
                        .map(|t| t.selector.clone())
                        .collect()
                };
                let (observation, data) = self.adapter.extract(&selectors).await?;
                Ok((observation, Some(data)))
            }
            ActionType::Screenshot => {
                let (observation, _image) = self.adapter.screenshot().await?;
                Ok((observation, None))
            }
            ActionType::Wait => {
                let ms = action
                    .value
                    .as_deref()
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(1_000);
                Ok((self.adapter.wait(ms).await?, None))
            }
        }
    }

    /// Store harvested data under the node's target names.
    fn merge_extracted(&self, node: &PlanNode, extracted: Option<Value>, ctx: &mut ExecContext) {
        let Some(extracted) = extracted else { return };
        if node.extraction_targets.is_empty() {
            if let Value::Object(map) = extracted {
                ctx.data.extend(map);
            }
            return;
        }
        for extraction in &node.extraction_targets {
            if let Some(value) = extracted.get(&extraction.selector) {
                ctx.data.insert(extraction.name.clone(), value.clone());
            }
        }
    }

    fn finish(
        &self,
        status: ExecutionStatus,
        reason: Option<String>,
        ctx: ExecContext,
        trace: Vec<TraceEntry>,
        started: Instant,
    ) -> ExecutionResult {
        ExecutionResult {
            status,
            data: Value::Object(ctx.data),
            reason,
            trace: if self.config.collect_trace {
                trace
            } else {
                Vec::new()
            },
            duration_ms: started.elapsed().as_millis() as u64,
        }
    }
}

/// Versioned-ref target validation for element-level actions. Targets
/// that are plain selectors pass through untouched.
fn check_ref_target(node: &PlanNode, refs: &RefStore) -> Option<String> {
    if !matches!(node.action.action, ActionType::Click | ActionType::Type) {
        return None;
    }
    let target = node.action.target.as_deref()?;
    let vref: VersionedRef = target.parse().ok()?;
    match refs.resolve(vref) {
        Ok(_) => None,
        Err(e) => Some(format!("ref target '{target}' rejected: {e}")),
    }
}

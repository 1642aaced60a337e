//! Browser Guard: a security mediator between LLM-driven agents and
//! browser/HTTP tool surfaces.
//!
//! The guard derives a typed [`Intent`] from the user's request,
//! generates a complete conditional plan *before any untrusted content
//! is observed*, screens every planned action through a prioritized
//! policy engine, filters every outbound HTTP request, and executes the
//! plan in a restricted interpreter that only takes pre-enumerated
//! transitions.
//!
//! The root crate hosts the intent parser, the plan generator with its
//! LLM provider port, the tool-call mediator, and a scripted mock
//! browser; the heavy subsystems live in the workspace members.

pub mod config;
pub mod errors;
pub mod intent;
pub mod llm;
pub mod mediator;
pub mod mock;
pub mod planner;

pub use config::GuardConfig;
pub use errors::GuardError;
pub use intent::{parse_intent, validate_intent, ParseOptions};
pub use mediator::{GuardMediator, GuardMode, MediationOutcome, ToolCallRequest};
pub use mock::MockBrowser;
pub use planner::{PlanOptions, Planner};

pub use browser_guard_http_filter::{FilterDecision, HttpRequest, RequestFilter};
pub use browser_guard_interpreter::{
    BrowserAdapter, ExecutionResult, ExecutionStatus, Interpreter, InterpreterConfig, Observation,
};
pub use browser_guard_plan_graph::{describe_plan, validate_plan, PlanGraph};
pub use browser_guard_policy::{Decision, PolicyEngine};
pub use browser_guard_ref_store::{RefStore, SensitiveDetector};
pub use browser_guard_types::{ActionType, BrowserAction, Intent, SensitiveLabel, TaskType};

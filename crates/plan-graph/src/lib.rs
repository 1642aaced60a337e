//! Execution graph model for Browser Guard.
//!
//! A plan graph is the complete conditional browsing session, produced
//! before any untrusted content is observed: every branch the session
//! may take is enumerated up front, and the interpreter later refuses
//! any transition the graph does not contain. Nodes own their actions;
//! all cross-references are by node id, which keeps plans serializable
//! and statically checkable.

pub mod describe;
pub mod errors;
pub mod model;
pub mod schema;
pub mod templates;
pub mod validator;

pub use describe::describe_plan;
pub use errors::GraphError;
pub use model::{
    Constraint, EdgeCondition, ConditionType, ExpectedOutcome, ExtractionTarget, NodeId,
    PlanEdge, PlanGraph, PlanNode, TerminalResult,
};
pub use schema::plan_wire_schema;
pub use templates::build_template_plan;
pub use validator::validate_plan;

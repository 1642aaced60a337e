//! Prioritized, multi-source policy engine for Browser Guard.
//!
//! Rules are data: a sorted list of `(id, source, scope, effect, priority)`
//! records seeded from the compiled-in static table, extended per-intent
//! with task-derived rules, and augmented at runtime by site-advertised
//! and user-configured rules. Evaluation runs a short non-overridable
//! security preamble first, then hard domain and action-alphabet checks,
//! then the first matching rule in ascending priority order.

pub mod defaults;
pub mod engine;
pub mod errors;
pub mod model;
pub mod site;

pub use engine::PolicyEngine;
pub use errors::PolicyError;
pub use model::{ActionContext, Decision, PolicyRule, RuleEffect, RuleScope, RuleSource};
pub use site::parse_site_policies;

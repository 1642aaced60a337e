//! Rule and decision models

use browser_guard_types::{ActionType, BrowserAction, TaskType};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Where a rule came from. Sources have different lifetimes: static rules
/// are process-global and immutable, task rules are derived per-intent,
/// site rules arrive when a page advertises them, user rules come from
/// host configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleSource {
    Static,
    Site,
    Task,
    User,
}

/// What a matching rule decides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleEffect {
    /// Permit the action
    Allow,

    /// Refuse the action
    Deny,

    /// Permit only with out-of-band user acknowledgement; callers that
    /// cannot confirm treat this as deny
    Confirm,
}

/// Predicate over actions. A `None` field matches everything, so the
/// empty scope is the universal rule.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleScope {
    /// Restrict to these domains (exact or subdomain)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domains: Option<Vec<String>>,

    /// Restrict to these action types
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actions: Option<Vec<ActionType>>,

    /// Restrict to these task types
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_types: Option<Vec<TaskType>>,

    /// Regex over the action target
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_regex: Option<String>,

    /// Regex over the action description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description_regex: Option<String>,
}

impl RuleScope {
    /// The universal scope.
    pub fn any() -> Self {
        Self::default()
    }

    pub fn for_actions(actions: Vec<ActionType>) -> Self {
        Self {
            actions: Some(actions),
            ..Self::default()
        }
    }

    pub fn for_task_types(task_types: Vec<TaskType>) -> Self {
        Self {
            task_types: Some(task_types),
            ..Self::default()
        }
    }

    pub fn for_domains(domains: Vec<String>) -> Self {
        Self {
            domains: Some(domains),
            ..Self::default()
        }
    }

    pub fn with_target_regex(mut self, pattern: impl Into<String>) -> Self {
        self.target_regex = Some(pattern.into());
        self
    }

    pub fn with_description_regex(mut self, pattern: impl Into<String>) -> Self {
        self.description_regex = Some(pattern.into());
        self
    }

    /// Whether this scope covers `action` in `ctx` under `intent`.
    pub fn matches(
        &self,
        action: &BrowserAction,
        ctx: &ActionContext,
        task_type: Option<TaskType>,
    ) -> bool {
        if let Some(actions) = &self.actions {
            if !actions.contains(&action.action) {
                return false;
            }
        }
        if let Some(task_types) = &self.task_types {
            match task_type {
                Some(task) if task_types.contains(&task) => {}
                _ => return false,
            }
        }
        if let Some(domains) = &self.domains {
            let subject = match action.action {
                ActionType::Navigate => action
                    .target
                    .as_deref()
                    .and_then(browser_guard_types::domains::host_of)
                    .or_else(|| ctx.current_domain.clone()),
                _ => ctx.current_domain.clone(),
            };
            match subject {
                Some(host) => {
                    if !browser_guard_types::domains::any_domain_matches(&host, domains.iter()) {
                        return false;
                    }
                }
                None => return false,
            }
        }
        if let Some(pattern) = &self.target_regex {
            let target = action.target.as_deref().unwrap_or("");
            match Regex::new(pattern) {
                Ok(re) if re.is_match(target) => {}
                _ => return false,
            }
        }
        if let Some(pattern) = &self.description_regex {
            match Regex::new(pattern) {
                Ok(re) if re.is_match(&action.description) => {}
                _ => return false,
            }
        }
        true
    }
}

/// One policy rule. Lower priority wins; ties break by insertion order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyRule {
    /// Stable identifier surfaced in decisions
    pub id: String,

    /// Provenance
    pub source: RuleSource,

    /// What the rule covers
    pub scope: RuleScope,

    /// What a match decides
    pub effect: RuleEffect,

    /// Ascending precedence (lower = evaluated first)
    pub priority: u32,
}

impl PolicyRule {
    pub fn new(
        id: impl Into<String>,
        source: RuleSource,
        scope: RuleScope,
        effect: RuleEffect,
        priority: u32,
    ) -> Self {
        Self {
            id: id.into(),
            source,
            scope,
            effect,
            priority,
        }
    }
}

/// Context an in-flight action is evaluated in.
#[derive(Debug, Clone, Default)]
pub struct ActionContext {
    /// URL of the page the session currently shows
    pub current_url: Option<String>,

    /// Host of `current_url`
    pub current_domain: Option<String>,

    /// Domains visited so far, in order
    pub visited_domains: Vec<String>,

    /// Navigation hops consumed
    pub depth: u32,
}

impl ActionContext {
    pub fn at_url(url: impl Into<String>) -> Self {
        let url = url.into();
        let current_domain = browser_guard_types::domains::host_of(&url);
        Self {
            current_url: Some(url),
            current_domain,
            visited_domains: Vec::new(),
            depth: 0,
        }
    }
}

/// Outcome of a policy check. Returned, never thrown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    /// Whether the caller may proceed without further ceremony
    pub allowed: bool,

    /// The deciding effect
    pub effect: RuleEffect,

    /// Rule id that decided, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_rule: Option<String>,

    /// Human-readable explanation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Decision {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            effect: RuleEffect::Allow,
            matched_rule: None,
            reason: None,
        }
    }

    pub fn allow_by(rule_id: impl Into<String>) -> Self {
        Self {
            allowed: true,
            effect: RuleEffect::Allow,
            matched_rule: Some(rule_id.into()),
            reason: None,
        }
    }

    pub fn deny(rule_id: Option<String>, reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            effect: RuleEffect::Deny,
            matched_rule: rule_id,
            reason: Some(reason.into()),
        }
    }

    pub fn confirm(rule_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            effect: RuleEffect::Confirm,
            matched_rule: Some(rule_id.into()),
            reason: Some(reason.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_scope_matches_everything() {
        let scope = RuleScope::any();
        let action = BrowserAction::click("#buy", "Buy it");
        assert!(scope.matches(&action, &ActionContext::default(), None));
    }

    #[test]
    fn test_action_scope() {
        let scope = RuleScope::for_actions(vec![ActionType::Click]);
        let click = BrowserAction::click("#a", "click");
        let nav = BrowserAction::navigate("https://a.example", "go");
        assert!(scope.matches(&click, &ActionContext::default(), None));
        assert!(!scope.matches(&nav, &ActionContext::default(), None));
    }

    #[test]
    fn test_domain_scope_uses_navigation_target() {
        let scope = RuleScope::for_domains(vec!["github.com".to_string()]);
        let nav = BrowserAction::navigate("https://api.github.com/x", "go");
        assert!(scope.matches(&nav, &ActionContext::default(), None));
        let elsewhere = BrowserAction::navigate("https://attacker.example", "go");
        assert!(!scope.matches(&elsewhere, &ActionContext::default(), None));
    }

    #[test]
    fn test_description_regex_scope() {
        let scope = RuleScope::for_actions(vec![ActionType::Click])
            .with_description_regex(r"(?i)\bpay now\b");
        let pay = BrowserAction::click("#pay", "Pay Now");
        let browse = BrowserAction::click("#more", "Show more results");
        assert!(scope.matches(&pay, &ActionContext::default(), None));
        assert!(!scope.matches(&browse, &ActionContext::default(), None));
    }
}

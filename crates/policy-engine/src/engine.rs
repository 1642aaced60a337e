//! Policy evaluation engine.
//!
//! Every action a plan wants to perform passes through `allows()`, and
//! every intent passes through `allows_intent()` before a plan is even
//! generated. Evaluation order:
//!
//! 1. Security preamble: pattern predicates no rule can override
//!    (executable downloads, payment commitments, plaintext credentials).
//! 2. Navigation domain check against the intent allowlist.
//! 3. Action-alphabet check against the intent.
//! 4. First matching rule in ascending priority order.
//! 5. Fallthrough allow.

use browser_guard_types::{domains, ActionType, BrowserAction, Intent, TaskType};
use tracing::{debug, warn};

use crate::defaults::{
    is_malicious_host, static_rules, task_rules, EXECUTABLE_EXTENSIONS, PAYMENT_PATTERNS,
};
use crate::model::{ActionContext, Decision, PolicyRule, RuleEffect};

/// Rule ids whose predicate cannot be expressed as a scope and is
/// enforced by the preamble instead of the rule scan.
const PREAMBLE_ONLY_RULES: &[&str] = &["https-only-credentials"];

/// Per-session policy engine: a sorted rule list plus the immutable
/// security preamble.
pub struct PolicyEngine {
    intent: Option<Intent>,
    rules: Vec<PolicyRule>,
}

impl PolicyEngine {
    /// Engine with static rules only (no intent to derive task rules from).
    pub fn new() -> Self {
        let mut engine = Self {
            intent: None,
            rules: static_rules(),
        };
        engine.sort_rules();
        engine
    }

    /// Engine seeded with static rules plus rules derived from `intent`.
    pub fn for_intent(intent: &Intent) -> Self {
        let mut rules = static_rules();
        rules.extend(task_rules(intent));
        let mut engine = Self {
            intent: Some(intent.clone()),
            rules,
        };
        engine.sort_rules();
        engine
    }

    /// Admit externally-parsed site rules (see [`crate::site`]).
    pub fn add_site_policies(&mut self, rules: Vec<PolicyRule>) {
        for rule in &rules {
            debug!(rule = %rule.id, priority = rule.priority, "admitting site policy rule");
        }
        self.rules.extend(rules);
        self.sort_rules();
    }

    /// Inject a host-configured rule.
    pub fn add_rule(&mut self, rule: PolicyRule) {
        self.rules.push(rule);
        self.sort_rules();
    }

    /// Snapshot of the current rule list, in evaluation order.
    pub fn rules(&self) -> Vec<PolicyRule> {
        self.rules.clone()
    }

    /// Screen an entire intent before planning.
    pub fn allows_intent(&self, intent: &Intent) -> Decision {
        if intent.task_type == TaskType::Extract && !intent.sensitive_data.is_empty() {
            return Decision::deny(
                None,
                format!(
                    "read-only extract request references sensitive data: {}",
                    intent
                        .sensitive_data
                        .iter()
                        .map(|l| l.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
            );
        }
        for domain in &intent.allowed_domains {
            if is_malicious_host(domain) {
                return Decision::deny(
                    Some("block-malicious-domains".to_string()),
                    format!("allowed domain '{domain}' matches a malicious pattern"),
                );
            }
        }
        Decision::allow()
    }

    /// Screen one action in flight.
    pub fn allows(&self, action: &BrowserAction, ctx: &ActionContext) -> Decision {
        if let Some(decision) = self.security_preamble(action, ctx) {
            warn!(
                action = %action.action,
                rule = decision.matched_rule.as_deref().unwrap_or("-"),
                "action denied by security preamble"
            );
            return decision;
        }

        if action.action == ActionType::Navigate {
            if let Some(decision) = self.check_navigation_domain(action) {
                return decision;
            }
        }

        if let Some(intent) = &self.intent {
            if !intent.permits_action(action.action) {
                return Decision::deny(
                    Some("task-action-allowlist".to_string()),
                    format!(
                        "action '{}' is outside the {} task alphabet",
                        action.action, intent.task_type
                    ),
                );
            }
        }

        let task_type = self.intent.as_ref().map(|i| i.task_type);
        for rule in &self.rules {
            if PREAMBLE_ONLY_RULES.contains(&rule.id.as_str()) {
                continue;
            }
            if rule.scope.matches(action, ctx, task_type) {
                debug!(rule = %rule.id, effect = ?rule.effect, "rule matched");
                return match rule.effect {
                    RuleEffect::Allow => Decision::allow_by(rule.id.clone()),
                    RuleEffect::Deny => Decision::deny(
                        Some(rule.id.clone()),
                        format!("denied by rule '{}'", rule.id),
                    ),
                    RuleEffect::Confirm => Decision::confirm(
                        rule.id.clone(),
                        format!("rule '{}' requires user confirmation", rule.id),
                    ),
                };
            }
        }

        Decision::allow()
    }

    /// Pattern predicates that cannot be overridden by any rule.
    fn security_preamble(&self, action: &BrowserAction, ctx: &ActionContext) -> Option<Decision> {
        if let Some(target) = &action.target {
            if EXECUTABLE_EXTENSIONS.is_match(target) {
                return Some(Decision::deny(
                    Some("no-executable-download".to_string()),
                    format!("target '{target}' is an executable download"),
                ));
            }
        }

        if PAYMENT_PATTERNS.is_match(&action.description) {
            return Some(Decision::deny(
                Some("no-auto-payment".to_string()),
                format!(
                    "payment action '{}' must never be auto-submitted",
                    action.description
                ),
            ));
        }

        if let Some(intent) = &self.intent {
            if intent.task_type == TaskType::Login
                && matches!(action.action, ActionType::Click | ActionType::Type)
            {
                let https = ctx
                    .current_url
                    .as_deref()
                    .map(|u| u.starts_with("https://"))
                    .unwrap_or(false);
                if !https {
                    return Some(Decision::deny(
                        Some("https-only-credentials".to_string()),
                        "credentials must never leave a plaintext page".to_string(),
                    ));
                }
            }
        }

        None
    }

    /// Hard domain screening for navigations.
    fn check_navigation_domain(&self, action: &BrowserAction) -> Option<Decision> {
        let target = action.target.as_deref()?;
        let host = match domains::host_of(target) {
            Some(host) => host,
            None => {
                return Some(Decision::deny(
                    None,
                    format!("cannot determine target host of navigation '{target}'"),
                ))
            }
        };
        if is_malicious_host(&host) {
            return Some(Decision::deny(
                Some("block-malicious-domains".to_string()),
                format!("navigation target '{host}' matches a malicious pattern"),
            ));
        }
        if let Some(intent) = &self.intent {
            if !intent.permits_domain(&host) {
                return Some(Decision::deny(
                    Some("task-domain-denylist".to_string()),
                    format!("domain '{host}' is not in the session allowlist"),
                ));
            }
        }
        None
    }

    fn sort_rules(&mut self) {
        self.rules.sort_by_key(|r| r.priority);
    }
}

impl Default for PolicyEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{RuleScope, RuleSource};
    use browser_guard_types::SensitiveLabel;
    use std::collections::BTreeSet;

    fn intent(task_type: TaskType, domain: &str) -> Intent {
        Intent {
            goal: "test".to_string(),
            task_type,
            allowed_domains: [domain.to_string(), format!("www.{domain}")]
                .into_iter()
                .collect::<BTreeSet<_>>(),
            allowed_actions: task_type.allowed_actions().iter().copied().collect(),
            sensitive_data: Vec::new(),
            max_depth: task_type.default_max_depth(),
            timeout_ms: task_type.default_timeout_ms(),
            original_request: "test request".to_string(),
        }
    }

    #[test]
    fn test_payment_click_denied_even_for_purchase_task() {
        let engine = PolicyEngine::for_intent(&intent(TaskType::Purchase, "shop.example"));
        let action = BrowserAction::click("#pay", "Pay Now");
        let decision = engine.allows(&action, &ActionContext::at_url("https://shop.example/cart"));
        assert!(!decision.allowed);
        assert!(decision.reason.unwrap().contains("payment"));
    }

    #[test]
    fn test_executable_download_denied() {
        let engine = PolicyEngine::for_intent(&intent(TaskType::Extract, "files.example"));
        let action = BrowserAction::navigate("https://files.example/setup.exe", "Download setup");
        let decision = engine.allows(&action, &ActionContext::default());
        assert!(!decision.allowed);
        assert_eq!(
            decision.matched_rule.as_deref(),
            Some("no-executable-download")
        );
    }

    #[test]
    fn test_http_login_typing_denied() {
        let engine = PolicyEngine::for_intent(&intent(TaskType::Login, "mysite.example"));
        let action = BrowserAction::type_text("#password", "secret", "Enter password");
        let ctx = ActionContext::at_url("http://mysite.example/login");
        let decision = engine.allows(&action, &ctx);
        assert!(!decision.allowed);
        assert_eq!(
            decision.matched_rule.as_deref(),
            Some("https-only-credentials")
        );
    }

    #[test]
    fn test_https_login_typing_allowed() {
        let engine = PolicyEngine::for_intent(&intent(TaskType::Login, "mysite.example"));
        let action = BrowserAction::type_text("#password", "secret", "Enter password");
        let ctx = ActionContext::at_url("https://mysite.example/login");
        assert!(engine.allows(&action, &ctx).allowed);
    }

    #[test]
    fn test_navigation_outside_allowlist_denied() {
        let engine = PolicyEngine::for_intent(&intent(TaskType::Search, "newegg.com"));
        let good = BrowserAction::navigate("https://www.newegg.com/p/ABC", "Open product");
        let bad = BrowserAction::navigate("https://attacker.example/fake", "Open page");
        assert!(engine.allows(&good, &ActionContext::default()).allowed);
        let decision = engine.allows(&bad, &ActionContext::default());
        assert!(!decision.allowed);
        assert!(decision.reason.unwrap().contains("allowlist"));
    }

    #[test]
    fn test_action_outside_alphabet_denied() {
        let engine = PolicyEngine::for_intent(&intent(TaskType::Extract, "news.example"));
        let action = BrowserAction::click("#subscribe", "Subscribe to newsletter");
        let ctx = ActionContext::at_url("https://news.example");
        let decision = engine.allows(&action, &ctx);
        assert!(!decision.allowed);
        assert!(decision.reason.unwrap().contains("alphabet"));
    }

    #[test]
    fn test_confirm_rule_surfaces_confirm_effect() {
        // Engine without task-derived allow rules: a click falls through to
        // the confirm-form-submit gate rather than allow or deny.
        let engine = PolicyEngine::new();
        let action = BrowserAction::click("#submit", "Submit the search form");
        let decision = engine.allows(&action, &ActionContext::default());
        assert!(!decision.allowed);
        assert_eq!(decision.effect, RuleEffect::Confirm);
        assert_eq!(decision.matched_rule.as_deref(), Some("confirm-form-submit"));
    }

    #[test]
    fn test_site_rule_outranks_task_allow() {
        let mut engine = PolicyEngine::for_intent(&intent(TaskType::Interact, "wiki.example"));
        engine.add_site_policies(vec![PolicyRule::new(
            "site-read-only",
            RuleSource::Site,
            RuleScope::for_actions(vec![ActionType::Click, ActionType::Type]),
            RuleEffect::Deny,
            2,
        )]);
        let action = BrowserAction::click("#edit", "Edit the article");
        let ctx = ActionContext::at_url("https://wiki.example/article");
        let decision = engine.allows(&action, &ctx);
        assert!(!decision.allowed);
        assert_eq!(decision.matched_rule.as_deref(), Some("site-read-only"));
    }

    #[test]
    fn test_allows_intent_rejects_sensitive_extract() {
        let engine = PolicyEngine::new();
        let mut sensitive = intent(TaskType::Extract, "docs.example");
        sensitive.sensitive_data.push(SensitiveLabel::ApiKey);
        let decision = engine.allows_intent(&sensitive);
        assert!(!decision.allowed);
        assert!(decision.reason.unwrap().contains("sensitive"));
    }

    #[test]
    fn test_allows_intent_rejects_malicious_domain() {
        let engine = PolicyEngine::new();
        let decision = engine.allows_intent(&intent(TaskType::Extract, "phishing.example"));
        assert!(!decision.allowed);
    }

    #[test]
    fn test_in_alphabet_action_on_allowed_domain_passes() {
        let engine = PolicyEngine::for_intent(&intent(TaskType::Search, "newegg.com"));
        let action = BrowserAction::type_text("#search", "rtx 5090", "Enter search query");
        let ctx = ActionContext::at_url("https://www.newegg.com");
        let decision = engine.allows(&action, &ctx);
        assert!(decision.allowed, "{:?}", decision.reason);
    }
}

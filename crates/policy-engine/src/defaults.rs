//! Compiled-in security tables and rule seeds.
//!
//! These are process-global immutables: compiled once, shared by every
//! session. The deny patterns here are the non-overridable preamble of
//! every evaluation; no later rule can reverse them.

use browser_guard_types::{ActionType, Intent, TaskType};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::{PolicyRule, RuleEffect, RuleScope, RuleSource};

/// Extensions that must never be fetched or clicked through.
pub const EXECUTABLE_EXTENSION_PATTERN: &str =
    r"(?i)\.(exe|msi|dmg|pkg|app|bat|cmd|sh|ps1)(\?.*)?$";

/// Descriptions that commit money.
pub const PAYMENT_PATTERN: &str = r"(?i)\b(pay\s+now|place\s+order|checkout|buy\s+for\s+\$|complete\s+purchase|submit\s+payment|confirm\s+payment)\b";

pub static EXECUTABLE_EXTENSIONS: Lazy<Regex> =
    Lazy::new(|| Regex::new(EXECUTABLE_EXTENSION_PATTERN).expect("static executable pattern"));

pub static PAYMENT_PATTERNS: Lazy<Regex> =
    Lazy::new(|| Regex::new(PAYMENT_PATTERN).expect("static payment pattern"));

/// Host patterns treated as hostile regardless of intent.
pub static MALICIOUS_DOMAIN_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)(^|\.)phishing\.",
        r"(?i)(^|\.)malware\.",
        r"(?i)^(bit\.ly|tinyurl\.com|goo\.gl|t\.co|ow\.ly|is\.gd)$",
    ]
    .into_iter()
    .map(|p| Regex::new(p).expect("static malicious-domain pattern"))
    .collect()
});

/// True when `host` matches any compiled hostile pattern.
pub fn is_malicious_host(host: &str) -> bool {
    MALICIOUS_DOMAIN_PATTERNS.iter().any(|re| re.is_match(host))
}

/// The compiled-in static rule table. Priority 0 unless noted.
pub fn static_rules() -> Vec<PolicyRule> {
    vec![
        PolicyRule::new(
            "no-auto-payment",
            RuleSource::Static,
            RuleScope::for_actions(vec![ActionType::Click, ActionType::Type])
                .with_description_regex(PAYMENT_PATTERN),
            RuleEffect::Deny,
            0,
        ),
        PolicyRule::new(
            "https-only-credentials",
            RuleSource::Static,
            RuleScope::for_task_types(vec![TaskType::Login]),
            RuleEffect::Deny,
            0,
        ),
        PolicyRule::new(
            "no-executable-download",
            RuleSource::Static,
            RuleScope::for_actions(vec![ActionType::Click, ActionType::Navigate])
                .with_target_regex(EXECUTABLE_EXTENSION_PATTERN),
            RuleEffect::Deny,
            0,
        ),
        PolicyRule::new(
            "block-malicious-domains",
            RuleSource::Static,
            RuleScope::any().with_target_regex(r"(?i)(^|//|\.)(phishing|malware)\."),
            RuleEffect::Deny,
            0,
        ),
        PolicyRule::new(
            "confirm-form-submit",
            RuleSource::Static,
            RuleScope::for_actions(vec![ActionType::Click]),
            RuleEffect::Confirm,
            10,
        ),
        PolicyRule::new(
            "confirm-external-nav",
            RuleSource::Static,
            RuleScope::for_actions(vec![ActionType::Navigate, ActionType::Click]),
            RuleEffect::Confirm,
            10,
        ),
    ]
}

/// Rules derived from a validated intent.
pub fn task_rules(intent: &Intent) -> Vec<PolicyRule> {
    let domains: Vec<String> = intent.allowed_domains.iter().cloned().collect();
    let actions: Vec<ActionType> = intent.allowed_actions.iter().copied().collect();
    let mut rules = vec![
        PolicyRule::new(
            "task-domain-allowlist",
            RuleSource::Task,
            RuleScope::for_domains(domains.clone()),
            RuleEffect::Allow,
            5,
        ),
        PolicyRule::new(
            "task-action-allowlist",
            RuleSource::Task,
            RuleScope::for_actions(actions),
            RuleEffect::Allow,
            5,
        ),
        PolicyRule::new(
            "task-domain-denylist",
            RuleSource::Task,
            RuleScope::any(),
            RuleEffect::Deny,
            100,
        ),
    ];
    if intent.task_type.is_read_only() {
        rules.push(PolicyRule::new(
            "confirm-on-click",
            RuleSource::Task,
            RuleScope::for_actions(vec![ActionType::Click]),
            RuleEffect::Confirm,
            20,
        ));
    }
    if intent.task_type == TaskType::Login {
        rules.push(PolicyRule::new(
            "login-same-domain",
            RuleSource::Task,
            RuleScope::for_domains(domains),
            RuleEffect::Allow,
            5,
        ));
    }
    rules
}

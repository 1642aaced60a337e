//! Intent derivation and validation.
//!
//! The parser turns free text into the typed authorization the rest of
//! the guard enforces. Every field is derived by a small deterministic
//! detector; nothing here consults the network or a model, so the
//! intent exists before any untrusted content can influence it.

use std::collections::BTreeSet;

use browser_guard_types::{
    domains, ActionType, Intent, SensitiveLabel, TaskType, Validation, MAX_TIMEOUT_MS,
};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::errors::GuardError;

const GOAL_MAX_CHARS: usize = 100;

/// Ordered task-type trigger table; first match wins, `extract` is the
/// default.
static TASK_PATTERNS: Lazy<Vec<(TaskType, Regex)>> = Lazy::new(|| {
    [
        (TaskType::Login, r"(?i)\b(log ?in|sign ?in|authenticate)\b"),
        (
            TaskType::Purchase,
            r"(?i)\b(buy|purchase|order|add to cart|shop for)\b",
        ),
        (
            TaskType::Monitor,
            r"(?i)\b(monitor|watch|track|keep an eye on|alert me)\b",
        ),
        (
            TaskType::Search,
            r"(?i)\b(search|find|look up|look for|query)\b",
        ),
        (
            TaskType::Interact,
            r"(?i)\b(click|fill (in|out)?|submit|press|interact)\b",
        ),
    ]
    .into_iter()
    .map(|(task, pattern)| (task, Regex::new(pattern).expect("static task pattern")))
    .collect()
});

static URL_HOSTS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"https?://([A-Za-z0-9][A-Za-z0-9.-]*)").expect("static url pattern"));

static BARE_DOMAINS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b([a-z0-9][a-z0-9-]*(?:\.[a-z0-9-]+)*\.(?:com|org|net|io|co|dev|app|gov|edu))\b")
        .expect("static bare-domain pattern")
});

static SENSITIVE_DETECTORS: Lazy<Vec<(SensitiveLabel, Regex)>> = Lazy::new(|| {
    [
        (SensitiveLabel::Ssn, r"\b\d{3}-\d{2}-\d{4}\b"),
        (
            SensitiveLabel::CreditCard,
            r"\b\d{16}\b|\b(?:\d{4}[ -]){3}\d{4}\b",
        ),
        (
            SensitiveLabel::Email,
            r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}",
        ),
        (SensitiveLabel::Password, r"(?i)\bpassword\b"),
        (SensitiveLabel::ApiKey, r"(?i)\bapi[_ -]?key\b"),
        (SensitiveLabel::Secret, r"(?i)\bsecret\b"),
    ]
    .into_iter()
    .map(|(label, pattern)| (label, Regex::new(pattern).expect("static sensitive detector")))
    .collect()
});

/// Hosts to fall back to when a search request names no site.
const SEARCH_ENGINE_HOSTS: &[&str] = &["google.com", "bing.com", "duckduckgo.com"];

/// Caller-supplied knobs for intent parsing.
#[derive(Debug, Default, Clone)]
pub struct ParseOptions {
    /// Domains to allow in addition to what the text mentions
    pub extra_domains: Vec<String>,

    /// Extra sensitive-data detectors (locale extension point)
    pub extra_sensitive_patterns: Vec<(SensitiveLabel, String)>,

    /// Override the task-type depth default
    pub max_depth: Option<u32>,

    /// Override the task-type timeout default
    pub timeout_ms: Option<u64>,
}

/// Derive a validated intent from a user request.
pub fn parse_intent(text: &str, options: &ParseOptions) -> Result<Intent, GuardError> {
    let task_type = detect_task_type(text);
    let allowed_domains = detect_domains(text, task_type, options);
    let sensitive_data = detect_sensitive(text, options);

    let allowed_actions: BTreeSet<ActionType> =
        task_type.allowed_actions().iter().copied().collect();

    let intent = Intent {
        goal: truncate_goal(text),
        task_type,
        allowed_domains,
        allowed_actions,
        sensitive_data,
        max_depth: options.max_depth.unwrap_or_else(|| task_type.default_max_depth()),
        timeout_ms: options
            .timeout_ms
            .unwrap_or_else(|| task_type.default_timeout_ms()),
        original_request: text.to_string(),
    };

    let validation = validate_intent(&intent);
    if !validation.valid {
        return Err(GuardError::IntentInvalid {
            issues: validation.issues,
        });
    }

    debug!(
        task = %intent.task_type,
        domains = intent.allowed_domains.len(),
        "parsed intent"
    );
    Ok(intent)
}

/// Check the invariants an intent must satisfy before it can authorize
/// anything.
pub fn validate_intent(intent: &Intent) -> Validation {
    let mut issues = Vec::new();

    if intent.task_type == TaskType::Login
        && intent.sensitive_data.contains(&SensitiveLabel::Password)
    {
        issues.push("login request must not contain the password itself".to_string());
    }
    if intent.task_type == TaskType::Purchase
        && intent.sensitive_data.contains(&SensitiveLabel::CreditCard)
    {
        issues.push("purchase request must not contain a card number".to_string());
    }
    if intent.allowed_domains.is_empty() {
        issues.push("no target domains could be derived".to_string());
    }
    for domain in &intent.allowed_domains {
        if domain.len() <= 3 || domain == "*" {
            issues.push(format!("domain '{domain}' is too broad to authorize"));
        }
    }
    if intent.timeout_ms > MAX_TIMEOUT_MS {
        issues.push(format!(
            "timeout {}ms exceeds the {MAX_TIMEOUT_MS}ms ceiling",
            intent.timeout_ms
        ));
    }

    Validation::from_issues(issues)
}

fn detect_task_type(text: &str) -> TaskType {
    for (task, pattern) in TASK_PATTERNS.iter() {
        if pattern.is_match(text) {
            return *task;
        }
    }
    TaskType::Extract
}

fn detect_domains(text: &str, task_type: TaskType, options: &ParseOptions) -> BTreeSet<String> {
    let mut hosts: Vec<String> = Vec::new();

    for capture in URL_HOSTS.captures_iter(text) {
        hosts.push(domains::normalize_host(&capture[1]));
    }
    for capture in BARE_DOMAINS.captures_iter(text) {
        hosts.push(domains::normalize_host(&capture[1]));
    }
    for extra in &options.extra_domains {
        hosts.push(domains::normalize_host(extra));
    }

    if hosts.is_empty() && task_type == TaskType::Search {
        hosts.extend(SEARCH_ENGINE_HOSTS.iter().map(|h| h.to_string()));
    }

    let mut set = BTreeSet::new();
    for host in hosts {
        for companion in domains::companion_hosts(&host) {
            insert_with_www(&mut set, companion);
        }
        insert_with_www(&mut set, &host);
    }
    set
}

fn insert_with_www(set: &mut BTreeSet<String>, host: &str) {
    if host.is_empty() {
        return;
    }
    if !host.starts_with("www.") {
        set.insert(format!("www.{host}"));
    }
    set.insert(host.to_string());
}

fn detect_sensitive(text: &str, options: &ParseOptions) -> Vec<SensitiveLabel> {
    let mut labels = Vec::new();
    for (label, pattern) in SENSITIVE_DETECTORS.iter() {
        if pattern.is_match(text) && !labels.contains(label) {
            labels.push(*label);
        }
    }
    for (label, pattern) in &options.extra_sensitive_patterns {
        if let Ok(re) = Regex::new(pattern) {
            if re.is_match(text) && !labels.contains(label) {
                labels.push(*label);
            }
        }
    }
    labels
}

fn truncate_goal(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= GOAL_MAX_CHARS {
        return trimmed.to_string();
    }
    let cut: String = trimmed.chars().take(GOAL_MAX_CHARS).collect();
    format!("{cut}…")
}

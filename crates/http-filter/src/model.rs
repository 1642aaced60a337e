//! Filter data models

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An outbound HTTP request as seen at the tool surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpRequest {
    /// Absolute request URL
    pub url: String,

    /// HTTP method, `GET` when omitted on the wire
    #[serde(default = "default_method")]
    pub method: String,

    /// Request headers
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,

    /// Raw request body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,

    /// Browser resource type (`xhr`, `document`, `image`, …) when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
}

fn default_method() -> String {
    "GET".to_string()
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: default_method(),
            headers: BTreeMap::new(),
            body: None,
            resource_type: None,
        }
    }

    pub fn post(url: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: "POST".to_string(),
            headers: BTreeMap::new(),
            body: Some(body.into()),
            resource_type: None,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

/// Maps concrete requests to a named semantic operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SitemapEntry {
    /// Coarse grouping (`content`, `account`, `payment`, …)
    pub category: String,

    /// The named operation rules fire on (e.g. "Create issue")
    pub semantic_action: String,

    /// URL pattern with `{param}` and `*` placeholders
    pub url_pattern: String,

    /// HTTP method, compared case-insensitively
    pub method: String,

    /// Subtree that must be contained in the request body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,

    /// Full regex override for the URL match
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regex: Option<String>,

    /// Restrict to these browser resource types
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_types: Option<Vec<String>>,

    /// Ascending match precedence
    #[serde(default)]
    pub priority: u32,
}

/// Effect of a site rule or policy default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterEffect {
    /// Permit the request as-is
    Allow,

    /// Refuse the request
    Deny,

    /// Permit, but strip cookies and authorization headers
    AllowPublic,
}

/// A rule binding a semantic action to an effect.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteRule {
    /// Semantic action the rule governs
    pub semantic_action: String,

    /// What to do when it fires
    pub effect: FilterEffect,

    /// Optional explanation surfaced in decisions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// An explicit always-permitted request prefix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllowedRequest {
    /// URL prefix
    pub url: String,

    /// Method restriction; any method when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
}

/// HTTP-level policy for one site.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SitePolicy {
    /// Unique policy name, also the sitemap key
    pub name: String,

    /// Human description
    #[serde(default)]
    pub description: String,

    /// Verdict when nothing more specific matches
    pub default: FilterEffect,

    /// Hosts this policy governs (exact or subdomain)
    pub domains: Vec<String>,

    /// Cross-origin hosts the site legitimately talks to
    #[serde(default)]
    pub allowed_domains: Vec<String>,

    /// Always-permitted request prefixes
    #[serde(default)]
    pub allowed_requests: Vec<AllowedRequest>,

    /// Semantic-action rules
    #[serde(default)]
    pub rules: Vec<SiteRule>,
}

impl SitePolicy {
    /// Whether this policy governs `host`.
    pub fn governs(&self, host: &str) -> bool {
        browser_guard_types::domains::any_domain_matches(host, self.domains.iter())
    }

    /// Whether the policy declares `host` as a legitimate cross-origin
    /// destination (subdomain matching, same as intent domains).
    pub fn admits_cross_origin(&self, host: &str) -> bool {
        browser_guard_types::domains::any_domain_matches(host, self.allowed_domains.iter())
    }

    /// Length of the longest governing domain, used to rank candidate
    /// policies so the most specific host wins.
    pub fn match_specificity(&self, host: &str) -> Option<usize> {
        self.domains
            .iter()
            .filter(|d| browser_guard_types::domains::domain_matches(host, d))
            .map(|d| d.len())
            .max()
    }
}

/// Verdict for one request. Returned, never thrown.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterDecision {
    /// Whether the request may proceed
    pub allowed: bool,

    /// Human-readable explanation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Semantic action or rule that decided, when one matched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched: Option<String>,

    /// Credentials must be stripped before sending
    #[serde(default)]
    pub strip_cookies: bool,
}

impl FilterDecision {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
            matched: None,
            strip_cookies: false,
        }
    }

    pub fn allow_public(matched: Option<String>) -> Self {
        Self {
            allowed: true,
            reason: None,
            matched,
            strip_cookies: true,
        }
    }

    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
            matched: None,
            strip_cookies: false,
        }
    }

    pub fn with_matched(mut self, matched: impl Into<String>) -> Self {
        self.matched = Some(matched.into());
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Expand an effect into a decision.
    pub fn from_effect(effect: FilterEffect, matched: Option<String>) -> Self {
        match effect {
            FilterEffect::Allow => {
                let mut decision = Self::allow();
                decision.matched = matched;
                decision
            }
            FilterEffect::AllowPublic => Self::allow_public(matched),
            FilterEffect::Deny => {
                let mut decision = Self::deny("denied by site policy");
                decision.matched = matched;
                decision
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_default_method() {
        let request: HttpRequest =
            serde_json::from_str(r#"{"url": "https://a.example/x"}"#).unwrap();
        assert_eq!(request.method, "GET");
    }

    #[test]
    fn test_policy_governs_subdomains() {
        let policy = SitePolicy {
            name: "github".to_string(),
            description: String::new(),
            default: FilterEffect::Allow,
            domains: vec!["github.com".to_string()],
            allowed_domains: vec!["githubusercontent.com".to_string()],
            allowed_requests: Vec::new(),
            rules: Vec::new(),
        };
        assert!(policy.governs("api.github.com"));
        assert!(!policy.governs("github.com.attacker.com"));
        assert!(policy.admits_cross_origin("raw.githubusercontent.com"));
    }

    #[test]
    fn test_effect_expansion() {
        let public = FilterDecision::from_effect(FilterEffect::AllowPublic, None);
        assert!(public.allowed);
        assert!(public.strip_cookies);
        let deny = FilterDecision::from_effect(FilterEffect::Deny, Some("Create item".into()));
        assert!(!deny.allowed);
        assert_eq!(deny.matched.as_deref(), Some("Create item"));
    }
}

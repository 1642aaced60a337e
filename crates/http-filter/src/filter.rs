//! Layered request filtering.

use browser_guard_types::{domains, Intent, TaskType};
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::errors::FilterError;
use crate::model::{
    FilterDecision, FilterEffect, HttpRequest, SitePolicy, SiteRule, SitemapEntry,
};
use crate::pattern::{body_contains, parse_body, url_pattern_to_regex};

/// Per-session HTTP request filter.
///
/// Evaluation layers, short-circuiting on the first deny:
/// predicted allowlist → policy lookup by longest host match → sitemap
/// matching → semantic-action rule resolution → explicit allowed
/// requests → policy default.
#[derive(Debug, Default)]
pub struct RequestFilter {
    policies: Vec<SitePolicy>,
    sitemaps: HashMap<String, Vec<SitemapEntry>>,
    predicted_allowlist: Vec<String>,
    allowlist_active: bool,
}

impl RequestFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a site policy.
    pub fn load_policy(&mut self, policy: SitePolicy) {
        debug!(policy = %policy.name, domains = ?policy.domains, "loaded site policy");
        self.policies.retain(|p| p.name != policy.name);
        self.policies.push(policy);
    }

    /// Attach a sitemap to an installed policy, sorted by ascending
    /// priority.
    pub fn load_sitemap(
        &mut self,
        policy_name: &str,
        mut entries: Vec<SitemapEntry>,
    ) -> Result<(), FilterError> {
        if !self.policies.iter().any(|p| p.name == policy_name) {
            return Err(FilterError::UnknownPolicy(policy_name.to_string()));
        }
        entries.sort_by_key(|e| e.priority);
        self.sitemaps.insert(policy_name.to_string(), entries);
        Ok(())
    }

    /// Append semantic-action rules to an installed policy.
    pub fn load_rules(
        &mut self,
        policy_name: &str,
        rules: Vec<SiteRule>,
    ) -> Result<(), FilterError> {
        let policy = self
            .policies
            .iter_mut()
            .find(|p| p.name == policy_name)
            .ok_or_else(|| FilterError::UnknownPolicy(policy_name.to_string()))?;
        policy.rules.extend(rules);
        Ok(())
    }

    /// Install a site policy from its JSON document.
    pub fn load_policy_json(&mut self, document: &str) -> Result<(), FilterError> {
        let policy: SitePolicy = serde_json::from_str(document)?;
        self.load_policy(policy);
        Ok(())
    }

    /// Attach a sitemap from its JSON document.
    pub fn load_sitemap_json(
        &mut self,
        policy_name: &str,
        document: &str,
    ) -> Result<(), FilterError> {
        let entries: Vec<SitemapEntry> = serde_json::from_str(document)?;
        self.load_sitemap(policy_name, entries)
    }

    /// Install the predicted allowlist and toggle its enforcement.
    pub fn set_predicted_allowlist(&mut self, allowed_domains: Vec<String>, active: bool) {
        self.predicted_allowlist = allowed_domains
            .into_iter()
            .map(|d| domains::normalize_host(&d))
            .collect();
        self.allowlist_active = active;
    }

    /// Expand intent domains with well-known companion hosts.
    pub fn predict_allowlist_from_intent(intent: &Intent) -> Vec<String> {
        let mut allowlist: Vec<String> = Vec::new();
        for domain in &intent.allowed_domains {
            let normalized = domains::normalize_host(domain);
            if !allowlist.contains(&normalized) {
                allowlist.push(normalized.clone());
            }
            for companion in domains::companion_hosts(&normalized) {
                let companion = companion.to_string();
                if !allowlist.contains(&companion) {
                    allowlist.push(companion);
                }
            }
        }
        allowlist
    }

    /// Build a filter for a validated intent: active predicted allowlist
    /// plus a default policy per allowed domain. Extract tasks default to
    /// `allow_public` so credentials never ride along on reads.
    pub fn from_intent(intent: &Intent) -> Self {
        let mut filter = Self::new();
        let allowlist = Self::predict_allowlist_from_intent(intent);
        let default = if intent.task_type == TaskType::Extract {
            FilterEffect::AllowPublic
        } else {
            FilterEffect::Allow
        };
        for domain in &intent.allowed_domains {
            filter.load_policy(SitePolicy {
                name: format!("intent-{domain}"),
                description: format!("derived from {} intent", intent.task_type),
                default,
                domains: vec![domain.clone()],
                allowed_domains: allowlist.clone(),
                allowed_requests: Vec::new(),
                rules: Vec::new(),
            });
        }
        filter.set_predicted_allowlist(allowlist, true);
        filter
    }

    /// Filter one request. `current_domain` is the host of the page the
    /// session is on, used to honor declared cross-origin destinations.
    pub fn filter(&self, request: &HttpRequest, current_domain: Option<&str>) -> FilterDecision {
        let Some(host) = domains::host_of(&request.url) else {
            return FilterDecision::deny(format!(
                "cannot determine destination host of '{}'",
                request.url
            ));
        };

        let current_policy = current_domain.and_then(|d| self.policy_for(d));

        // Layer 1: predicted allowlist.
        if self.allowlist_active {
            let in_allowlist =
                domains::any_domain_matches(&host, self.predicted_allowlist.iter());
            let declared = current_policy
                .map(|p| p.admits_cross_origin(&host))
                .unwrap_or(false);
            if !in_allowlist && !declared {
                warn!(%host, "request outside predicted allowlist");
                return FilterDecision::deny(format!(
                    "domain '{host}' is outside the predicted allowlist"
                ));
            }
        }

        // Layer 2: destination policy by longest host match.
        let Some(policy) = self.policy_for(&host) else {
            if let Some(current) = current_policy {
                if current.admits_cross_origin(&host) {
                    // Declared asset/API hosts inherit the site's
                    // credential posture.
                    let decision = if current.default == FilterEffect::AllowPublic {
                        FilterDecision::allow_public(None)
                    } else {
                        FilterDecision::allow()
                    };
                    return decision.with_reason(format!(
                        "cross-origin destination declared by '{}'",
                        current.name
                    ));
                }
            }
            return FilterDecision::deny(format!("no policy governs domain '{host}'"));
        };

        // Layer 3: sitemap matching.
        if let Some(entry) = self.match_sitemap(policy, request) {
            debug!(action = %entry.semantic_action, "sitemap entry matched");
            // Layer 4: rule resolution for the semantic action.
            if let Some(rule) = policy
                .rules
                .iter()
                .find(|r| r.semantic_action == entry.semantic_action)
            {
                let mut decision = FilterDecision::from_effect(
                    rule.effect,
                    Some(entry.semantic_action.clone()),
                );
                if let Some(reason) = &rule.reason {
                    decision = decision.with_reason(reason.clone());
                }
                return decision;
            }
            return Self::default_decision(policy).with_matched(entry.semantic_action.clone());
        }

        // Layer 5: explicit allowed requests.
        for allowed in &policy.allowed_requests {
            let method_matches = allowed
                .method
                .as_deref()
                .map(|m| m.eq_ignore_ascii_case(&request.method))
                .unwrap_or(true);
            if method_matches && request.url.starts_with(&allowed.url) {
                return FilterDecision::allow().with_matched(allowed.url.clone());
            }
        }

        // Layer 6: policy default.
        Self::default_decision(policy)
    }

    fn default_decision(policy: &SitePolicy) -> FilterDecision {
        match policy.default {
            FilterEffect::Allow => FilterDecision::allow(),
            FilterEffect::AllowPublic => FilterDecision::allow_public(None),
            FilterEffect::Deny => FilterDecision::deny(format!(
                "policy '{}' denies by default",
                policy.name
            )),
        }
    }

    /// Longest-matching governing policy for a host.
    fn policy_for(&self, host: &str) -> Option<&SitePolicy> {
        self.policies
            .iter()
            .filter_map(|p| p.match_specificity(host).map(|len| (len, p)))
            .max_by_key(|(len, _)| *len)
            .map(|(_, p)| p)
    }

    fn match_sitemap<'a>(
        &'a self,
        policy: &SitePolicy,
        request: &HttpRequest,
    ) -> Option<&'a SitemapEntry> {
        let entries = self.sitemaps.get(&policy.name)?;
        entries.iter().find(|entry| self.entry_matches(entry, request))
    }

    fn entry_matches(&self, entry: &SitemapEntry, request: &HttpRequest) -> bool {
        if !entry.method.eq_ignore_ascii_case(&request.method) {
            return false;
        }
        let url_ok = match &entry.regex {
            Some(pattern) => regex::Regex::new(pattern)
                .map(|re| re.is_match(&request.url))
                .unwrap_or(false),
            None => url_pattern_to_regex(&entry.url_pattern)
                .map(|re| re.is_match(&request.url))
                .unwrap_or(false),
        };
        if !url_ok {
            return false;
        }
        if let Some(resource_types) = &entry.resource_types {
            match &request.resource_type {
                Some(kind) if resource_types.iter().any(|t| t.eq_ignore_ascii_case(kind)) => {}
                _ => return false,
            }
        }
        if let Some(pattern) = &entry.body {
            let Some(body) = request.body.as_deref().and_then(parse_body) else {
                return false;
            };
            if !body_contains(pattern, &body) {
                return false;
            }
        }
        true
    }
}

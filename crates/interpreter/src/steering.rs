//! Branch-steering detection.
//!
//! Branch steering is the attack where page content makes a technically
//! valid branch take the session somewhere the intent never authorized:
//! the condition holds, but only because injected content arranged it.
//! The detector cross-checks the domain the session actually landed on
//! against the visited history and the optional `_allowedDomains`
//! marker in the extracted-data bag.

use browser_guard_types::domains;
use tracing::warn;

use crate::adapter::Observation;
use crate::context::ExecContext;

/// Detector over taken branches. Stateless; all inputs come from the
/// observation and context.
#[derive(Debug, Default)]
pub struct SteeringDetector;

impl SteeringDetector {
    pub fn new() -> Self {
        Self
    }

    /// Check the state after a branch was taken. Returns a reason when
    /// the transition looks steered.
    pub fn check(&self, observation: &Observation, ctx: &ExecContext) -> Option<String> {
        let current = domains::host_of(&observation.url)?;

        let crossed = ctx
            .visited_domains
            .iter()
            .rev()
            .nth(1)
            .map(|previous| previous != &current)
            .unwrap_or(false);

        if crossed {
            if let Some(marker) = ctx.allowed_domains_marker() {
                if !domains::any_domain_matches(&current, marker.iter()) {
                    warn!(%current, "steering detected: domain outside plan marker");
                    return Some(format!(
                        "branch steered execution onto '{current}', outside the plan's allowed domains"
                    ));
                }
            }
        }

        None
    }

    /// Extension point: compare a form's action URL against the page
    /// origin. Not yet wired to any signal source.
    pub fn check_form_action(&self, _form_action: &str, _page_url: &str) -> Option<String> {
        None
    }

    /// Extension point: perceptual duplication of a known login page.
    /// Not yet wired to any signal source.
    pub fn check_visual_duplication(&self, _screenshot: &[u8]) -> Option<String> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_same_domain_is_safe() {
        let detector = SteeringDetector::new();
        let mut ctx = ExecContext::new();
        ctx.observe_url("https://a.example/page1");
        ctx.observe_url("https://a.example/page2");
        ctx.data
            .insert("_allowedDomains".to_string(), json!(["a.example"]));
        let obs = Observation::at("https://a.example/page2", "Page");
        assert!(detector.check(&obs, &ctx).is_none());
    }

    #[test]
    fn test_cross_domain_outside_marker_flagged() {
        let detector = SteeringDetector::new();
        let mut ctx = ExecContext::new();
        ctx.observe_url("https://a.example/start");
        ctx.observe_url("https://evil.example/landing");
        ctx.data
            .insert("_allowedDomains".to_string(), json!(["a.example"]));
        let obs = Observation::at("https://evil.example/landing", "Landing");
        let reason = detector.check(&obs, &ctx).unwrap();
        assert!(reason.contains("evil.example"));
    }

    #[test]
    fn test_cross_domain_without_marker_passes() {
        // The marker is an opt-in plan signal; without it the hard domain
        // policy is the only gate.
        let detector = SteeringDetector::new();
        let mut ctx = ExecContext::new();
        ctx.observe_url("https://a.example/start");
        ctx.observe_url("https://b.example/next");
        let obs = Observation::at("https://b.example/next", "Next");
        assert!(detector.check(&obs, &ctx).is_none());
    }

    #[test]
    fn test_marker_subdomains_allowed() {
        let detector = SteeringDetector::new();
        let mut ctx = ExecContext::new();
        ctx.observe_url("https://a.example/start");
        ctx.observe_url("https://api.a.example/data");
        ctx.data
            .insert("_allowedDomains".to_string(), json!(["a.example"]));
        let obs = Observation::at("https://api.a.example/data", "Data");
        assert!(detector.check(&obs, &ctx).is_none());
    }
}

//! Per-session execution context.

use browser_guard_policy::ActionContext;
use browser_guard_types::domains;
use serde_json::{Map, Value};

/// Mutable state the driver threads through a plan walk.
#[derive(Debug, Default)]
pub struct ExecContext {
    /// URL of the page currently shown
    pub current_url: Option<String>,

    /// Host of `current_url`
    pub current_domain: Option<String>,

    /// Domains visited, in order, without consecutive duplicates
    pub visited_domains: Vec<String>,

    /// Navigation hops consumed
    pub depth: u32,

    /// Data harvested by extract nodes
    pub data: Map<String, Value>,
}

impl ExecContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the observation's location.
    pub fn observe_url(&mut self, url: &str) {
        self.current_url = Some(url.to_string());
        let domain = domains::host_of(url);
        if let Some(domain) = &domain {
            if self.visited_domains.last() != Some(domain) {
                self.visited_domains.push(domain.clone());
            }
        }
        self.current_domain = domain;
    }

    /// The policy-facing view of this context.
    pub fn as_action_context(&self) -> ActionContext {
        ActionContext {
            current_url: self.current_url.clone(),
            current_domain: self.current_domain.clone(),
            visited_domains: self.visited_domains.clone(),
            depth: self.depth,
        }
    }

    /// The `_allowedDomains` steering marker, when a plan wrote one into
    /// the data bag. The core itself never writes this key.
    pub fn allowed_domains_marker(&self) -> Option<Vec<String>> {
        let value = self.data.get("_allowedDomains")?;
        let list = value.as_array()?;
        Some(
            list.iter()
                .filter_map(Value::as_str)
                .map(|s| s.to_string())
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_observe_url_tracks_domains_without_duplicates() {
        let mut ctx = ExecContext::new();
        ctx.observe_url("https://a.example/page1");
        ctx.observe_url("https://a.example/page2");
        ctx.observe_url("https://b.example/");
        assert_eq!(ctx.visited_domains, vec!["a.example", "b.example"]);
        assert_eq!(ctx.current_domain.as_deref(), Some("b.example"));
    }

    #[test]
    fn test_allowed_domains_marker() {
        let mut ctx = ExecContext::new();
        assert!(ctx.allowed_domains_marker().is_none());
        ctx.data
            .insert("_allowedDomains".to_string(), json!(["a.example"]));
        assert_eq!(
            ctx.allowed_domains_marker(),
            Some(vec!["a.example".to_string()])
        );
    }
}

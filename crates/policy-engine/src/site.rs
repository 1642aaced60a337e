//! Site-authored policy ingress.
//!
//! Pages opt into restrictions through a meta tag:
//! `<meta name="ai-agent-policy" content="directive, directive, …">`.
//! Directive alphabet: `no-form-submit`, `read-only`, `no-ai-agents`.

use browser_guard_types::ActionType;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::errors::PolicyError;
use crate::model::{PolicyRule, RuleEffect, RuleScope, RuleSource};

static META_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?is)<meta\s+[^>]*name\s*=\s*["']ai-agent-policy["'][^>]*content\s*=\s*(?:"([^"]*)"|'([^']*)')"#,
    )
    .expect("static meta-tag pattern")
});

/// Parse every `ai-agent-policy` meta tag in `html` into policy rules.
///
/// Returns an empty list when no tag is present; unknown directives are
/// a parse error so a typo never silently weakens the policy.
pub fn parse_site_policies(html: &str) -> Result<Vec<PolicyRule>, PolicyError> {
    let mut rules = Vec::new();
    for capture in META_TAG.captures_iter(html) {
        let content = capture
            .get(1)
            .or_else(|| capture.get(2))
            .map(|m| m.as_str())
            .unwrap_or("");
        for directive in content.split(',') {
            let directive = directive.trim().to_ascii_lowercase();
            if directive.is_empty() {
                continue;
            }
            rules.extend(rules_for_directive(&directive)?);
        }
    }
    debug!(count = rules.len(), "parsed site policy directives");
    Ok(rules)
}

fn rules_for_directive(directive: &str) -> Result<Vec<PolicyRule>, PolicyError> {
    match directive {
        "no-form-submit" => Ok(vec![PolicyRule::new(
            "site-no-form-submit",
            RuleSource::Site,
            RuleScope::for_actions(vec![ActionType::Click]),
            RuleEffect::Deny,
            2,
        )]),
        "read-only" => Ok(vec![PolicyRule::new(
            "site-read-only",
            RuleSource::Site,
            RuleScope::for_actions(vec![ActionType::Click, ActionType::Type]),
            RuleEffect::Deny,
            2,
        )]),
        "no-ai-agents" => Ok(vec![PolicyRule::new(
            "site-no-ai-agents",
            RuleSource::Site,
            RuleScope::any(),
            RuleEffect::Deny,
            1,
        )]),
        other => Err(PolicyError::UnknownDirective(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_double_quoted_tag() {
        let html = r#"<html><head><meta name="ai-agent-policy" content="no-form-submit"></head></html>"#;
        let rules = parse_site_policies(html).unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].id, "site-no-form-submit");
        assert_eq!(rules[0].source, RuleSource::Site);
    }

    #[test]
    fn test_single_quoted_tag() {
        let html = "<meta name='ai-agent-policy' content='read-only'>";
        let rules = parse_site_policies(html).unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].id, "site-read-only");
    }

    #[test]
    fn test_comma_separated_directives() {
        let html = r#"<meta name="ai-agent-policy" content="no-form-submit, read-only">"#;
        let rules = parse_site_policies(html).unwrap();
        assert_eq!(rules.len(), 2);
    }

    #[test]
    fn test_no_ai_agents_has_top_priority() {
        let html = r#"<meta name="ai-agent-policy" content="no-ai-agents">"#;
        let rules = parse_site_policies(html).unwrap();
        assert_eq!(rules[0].priority, 1);
        assert!(rules[0].scope.actions.is_none());
    }

    #[test]
    fn test_unknown_directive_is_error() {
        let html = r#"<meta name="ai-agent-policy" content="allow-everything">"#;
        assert_eq!(
            parse_site_policies(html).unwrap_err(),
            PolicyError::UnknownDirective("allow-everything".to_string())
        );
    }

    #[test]
    fn test_page_without_tag_yields_no_rules() {
        assert!(parse_site_policies("<html><body>hi</body></html>")
            .unwrap()
            .is_empty());
    }
}

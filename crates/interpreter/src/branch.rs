//! Branch condition evaluation and selection.

use browser_guard_plan_graph::{ConditionType, PlanEdge};
use regex::RegexBuilder;
use tracing::debug;

use crate::adapter::Observation;
use crate::selector::any_match;

/// Evaluate one condition against an observation.
pub fn condition_holds(kind: ConditionType, value: Option<&str>, observation: &Observation) -> bool {
    match kind {
        ConditionType::Default => true,
        ConditionType::ElementPresent => value
            .map(|selector| any_match(selector, &observation.elements))
            .unwrap_or(false),
        ConditionType::ElementAbsent => value
            .map(|selector| !any_match(selector, &observation.elements))
            .unwrap_or(false),
        ConditionType::UrlMatch => value
            .and_then(|pattern| regex::Regex::new(pattern).ok())
            .map(|re| re.is_match(&observation.url))
            .unwrap_or(false),
        ConditionType::ContentMatch => {
            let Some(pattern) = value else { return false };
            let Ok(re) = RegexBuilder::new(pattern).case_insensitive(true).build() else {
                return false;
            };
            observation
                .visible_text
                .as_deref()
                .map(|text| re.is_match(text))
                .unwrap_or(false)
        }
    }
}

/// Pick the first outgoing edge whose condition holds. `edges` must
/// already be sorted by ascending priority (see `PlanGraph::edges_from`).
pub fn select_branch<'a>(
    edges: &[&'a PlanEdge],
    observation: &Observation,
) -> Option<&'a PlanEdge> {
    for edge in edges {
        if condition_holds(
            edge.condition.kind,
            edge.condition.value.as_deref(),
            observation,
        ) {
            debug!(to = %edge.to, kind = ?edge.condition.kind, "branch selected");
            return Some(edge);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use browser_guard_plan_graph::EdgeCondition;
    use browser_guard_ref_store::PageElement;

    fn observation() -> Observation {
        Observation::at("https://shop.example/search?q=gpu", "Search results")
            .with_text("Showing 3 results for gpu")
            .with_elements(vec![PageElement::new("a").with_attr("class", "product-link")])
    }

    fn edge(to: &str, condition: EdgeCondition, priority: u32) -> PlanEdge {
        PlanEdge {
            from: "from".to_string(),
            to: to.to_string(),
            condition,
            priority,
        }
    }

    #[test]
    fn test_element_present_and_absent() {
        let obs = observation();
        assert!(condition_holds(
            ConditionType::ElementPresent,
            Some(".product-link"),
            &obs
        ));
        assert!(!condition_holds(
            ConditionType::ElementPresent,
            Some(".cookie-banner"),
            &obs
        ));
        assert!(condition_holds(
            ConditionType::ElementAbsent,
            Some(".cookie-banner"),
            &obs
        ));
    }

    #[test]
    fn test_url_and_content_match() {
        let obs = observation();
        assert!(condition_holds(
            ConditionType::UrlMatch,
            Some(r"shop\.example/search"),
            &obs
        ));
        // Content matching is case-insensitive.
        assert!(condition_holds(
            ConditionType::ContentMatch,
            Some("SHOWING \\d+ RESULTS"),
            &obs
        ));
        assert!(!condition_holds(
            ConditionType::ContentMatch,
            Some("no results"),
            &obs
        ));
    }

    #[test]
    fn test_first_holding_edge_wins() {
        let obs = observation();
        let a = edge(
            "captcha",
            EdgeCondition::content_match("captcha", "captcha wall"),
            1,
        );
        let b = edge(
            "results",
            EdgeCondition::element_present(".product-link", "results listed"),
            50,
        );
        let c = edge("fallback", EdgeCondition::fallback("otherwise"), 100);
        let edges = vec![&a, &b, &c];
        let taken = select_branch(&edges, &obs).unwrap();
        assert_eq!(taken.to, "results");
    }

    #[test]
    fn test_no_edge_holds() {
        let obs = observation();
        let a = edge(
            "captcha",
            EdgeCondition::content_match("captcha", "captcha wall"),
            1,
        );
        let edges = vec![&a];
        assert!(select_branch(&edges, &obs).is_none());
    }
}

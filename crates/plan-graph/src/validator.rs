//! Structural plan validation.
//!
//! Every plan is checked before the interpreter will touch it, whether
//! it came from a template or a language model. The checks are purely
//! structural; policy screening happens separately per action.

use std::collections::HashSet;

use browser_guard_types::Validation;
use tracing::debug;

use crate::model::PlanGraph;

/// Validate the invariants every executable plan must satisfy:
/// the entry exists, every edge endpoint resolves, every non-terminal
/// node has an outgoing edge, at least one terminal exists, every node
/// is reachable from the entry, and terminals declare their result.
pub fn validate_plan(graph: &PlanGraph) -> Validation {
    let mut issues = Vec::new();

    if graph.nodes.is_empty() {
        issues.push("plan has no nodes".to_string());
        return Validation::fail(issues);
    }

    let ids: HashSet<&str> = graph.nodes.iter().map(|n| n.id.as_str()).collect();
    if ids.len() != graph.nodes.len() {
        issues.push("duplicate node ids".to_string());
    }

    if !ids.contains(graph.entry_point.as_str()) {
        issues.push(format!(
            "entry point '{}' is not a node",
            graph.entry_point
        ));
    }

    for edge in &graph.edges {
        if !ids.contains(edge.from.as_str()) {
            issues.push(format!("edge references unknown source '{}'", edge.from));
        }
        if !ids.contains(edge.to.as_str()) {
            issues.push(format!("edge references unknown target '{}'", edge.to));
        }
    }

    for node in &graph.nodes {
        let has_outgoing = graph.edges.iter().any(|e| e.from == node.id);
        if !node.is_terminal && !has_outgoing {
            issues.push(format!(
                "non-terminal node '{}' has no outgoing edges",
                node.id
            ));
        }
        if node.is_terminal && node.terminal_result.is_none() {
            issues.push(format!(
                "terminal node '{}' declares no terminal result",
                node.id
            ));
        }
    }

    if !graph.nodes.iter().any(|n| n.is_terminal) {
        issues.push("plan has no terminal node".to_string());
    }

    // Iterative closure from the entry.
    if ids.contains(graph.entry_point.as_str()) {
        let mut reachable: HashSet<&str> = HashSet::new();
        let mut frontier = vec![graph.entry_point.as_str()];
        while let Some(current) = frontier.pop() {
            if !reachable.insert(current) {
                continue;
            }
            for edge in &graph.edges {
                if edge.from == current && ids.contains(edge.to.as_str()) {
                    frontier.push(edge.to.as_str());
                }
            }
        }
        for node in &graph.nodes {
            if !reachable.contains(node.id.as_str()) {
                issues.push(format!("node '{}' is unreachable from entry", node.id));
            }
        }
    }

    debug!(
        nodes = graph.nodes.len(),
        edges = graph.edges.len(),
        issues = issues.len(),
        "validated plan graph"
    );
    Validation::from_issues(issues)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EdgeCondition, PlanEdge, PlanGraph, PlanNode, TerminalResult};
    use browser_guard_types::BrowserAction;

    fn node(id: &str) -> PlanNode {
        PlanNode::new(id, BrowserAction::navigate("https://a.example", id))
    }

    fn edge(from: &str, to: &str) -> PlanEdge {
        PlanEdge {
            from: from.to_string(),
            to: to.to_string(),
            condition: EdgeCondition::fallback("continue"),
            priority: 100,
        }
    }

    fn valid_graph() -> PlanGraph {
        PlanGraph::new(
            vec![node("a"), node("b").terminal(TerminalResult::Success)],
            vec![edge("a", "b")],
            "a",
        )
    }

    #[test]
    fn test_valid_graph_passes() {
        let validation = validate_plan(&valid_graph());
        assert!(validation.valid, "{:?}", validation.issues);
    }

    #[test]
    fn test_missing_entry_point() {
        let mut graph = valid_graph();
        graph.entry_point = "nope".to_string();
        let validation = validate_plan(&graph);
        assert!(!validation.valid);
        assert!(validation.issues.iter().any(|i| i.contains("entry point")));
    }

    #[test]
    fn test_dangling_edge_target() {
        let mut graph = valid_graph();
        graph.edges.push(edge("a", "ghost"));
        let validation = validate_plan(&graph);
        assert!(!validation.valid);
        assert!(validation.issues.iter().any(|i| i.contains("ghost")));
    }

    #[test]
    fn test_non_terminal_without_outgoing() {
        let mut graph = valid_graph();
        graph.nodes.push(node("stranded"));
        let validation = validate_plan(&graph);
        assert!(!validation.valid);
        assert!(validation
            .issues
            .iter()
            .any(|i| i.contains("no outgoing edges")));
    }

    #[test]
    fn test_no_terminal_node() {
        let mut graph = valid_graph();
        graph.nodes[1].is_terminal = false;
        graph.nodes[1].terminal_result = None;
        graph.edges.push(edge("b", "a"));
        let validation = validate_plan(&graph);
        assert!(!validation.valid);
        assert!(validation.issues.iter().any(|i| i.contains("no terminal")));
    }

    #[test]
    fn test_unreachable_node() {
        let mut graph = valid_graph();
        graph
            .nodes
            .push(node("island").terminal(TerminalResult::Error));
        let validation = validate_plan(&graph);
        assert!(!validation.valid);
        assert!(validation.issues.iter().any(|i| i.contains("unreachable")));
    }

    #[test]
    fn test_terminal_without_result() {
        let mut graph = valid_graph();
        graph.nodes[1].terminal_result = None;
        let validation = validate_plan(&graph);
        assert!(!validation.valid);
        assert!(validation
            .issues
            .iter()
            .any(|i| i.contains("terminal result")));
    }
}

//! Human-readable plan rendering for confirmation UIs.

use std::collections::HashSet;
use std::collections::VecDeque;

use crate::model::{ConditionType, PlanGraph};

/// Render a plan as a numbered BFS walk from the entry. Each step lists
/// its outgoing branches with their condition descriptions; terminals
/// are annotated with their result.
pub fn describe_plan(graph: &PlanGraph) -> String {
    let mut lines = Vec::new();
    if let Some(intent) = &graph.intent {
        lines.push(format!("Plan for: {}", intent.goal));
    }

    let mut seen: HashSet<&str> = HashSet::new();
    let mut queue: VecDeque<&str> = VecDeque::new();
    queue.push_back(graph.entry_point.as_str());
    let mut step = 0usize;

    while let Some(id) = queue.pop_front() {
        if !seen.insert(id) {
            continue;
        }
        let Some(node) = graph.node(id) else { continue };
        step += 1;

        let mut line = format!(
            "{step}. [{}] {} ({})",
            node.id, node.action.description, node.action.action
        );
        if node.is_terminal {
            let result = node
                .terminal_result
                .map(|r| format!("{r:?}").to_lowercase())
                .unwrap_or_else(|| "unspecified".to_string());
            line.push_str(&format!(" [terminal: {result}]"));
        }
        lines.push(line);

        for edge in graph.edges_from(id) {
            let condition = match edge.condition.kind {
                ConditionType::Default => "otherwise".to_string(),
                _ => format!("if {}", edge.condition.description),
            };
            lines.push(format!("   → {condition}: go to [{}]", edge.to));
            if !seen.contains(edge.to.as_str()) {
                queue.push_back(edge.to.as_str());
            }
        }
    }

    lines.join("\n")
}

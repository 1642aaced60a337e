//! Graph data model

use browser_guard_types::{BrowserAction, Intent};
use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Node identifier. Plain strings keep graphs serializable and diffable.
pub type NodeId = String;

/// Branch condition alphabet. Conditions are evaluated against the
/// observation produced by the node's action, never against anything
/// the page asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ConditionType {
    /// An element matching the selector exists
    ElementPresent,

    /// No element matches the selector
    ElementAbsent,

    /// The page URL matches the regex
    UrlMatch,

    /// The visible text matches the regex (case-insensitive)
    ContentMatch,

    /// Always true; the fallback branch
    Default,
}

/// A condition attached to an edge.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EdgeCondition {
    /// Condition kind
    #[serde(rename = "type")]
    pub kind: ConditionType,

    /// Selector or pattern, absent for `default`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    /// Human-readable description for confirmation UIs
    pub description: String,
}

impl EdgeCondition {
    pub fn element_present(selector: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            kind: ConditionType::ElementPresent,
            value: Some(selector.into()),
            description: description.into(),
        }
    }

    pub fn element_absent(selector: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            kind: ConditionType::ElementAbsent,
            value: Some(selector.into()),
            description: description.into(),
        }
    }

    pub fn url_match(pattern: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            kind: ConditionType::UrlMatch,
            value: Some(pattern.into()),
            description: description.into(),
        }
    }

    pub fn content_match(pattern: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            kind: ConditionType::ContentMatch,
            value: Some(pattern.into()),
            description: description.into(),
        }
    }

    pub fn fallback(description: impl Into<String>) -> Self {
        Self {
            kind: ConditionType::Default,
            value: None,
            description: description.into(),
        }
    }
}

/// What a node expects the world to look like after its action ran.
/// A `required` mismatch aborts the session under strict validation.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExpectedOutcome {
    /// Outcome kind, same alphabet as edge conditions
    #[serde(rename = "type")]
    pub kind: ConditionType,

    /// Selector or pattern, absent for `default`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    /// Human-readable description
    pub description: String,

    /// Mismatch is fatal under strict mode
    #[serde(default)]
    pub required: bool,
}

/// A named piece of data an extract node should harvest.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionTarget {
    /// Key the harvested value is stored under
    pub name: String,

    /// Selector the value comes from
    pub selector: String,
}

/// Node-local invariant checked before the node's action executes.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Constraint {
    /// The session must be inside one of these domains
    Domain { allowed: Vec<String> },
}

/// Terminal classification of a finished plan walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum TerminalResult {
    Success,
    Error,
    Abort,
}

/// One step of a plan.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlanNode {
    /// Unique node id
    pub id: NodeId,

    /// The action this node performs
    pub action: BrowserAction,

    /// Post-action expectations
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub expected_outcomes: Vec<ExpectedOutcome>,

    /// Data to harvest when the action is extract
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extraction_targets: Vec<ExtractionTarget>,

    /// Node-local invariants
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constraints: Vec<Constraint>,

    /// Whether the walk ends here
    #[serde(default)]
    pub is_terminal: bool,

    /// How the walk ended, required when terminal
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminal_result: Option<TerminalResult>,
}

impl PlanNode {
    pub fn new(id: impl Into<NodeId>, action: BrowserAction) -> Self {
        Self {
            id: id.into(),
            action,
            expected_outcomes: Vec::new(),
            extraction_targets: Vec::new(),
            constraints: Vec::new(),
            is_terminal: false,
            terminal_result: None,
        }
    }

    pub fn terminal(mut self, result: TerminalResult) -> Self {
        self.is_terminal = true;
        self.terminal_result = Some(result);
        self
    }

    pub fn with_outcome(mut self, outcome: ExpectedOutcome) -> Self {
        self.expected_outcomes.push(outcome);
        self
    }

    pub fn with_target(mut self, target: ExtractionTarget) -> Self {
        self.extraction_targets.push(target);
        self
    }

    /// Whether the node already carries a domain constraint.
    pub fn has_domain_constraint(&self) -> bool {
        self.constraints
            .iter()
            .any(|c| matches!(c, Constraint::Domain { .. }))
    }
}

/// A conditional transition between nodes. Lower priority is evaluated
/// first.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlanEdge {
    pub from: NodeId,
    pub to: NodeId,
    pub condition: EdgeCondition,
    #[serde(default)]
    pub priority: u32,
}

fn new_graph_id() -> String {
    format!("plan_{}", uuid::Uuid::new_v4())
}

/// The complete conditional execution plan for one session.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlanGraph {
    /// Graph identity
    #[serde(default = "new_graph_id")]
    pub id: String,

    /// The intent the plan was generated for; attached by the planner,
    /// never trusted from the wire
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<Intent>,

    /// Plan steps
    pub nodes: Vec<PlanNode>,

    /// Conditional transitions
    pub edges: Vec<PlanEdge>,

    /// Where execution starts
    pub entry_point: NodeId,

    /// Creation time
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl PlanGraph {
    pub fn new(nodes: Vec<PlanNode>, edges: Vec<PlanEdge>, entry_point: impl Into<NodeId>) -> Self {
        Self {
            id: new_graph_id(),
            intent: None,
            nodes,
            edges,
            entry_point: entry_point.into(),
            created_at: Utc::now(),
        }
    }

    /// Node lookup by id.
    pub fn node(&self, id: &str) -> Option<&PlanNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Outgoing edges of a node, sorted ascending by priority with
    /// insertion order as tiebreak.
    pub fn edges_from(&self, id: &str) -> Vec<&PlanEdge> {
        let mut edges: Vec<&PlanEdge> = self.edges.iter().filter(|e| e.from == id).collect();
        edges.sort_by_key(|e| e.priority);
        edges
    }

    /// All terminal nodes.
    pub fn terminals(&self) -> Vec<&PlanNode> {
        self.nodes.iter().filter(|n| n.is_terminal).collect()
    }

    /// Stamp the intent's domain constraint onto every node and attach
    /// the intent. Applied by the planner regardless of what a provider
    /// emitted, so a plan can never widen its own domain boundary.
    pub fn finalize_for_intent(&mut self, intent: &Intent) {
        let allowed: Vec<String> = intent.allowed_domains.iter().cloned().collect();
        for node in &mut self.nodes {
            node.constraints
                .retain(|c| !matches!(c, Constraint::Domain { .. }));
            node.constraints.push(Constraint::Domain {
                allowed: allowed.clone(),
            });
        }
        self.intent = Some(intent.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_node_graph() -> PlanGraph {
        let open = PlanNode::new("open", BrowserAction::navigate("https://a.example", "Open"));
        let done = PlanNode::new(
            "done",
            BrowserAction::extract("body", "Collect page body"),
        )
        .terminal(TerminalResult::Success);
        let edge = PlanEdge {
            from: "open".to_string(),
            to: "done".to_string(),
            condition: EdgeCondition::fallback("continue"),
            priority: 100,
        };
        PlanGraph::new(vec![open, done], vec![edge], "open")
    }

    #[test]
    fn test_edges_sorted_by_priority() {
        let mut graph = two_node_graph();
        graph.edges.insert(
            0,
            PlanEdge {
                from: "open".to_string(),
                to: "done".to_string(),
                condition: EdgeCondition::content_match("captcha", "captcha wall"),
                priority: 1,
            },
        );
        let ordered = graph.edges_from("open");
        assert_eq!(ordered[0].condition.kind, ConditionType::ContentMatch);
        assert_eq!(ordered[1].condition.kind, ConditionType::Default);
    }

    #[test]
    fn test_serde_round_trip_preserves_structure() {
        let graph = two_node_graph();
        let json = serde_json::to_string(&graph).unwrap();
        let parsed: PlanGraph = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.id, graph.id);
        assert_eq!(parsed.entry_point, graph.entry_point);
        assert_eq!(parsed.nodes.len(), graph.nodes.len());
        assert_eq!(parsed.edges.len(), graph.edges.len());
        assert_eq!(parsed.nodes[1].terminal_result, Some(TerminalResult::Success));
    }

    #[test]
    fn test_wire_defaults_fill_missing_fields() {
        let wire = r#"{
            "nodes": [
                {"id": "start", "action": {"type": "navigate", "target": "https://a.example", "description": "open"}},
                {"id": "end", "action": {"type": "extract", "description": "read"}, "isTerminal": true, "terminalResult": "success"}
            ],
            "edges": [
                {"from": "start", "to": "end", "condition": {"type": "default", "description": "go"}}
            ],
            "entryPoint": "start"
        }"#;
        let graph: PlanGraph = serde_json::from_str(wire).unwrap();
        assert!(graph.id.starts_with("plan_"));
        assert!(graph.intent.is_none());
        assert!(graph.nodes[0].expected_outcomes.is_empty());
        assert_eq!(graph.edges[0].priority, 0);
    }

    #[test]
    fn test_finalize_stamps_every_node() {
        use browser_guard_types::TaskType;
        let mut graph = two_node_graph();
        let intent = Intent {
            goal: "g".to_string(),
            task_type: TaskType::Extract,
            allowed_domains: ["a.example".to_string()].into_iter().collect(),
            allowed_actions: TaskType::Extract.allowed_actions().iter().copied().collect(),
            sensitive_data: Vec::new(),
            max_depth: 5,
            timeout_ms: 60_000,
            original_request: "g".to_string(),
        };
        graph.finalize_for_intent(&intent);
        assert!(graph.nodes.iter().all(|n| n.has_domain_constraint()));
        assert!(graph.intent.is_some());
    }
}

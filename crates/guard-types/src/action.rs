//! Browser action alphabet

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed alphabet of primitive browser operations.
///
/// Plans, policy rules, and intents all dispatch on this enum, so an
/// unhandled variant is a compile-time error rather than a silent gap.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum ActionType {
    /// Load a URL
    Navigate,

    /// Click an element
    Click,

    /// Scroll the viewport or an element
    Scroll,

    /// Type text into an element
    Type,

    /// Extract structured data from the page
    Extract,

    /// Capture a screenshot
    Screenshot,

    /// Wait for a fixed duration
    Wait,
}

impl ActionType {
    /// Stable lowercase name used on the wire and in rule scopes.
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::Navigate => "navigate",
            ActionType::Click => "click",
            ActionType::Scroll => "scroll",
            ActionType::Type => "type",
            ActionType::Extract => "extract",
            ActionType::Screenshot => "screenshot",
            ActionType::Wait => "wait",
        }
    }

    /// Parse a lowercase wire name.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "navigate" => Some(ActionType::Navigate),
            "click" => Some(ActionType::Click),
            "scroll" => Some(ActionType::Scroll),
            "type" => Some(ActionType::Type),
            "extract" => Some(ActionType::Extract),
            "screenshot" => Some(ActionType::Screenshot),
            "wait" => Some(ActionType::Wait),
            _ => None,
        }
    }

    /// All variants, in alphabet order.
    pub fn all() -> &'static [ActionType] {
        &[
            ActionType::Navigate,
            ActionType::Click,
            ActionType::Scroll,
            ActionType::Type,
            ActionType::Extract,
            ActionType::Screenshot,
            ActionType::Wait,
        ]
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One concrete action carried by a plan node.
///
/// `target` is a selector or URL depending on the action type; `value`
/// carries typed text, scroll direction, or wait duration.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BrowserAction {
    /// Action kind
    #[serde(rename = "type")]
    pub action: ActionType,

    /// Selector or URL the action operates on
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,

    /// Action payload (text to type, scroll direction, wait ms)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    /// Human-readable description shown in confirmation UIs
    pub description: String,
}

impl BrowserAction {
    /// Create an action with a target.
    pub fn new(action: ActionType, target: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            action,
            target: Some(target.into()),
            value: None,
            description: description.into(),
        }
    }

    /// Navigate to a URL.
    pub fn navigate(url: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(ActionType::Navigate, url, description)
    }

    /// Click a selector.
    pub fn click(selector: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(ActionType::Click, selector, description)
    }

    /// Type text into a selector.
    pub fn type_text(
        selector: impl Into<String>,
        text: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            action: ActionType::Type,
            target: Some(selector.into()),
            value: Some(text.into()),
            description: description.into(),
        }
    }

    /// Extract data using a selector.
    pub fn extract(selector: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(ActionType::Extract, selector, description)
    }

    /// Targetless action (screenshot, wait, scroll with default target).
    pub fn bare(action: ActionType, description: impl Into<String>) -> Self {
        Self {
            action,
            target: None,
            value: None,
            description: description.into(),
        }
    }

    /// Set the payload value.
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_type_round_trip() {
        for action in ActionType::all() {
            assert_eq!(ActionType::parse(action.as_str()), Some(*action));
        }
        assert_eq!(ActionType::parse("drag"), None);
    }

    #[test]
    fn test_action_wire_shape() {
        let action = BrowserAction::navigate("https://example.com", "Open example");
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["type"], "navigate");
        assert_eq!(json["target"], "https://example.com");
        assert!(json.get("value").is_none());
    }
}

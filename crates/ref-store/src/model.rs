//! Snapshot and element models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::errors::RefError;

/// One observed element inside a snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageElement {
    /// Lowercase tag name
    pub tag: String,

    /// ARIA or implicit role
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    /// Accessible label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    /// Visible text content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// Raw attributes
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attrs: BTreeMap<String, String>,

    /// Fingerprint of stable properties, filled in at snapshot creation
    #[serde(default)]
    pub identity_hash: String,
}

impl PageElement {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into().to_ascii_lowercase(),
            role: None,
            label: None,
            text: None,
            attrs: BTreeMap::new(),
            identity_hash: String::new(),
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }

    /// Attribute lookup.
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).map(String::as_str)
    }

    /// Space-separated class list, split into tokens.
    pub fn classes(&self) -> Vec<&str> {
        self.attr("class")
            .map(|c| c.split_whitespace().collect())
            .unwrap_or_default()
    }
}

/// A versioned view of observed elements. Refs are 1-indexed within the
/// snapshot and meaningless outside it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementSnapshot {
    /// Monotonic snapshot version
    pub version: u32,

    /// Creation time
    pub timestamp: DateTime<Utc>,

    /// Page URL at capture time
    pub url: String,

    /// Elements keyed by 1-indexed ref
    pub elements: BTreeMap<u32, PageElement>,
}

impl ElementSnapshot {
    /// Look up an element by ref id.
    pub fn element(&self, reference: u32) -> Option<&PageElement> {
        self.elements.get(&reference)
    }

    /// True when any element carries the given identity hash.
    pub fn contains_identity(&self, identity_hash: &str) -> bool {
        self.elements
            .values()
            .any(|el| el.identity_hash == identity_hash)
    }
}

/// The `version:ref` pair used to address an element safely across
/// snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VersionedRef {
    pub version: u32,
    pub reference: u32,
}

impl VersionedRef {
    pub fn new(version: u32, reference: u32) -> Self {
        Self { version, reference }
    }
}

impl fmt::Display for VersionedRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.version, self.reference)
    }
}

impl FromStr for VersionedRef {
    type Err = RefError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let (version, reference) = value
            .split_once(':')
            .ok_or_else(|| RefError::Malformed(value.to_string()))?;
        let version = version
            .trim()
            .parse::<u32>()
            .map_err(|_| RefError::Malformed(value.to_string()))?;
        let reference = reference
            .trim()
            .parse::<u32>()
            .map_err(|_| RefError::Malformed(value.to_string()))?;
        Ok(Self { version, reference })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_versioned_ref_round_trip() {
        let vref = VersionedRef::new(3, 14);
        assert_eq!(vref.to_string(), "3:14");
        assert_eq!("3:14".parse::<VersionedRef>().unwrap(), vref);
    }

    #[test]
    fn test_versioned_ref_rejects_garbage() {
        assert!(matches!(
            "nope".parse::<VersionedRef>(),
            Err(RefError::Malformed(_))
        ));
        assert!(matches!(
            "1:x".parse::<VersionedRef>(),
            Err(RefError::Malformed(_))
        ));
    }

    #[test]
    fn test_element_classes() {
        let el = PageElement::new("div").with_attr("class", "btn btn-primary");
        assert_eq!(el.classes(), vec!["btn", "btn-primary"]);
    }
}

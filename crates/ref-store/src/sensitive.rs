//! Destructive / sensitive element detection.
//!
//! A fixed English pattern table flags elements whose labels suggest
//! irreversible or financial consequences. Callers can inject additional
//! `(label, regex)` pairs for other locales.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::model::{ElementSnapshot, PageElement};

static SENSITIVE_PATTERNS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    [
        ("delete", r"(?i)\bdelete\b"),
        ("remove", r"(?i)\bremove\b"),
        ("refund", r"(?i)\brefund\b"),
        ("cancel", r"(?i)\bcancel\s+(order|subscription|account)\b"),
        ("pay_now", r"(?i)\bpay\s+now\b"),
        ("purchase", r"(?i)\bpurchase\b"),
        ("submit_payment", r"(?i)\bsubmit\s+payment\b"),
        ("transfer", r"(?i)\btransfer\s+(funds|money)\b"),
        ("send_money", r"(?i)\bsend\s+money\b"),
        ("confirm_destructive", r"(?i)\bconfirm\s+(delete|deletion|removal|payment)\b"),
        ("permanent", r"(?i)\bpermanent(?:ly)?\b"),
        ("irreversible", r"(?i)\birreversible\b"),
        ("close_account", r"(?i)\bclose\s+account\b"),
        ("revoke", r"(?i)\brevoke\b"),
    ]
    .into_iter()
    .map(|(name, pattern)| (name, Regex::new(pattern).expect("static sensitive pattern")))
    .collect()
});

/// A flagged element with the pattern that matched it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitiveHit {
    /// Ref id inside the snapshot
    pub reference: u32,

    /// Pattern name that fired
    pub reason: String,
}

/// Detector over element labels with optional locale extensions.
#[derive(Debug, Default)]
pub struct SensitiveDetector {
    extra: Vec<(String, Regex)>,
}

impl SensitiveDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add caller-supplied `(label, regex)` pairs, checked after the
    /// built-in table.
    pub fn with_patterns(extra: Vec<(String, Regex)>) -> Self {
        Self { extra }
    }

    /// Check one element; returns the name of the first matching pattern.
    pub fn is_sensitive(&self, element: &PageElement) -> Option<String> {
        let haystack = [
            element.label.as_deref().unwrap_or(""),
            element.text.as_deref().unwrap_or(""),
            element.attr("aria-label").unwrap_or(""),
            element.attr("value").unwrap_or(""),
        ]
        .join(" ");
        if haystack.trim().is_empty() {
            return None;
        }
        for (name, pattern) in SENSITIVE_PATTERNS.iter() {
            if pattern.is_match(&haystack) {
                return Some((*name).to_string());
            }
        }
        for (name, pattern) in &self.extra {
            if pattern.is_match(&haystack) {
                return Some(name.clone());
            }
        }
        None
    }

    /// All flagged elements of a snapshot.
    pub fn find_sensitive_elements(&self, snapshot: &ElementSnapshot) -> Vec<SensitiveHit> {
        snapshot
            .elements
            .iter()
            .filter_map(|(reference, element)| {
                self.is_sensitive(element).map(|reason| SensitiveHit {
                    reference: *reference,
                    reason,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pay_now_flagged() {
        let detector = SensitiveDetector::new();
        let element = PageElement::new("button").with_text("Pay Now");
        assert_eq!(detector.is_sensitive(&element), Some("pay_now".to_string()));
    }

    #[test]
    fn test_cancel_requires_object() {
        let detector = SensitiveDetector::new();
        let plain = PageElement::new("button").with_text("Cancel");
        assert_eq!(detector.is_sensitive(&plain), None);
        let order = PageElement::new("button").with_text("Cancel Order");
        assert_eq!(detector.is_sensitive(&order), Some("cancel".to_string()));
    }

    #[test]
    fn test_aria_label_checked() {
        let detector = SensitiveDetector::new();
        let element = PageElement::new("button")
            .with_text("X")
            .with_attr("aria-label", "Permanently delete repository");
        assert!(detector.is_sensitive(&element).is_some());
    }

    #[test]
    fn test_custom_pattern_injection() {
        let detector = SensitiveDetector::with_patterns(vec![(
            "loeschen".to_string(),
            Regex::new(r"(?i)\bendgültig löschen\b").unwrap(),
        )]);
        let element = PageElement::new("button").with_text("Endgültig löschen");
        assert_eq!(detector.is_sensitive(&element), Some("loeschen".to_string()));
    }

    #[test]
    fn test_find_sensitive_elements() {
        let detector = SensitiveDetector::new();
        let mut elements = std::collections::BTreeMap::new();
        elements.insert(1, PageElement::new("a").with_text("Home"));
        elements.insert(2, PageElement::new("button").with_text("Close account"));
        let snapshot = ElementSnapshot {
            version: 1,
            timestamp: chrono::Utc::now(),
            url: "https://bank.example".to_string(),
            elements,
        };
        let hits = detector.find_sensitive_elements(&snapshot);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].reference, 2);
        assert_eq!(hits[0].reason, "close_account");
    }
}

//! The versioned snapshot store.

use chrono::Utc;
use std::collections::BTreeMap;
use tracing::debug;

use crate::errors::RefError;
use crate::identity::identity_hash;
use crate::model::{ElementSnapshot, PageElement, VersionedRef};

/// Snapshots retained for diagnostics before eviction.
pub const DEFAULT_SNAPSHOT_HISTORY: usize = 5;

/// Per-session snapshot registry with a monotonic version counter.
///
/// Only refs minted against the current version validate; everything
/// older is reported stale. History is bounded, evicting the lowest
/// version first.
#[derive(Debug)]
pub struct RefStore {
    version: u32,
    history: BTreeMap<u32, ElementSnapshot>,
    max_snapshots: usize,
}

impl RefStore {
    pub fn new() -> Self {
        Self::with_history(DEFAULT_SNAPSHOT_HISTORY)
    }

    /// Override the retained-history bound (minimum 1).
    pub fn with_history(max_snapshots: usize) -> Self {
        Self {
            version: 0,
            history: BTreeMap::new(),
            max_snapshots: max_snapshots.max(1),
        }
    }

    /// Current (only valid) snapshot version; 0 before the first snapshot.
    pub fn current_version(&self) -> u32 {
        self.version
    }

    /// The snapshot refs currently validate against.
    pub fn current_snapshot(&self) -> Option<&ElementSnapshot> {
        self.history.get(&self.version)
    }

    /// Capture a new snapshot, bumping the version counter and assigning
    /// 1-indexed refs. All previously minted refs become stale.
    pub fn create_snapshot(&mut self, url: impl Into<String>, elements: Vec<PageElement>) -> &ElementSnapshot {
        self.version += 1;
        let mut keyed = BTreeMap::new();
        for (index, mut element) in elements.into_iter().enumerate() {
            element.identity_hash = identity_hash(&element);
            keyed.insert(index as u32 + 1, element);
        }
        let snapshot = ElementSnapshot {
            version: self.version,
            timestamp: Utc::now(),
            url: url.into(),
            elements: keyed,
        };
        debug!(
            version = snapshot.version,
            elements = snapshot.elements.len(),
            url = %snapshot.url,
            "captured element snapshot"
        );
        self.history.insert(self.version, snapshot);
        while self.history.len() > self.max_snapshots {
            self.history.pop_first();
        }
        self.history
            .get(&self.version)
            .expect("snapshot just inserted")
    }

    /// Validate a `version:ref` string and resolve the element it names.
    ///
    /// The only valid version is the current one; anything else is stale
    /// even if the snapshot is still retained for diagnostics.
    pub fn validate_ref(&self, reference: &str) -> Result<&PageElement, RefError> {
        let vref: VersionedRef = reference.parse()?;
        self.resolve(vref)
    }

    /// Resolve an already-parsed versioned ref.
    pub fn resolve(&self, vref: VersionedRef) -> Result<&PageElement, RefError> {
        if self.version == 0 {
            return Err(RefError::NoSnapshot);
        }
        if vref.version != self.version {
            return Err(RefError::Stale {
                requested: vref.version,
                current: self.version,
            });
        }
        let snapshot = self.history.get(&self.version).ok_or(RefError::NoSnapshot)?;
        snapshot.element(vref.reference).ok_or(RefError::UnknownRef {
            version: vref.version,
            reference: vref.reference,
        })
    }

    /// Whether the element an old ref pointed at still exists, by identity
    /// hash, in `current`. Errors when the old snapshot was evicted.
    pub fn has_element_changed(
        &self,
        old_ref: &str,
        current: &ElementSnapshot,
    ) -> Result<bool, RefError> {
        let vref: VersionedRef = old_ref.parse()?;
        let snapshot = self
            .history
            .get(&vref.version)
            .ok_or(RefError::NoSnapshot)?;
        let element = snapshot.element(vref.reference).ok_or(RefError::UnknownRef {
            version: vref.version,
            reference: vref.reference,
        })?;
        Ok(!current.contains_identity(&element.identity_hash))
    }

    /// Compact textual view of a snapshot for LLM consumption:
    /// `ref=V:R role "label" text="…" [attrs]`, truncated with a note.
    pub fn format_for_llm(&self, snapshot: Option<&ElementSnapshot>, max_elements: usize) -> String {
        let Some(snapshot) = snapshot.or_else(|| self.current_snapshot()) else {
            return "(no snapshot)".to_string();
        };
        let mut lines = Vec::new();
        for (reference, element) in snapshot.elements.iter().take(max_elements) {
            let mut line = format!(
                "ref={}:{} {}",
                snapshot.version,
                reference,
                element.role.as_deref().unwrap_or(&element.tag)
            );
            if let Some(label) = &element.label {
                line.push_str(&format!(" \"{label}\""));
            }
            if let Some(text) = &element.text {
                let prefix: String = text.chars().take(60).collect();
                line.push_str(&format!(" text=\"{prefix}\""));
            }
            if !element.attrs.is_empty() {
                let attrs: Vec<String> = element
                    .attrs
                    .iter()
                    .filter(|(k, _)| matches!(k.as_str(), "id" | "name" | "href" | "type"))
                    .map(|(k, v)| format!("{k}={v}"))
                    .collect();
                if !attrs.is_empty() {
                    line.push_str(&format!(" [{}]", attrs.join(" ")));
                }
            }
            lines.push(line);
        }
        let omitted = snapshot.elements.len().saturating_sub(max_elements);
        if omitted > 0 {
            lines.push(format!("… {omitted} more elements omitted"));
        }
        lines.join("\n")
    }
}

impl Default for RefStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cancel_button() -> PageElement {
        PageElement::new("button")
            .with_role("button")
            .with_text("Cancel Order")
            .with_attr("id", "cancel-order")
    }

    #[test]
    fn test_refs_are_one_indexed() {
        let mut store = RefStore::new();
        let snapshot = store.create_snapshot("https://shop.example", vec![cancel_button()]);
        assert_eq!(snapshot.version, 1);
        assert!(snapshot.element(1).is_some());
        assert!(snapshot.element(0).is_none());
    }

    #[test]
    fn test_stale_ref_rejected_after_new_snapshot() {
        let mut store = RefStore::new();
        store.create_snapshot("https://shop.example/order", vec![cancel_button()]);
        assert!(store.validate_ref("1:1").is_ok());

        store.create_snapshot("https://shop.example/order", vec![cancel_button()]);
        let err = store.validate_ref("1:1").unwrap_err();
        assert_eq!(
            err,
            RefError::Stale {
                requested: 1,
                current: 2
            }
        );
        assert!(err.to_string().contains("stale"));
        assert!(store.validate_ref("2:1").is_ok());
    }

    #[test]
    fn test_unknown_ref_in_current_snapshot() {
        let mut store = RefStore::new();
        store.create_snapshot("https://a.example", vec![cancel_button()]);
        assert_eq!(
            store.validate_ref("1:9").unwrap_err(),
            RefError::UnknownRef {
                version: 1,
                reference: 9
            }
        );
    }

    #[test]
    fn test_ref_before_any_snapshot() {
        let store = RefStore::new();
        assert_eq!(store.validate_ref("1:1").unwrap_err(), RefError::NoSnapshot);
    }

    #[test]
    fn test_history_evicts_lowest_version() {
        let mut store = RefStore::with_history(2);
        for _ in 0..3 {
            store.create_snapshot("https://a.example", vec![cancel_button()]);
        }
        assert_eq!(store.current_version(), 3);
        // Snapshot 1 was evicted, so change tracking against it fails.
        let current = store.current_snapshot().unwrap().clone();
        assert_eq!(
            store.has_element_changed("1:1", &current),
            Err(RefError::NoSnapshot)
        );
        assert_eq!(store.has_element_changed("2:1", &current), Ok(false));
    }

    #[test]
    fn test_element_change_detection() {
        let mut store = RefStore::new();
        store.create_snapshot("https://a.example", vec![cancel_button()]);
        let mutated = PageElement::new("button")
            .with_role("button")
            .with_text("Confirm Deletion")
            .with_attr("id", "cancel-order");
        let current = store
            .create_snapshot("https://a.example", vec![mutated])
            .clone();
        assert_eq!(store.has_element_changed("1:1", &current), Ok(true));
    }

    #[test]
    fn test_format_for_llm_truncates() {
        let mut store = RefStore::new();
        let elements = (0..10)
            .map(|i| PageElement::new("a").with_text(format!("link {i}")))
            .collect();
        store.create_snapshot("https://a.example", elements);
        let listing = store.format_for_llm(None, 4);
        assert!(listing.contains("ref=1:1"));
        assert!(listing.contains("6 more elements omitted"));
    }
}

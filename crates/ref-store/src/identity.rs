//! Element identity fingerprints.
//!
//! The hash covers only properties that survive innocuous re-renders:
//! tag, role, aria-label, name, id, and a bounded text prefix. Layout
//! attributes and volatile state are deliberately excluded so snapshots
//! taken at different times compare byte-for-byte.

use crate::model::PageElement;

const TEXT_PREFIX_CHARS: usize = 32;
const FIELD_SEPARATOR: u8 = 0x1f;

/// Deterministic fingerprint of an element's stable properties.
pub fn identity_hash(element: &PageElement) -> String {
    let text_prefix: String = element
        .text
        .as_deref()
        .unwrap_or("")
        .chars()
        .take(TEXT_PREFIX_CHARS)
        .collect();

    let mut hasher = blake3::Hasher::new();
    for field in [
        element.tag.as_str(),
        element.role.as_deref().unwrap_or(""),
        element.attr("aria-label").unwrap_or(""),
        element.attr("name").unwrap_or(""),
        element.attr("id").unwrap_or(""),
        text_prefix.as_str(),
    ] {
        hasher.update(field.as_bytes());
        hasher.update(&[FIELD_SEPARATOR]);
    }
    format!("el_{}", hasher.finalize().to_hex())
}

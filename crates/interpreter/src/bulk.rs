//! Batched sub-protocol for cutting LLM round-trips.
//!
//! A model can emit several element-level actions at once; the
//! interpreter groups them into batches that are safe to run without an
//! intervening observation: no navigation inside a batch, and every ref
//! minted against the same snapshot version.

use browser_guard_ref_store::VersionedRef;
use browser_guard_types::ActionType;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::InterpreterError;

/// Calibrated per-action latency of the sequential protocol.
const SEQUENTIAL_MS_PER_ACTION: u64 = 6_400;
/// Calibrated per-batch latency of the bulk protocol.
const BULK_MS_PER_BATCH: u64 = 10_500;
/// Tokens consumed by one sequential model call.
const TOKENS_PER_SEQUENTIAL_CALL: u64 = 6_800;
/// Tokens consumed by one bulk model call.
const TOKENS_PER_BULK_CALL: u64 = 8_000;

/// One entry of a bulk document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkAction {
    /// Action kind
    #[serde(rename = "type")]
    pub kind: ActionType,

    /// Versioned element ref (`version:ref`)
    #[serde(rename = "ref")]
    pub reference: String,

    /// Text payload for type actions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// Clear the field before typing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub should_clear: Option<bool>,

    /// Values for multi-select actions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<String>>,

    /// Double-click instead of single
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub double_click: Option<bool>,

    /// Right-click instead of left
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right_click: Option<bool>,
}

impl BulkAction {
    /// Parsed versioned ref.
    pub fn versioned_ref(&self) -> Option<VersionedRef> {
        self.reference.parse().ok()
    }
}

/// Result of a batchability check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchCheck {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl BatchCheck {
    fn ok() -> Self {
        Self {
            ok: true,
            reason: None,
        }
    }

    fn fail(reason: impl Into<String>) -> Self {
        Self {
            ok: false,
            reason: Some(reason.into()),
        }
    }
}

/// Whether `actions` may run as one batch: no navigation, all refs
/// syntactically valid and minted against a single snapshot version.
pub fn can_batch(actions: &[BulkAction]) -> BatchCheck {
    if actions.is_empty() {
        return BatchCheck::fail("empty batch");
    }
    let mut version: Option<u32> = None;
    for (index, action) in actions.iter().enumerate() {
        if action.kind == ActionType::Navigate {
            return BatchCheck::fail(format!(
                "action {index} navigates; navigation invalidates every ref in the batch"
            ));
        }
        let Some(vref) = action.versioned_ref() else {
            return BatchCheck::fail(format!(
                "action {index} has malformed ref '{}'",
                action.reference
            ));
        };
        match version {
            None => version = Some(vref.version),
            Some(expected) if expected == vref.version => {}
            Some(expected) => {
                return BatchCheck::fail(format!(
                    "action {index} targets snapshot {} but the batch started on {expected}",
                    vref.version
                ))
            }
        }
    }
    BatchCheck::ok()
}

/// Greedy grouping: extend the current batch until adding the next
/// action would make it unbatchable, cutting in particular at every
/// navigation.
pub fn optimize_batches(actions: &[BulkAction]) -> Vec<Vec<BulkAction>> {
    let mut batches: Vec<Vec<BulkAction>> = Vec::new();
    let mut current: Vec<BulkAction> = Vec::new();

    for action in actions {
        let mut candidate = current.clone();
        candidate.push(action.clone());
        if can_batch(&candidate).ok {
            current = candidate;
        } else {
            if !current.is_empty() {
                batches.push(std::mem::take(&mut current));
            }
            current.push(action.clone());
        }
    }
    if !current.is_empty() {
        batches.push(current);
    }
    batches
}

/// Parse a bulk document: `{"bulkActions": […]}` or `{"actions": […]}`.
/// Every entry must carry a `type` and a syntactically valid versioned
/// `ref`.
pub fn parse_bulk(document: &Value) -> Result<Vec<BulkAction>, InterpreterError> {
    let entries = document
        .get("bulkActions")
        .or_else(|| document.get("actions"))
        .and_then(Value::as_array)
        .ok_or_else(|| {
            InterpreterError::BulkParse(
                "expected a 'bulkActions' or 'actions' array".to_string(),
            )
        })?;

    let mut actions = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        let action: BulkAction = serde_json::from_value(entry.clone()).map_err(|e| {
            InterpreterError::BulkParse(format!("entry {index}: {e}"))
        })?;
        if action.versioned_ref().is_none() {
            return Err(InterpreterError::BulkInvalidRef {
                index,
                reference: action.reference.clone(),
            });
        }
        actions.push(action);
    }
    Ok(actions)
}

/// Advisory savings estimate for a batched run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkGains {
    pub avg_batch_size: f64,
    pub estimated_time_saved_ms: i64,
    pub estimated_tokens_saved: i64,
}

/// Estimate time and token savings of running `n_actions` in
/// `n_batches` instead of one call per action. The constants are
/// calibrated averages; results are advisory only.
pub fn estimate_gains(n_actions: usize, n_batches: usize) -> BulkGains {
    if n_actions == 0 || n_batches == 0 {
        return BulkGains {
            avg_batch_size: 0.0,
            estimated_time_saved_ms: 0,
            estimated_tokens_saved: 0,
        };
    }
    let sequential_ms = (n_actions as u64 * SEQUENTIAL_MS_PER_ACTION) as i64;
    let bulk_ms = (n_batches as u64 * BULK_MS_PER_BATCH) as i64;
    let sequential_tokens = (n_actions as u64 * TOKENS_PER_SEQUENTIAL_CALL) as i64;
    let bulk_tokens = (n_batches as u64 * TOKENS_PER_BULK_CALL) as i64;
    BulkGains {
        avg_batch_size: n_actions as f64 / n_batches as f64,
        estimated_time_saved_ms: sequential_ms - bulk_ms,
        estimated_tokens_saved: sequential_tokens - bulk_tokens,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn click(reference: &str) -> BulkAction {
        BulkAction {
            kind: ActionType::Click,
            reference: reference.to_string(),
            text: None,
            should_clear: None,
            values: None,
            double_click: None,
            right_click: None,
        }
    }

    fn navigate(reference: &str) -> BulkAction {
        BulkAction {
            kind: ActionType::Navigate,
            ..click(reference)
        }
    }

    #[test]
    fn test_same_version_batches() {
        let check = can_batch(&[click("3:1"), click("3:2"), click("3:7")]);
        assert!(check.ok);
    }

    #[test]
    fn test_mixed_versions_rejected() {
        let check = can_batch(&[click("3:1"), click("2:4")]);
        assert!(!check.ok);
        assert!(check.reason.unwrap().contains("snapshot"));
    }

    #[test]
    fn test_navigate_rejected() {
        let check = can_batch(&[click("3:1"), navigate("3:2")]);
        assert!(!check.ok);
    }

    #[test]
    fn test_optimize_cuts_at_navigate() {
        let actions = vec![
            click("1:1"),
            click("1:2"),
            navigate("1:3"),
            click("2:1"),
            click("2:2"),
        ];
        let batches = optimize_batches(&actions);
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0].len(), 2);
        assert_eq!(batches[1].len(), 1);
        assert_eq!(batches[2].len(), 2);
    }

    #[test]
    fn test_parse_bulk_both_shapes() {
        let bulk = json!({"bulkActions": [
            {"type": "click", "ref": "2:1"},
            {"type": "type", "ref": "2:3", "text": "hello", "shouldClear": true}
        ]});
        let actions = parse_bulk(&bulk).unwrap();
        assert_eq!(actions.len(), 2);
        assert_eq!(actions[1].text.as_deref(), Some("hello"));
        assert_eq!(actions[1].should_clear, Some(true));

        let alt = json!({"actions": [{"type": "click", "ref": "1:1", "doubleClick": true}]});
        let actions = parse_bulk(&alt).unwrap();
        assert_eq!(actions[0].double_click, Some(true));
    }

    #[test]
    fn test_parse_bulk_round_trip() {
        let actions = vec![click("2:1"), click("2:2")];
        let document = json!({"bulkActions": actions});
        let parsed = parse_bulk(&document).unwrap();
        assert_eq!(
            serde_json::to_value(&parsed).unwrap(),
            serde_json::to_value(&actions).unwrap()
        );
    }

    #[test]
    fn test_parse_bulk_rejects_bad_ref() {
        let bulk = json!({"bulkActions": [{"type": "click", "ref": "not-a-ref"}]});
        assert!(matches!(
            parse_bulk(&bulk),
            Err(InterpreterError::BulkInvalidRef { index: 0, .. })
        ));
    }

    #[test]
    fn test_estimate_gains() {
        let gains = estimate_gains(10, 2);
        assert!((gains.avg_batch_size - 5.0).abs() < f64::EPSILON);
        assert_eq!(gains.estimated_time_saved_ms, 64_000 - 21_000);
        assert_eq!(gains.estimated_tokens_saved, 68_000 - 16_000);
    }
}

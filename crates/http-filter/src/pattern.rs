//! URL pattern compilation and body containment.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::errors::FilterError;

static PARAM_PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\\\{([A-Za-z_][A-Za-z0-9_]*)\\\}").expect("static placeholder"));

/// Compile a URL pattern with `{param}` and `*` placeholders into an
/// anchored regex.
///
/// Two separate passes: first every regex metacharacter is escaped,
/// then the escaped placeholder forms are rewritten. Collapsing the
/// passes would let pattern text inject regex syntax.
pub fn url_pattern_to_regex(pattern: &str) -> Result<Regex, FilterError> {
    let escaped = regex::escape(pattern);
    let with_params = PARAM_PLACEHOLDER.replace_all(&escaped, "([^/]+)");
    let with_wildcards = with_params.replace(r"\*", ".*");
    Regex::new(&format!("^{with_wildcards}$")).map_err(|e| FilterError::InvalidPattern {
        pattern: pattern.to_string(),
        detail: e.to_string(),
    })
}

/// Recursive subtree containment: every key of `pattern` must be present
/// in `body` with an equal (or recursively contained) value.
pub fn body_contains(pattern: &Value, body: &Value) -> bool {
    match (pattern, body) {
        (Value::Object(pattern_map), Value::Object(body_map)) => {
            pattern_map.iter().all(|(key, expected)| {
                body_map
                    .get(key)
                    .map(|actual| body_contains(expected, actual))
                    .unwrap_or(false)
            })
        }
        _ => pattern == body,
    }
}

/// Parse a request body as JSON first, URL-form-encoded second.
pub fn parse_body(body: &str) -> Option<Value> {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        return Some(value);
    }
    let pairs: Vec<(String, String)> = url::form_urlencoded::parse(body.as_bytes())
        .into_owned()
        .collect();
    if pairs.is_empty() {
        return None;
    }
    let mut map = serde_json::Map::new();
    for (key, value) in pairs {
        map.insert(key, Value::String(value));
    }
    Some(Value::Object(map))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_param_placeholder() {
        let re = url_pattern_to_regex("https://api.example/items/{id}").unwrap();
        assert!(re.is_match("https://api.example/items/42"));
        assert!(!re.is_match("https://api.example/items/42/edit"));
        assert!(!re.is_match("https://api.example/items/"));
    }

    #[test]
    fn test_wildcard() {
        let re = url_pattern_to_regex("https://cdn.example/assets/*").unwrap();
        assert!(re.is_match("https://cdn.example/assets/app/main.js"));
        assert!(!re.is_match("https://cdn.example/other/main.js"));
    }

    #[test]
    fn test_metacharacters_escaped_before_placeholders() {
        // The dot in the host must not match arbitrary characters.
        let re = url_pattern_to_regex("https://api.example/v1/{name}").unwrap();
        assert!(!re.is_match("https://apixexample/v1/thing"));
    }

    #[test]
    fn test_body_containment_nested() {
        let pattern = json!({"action": "create", "item": {"kind": "issue"}});
        let body = json!({"action": "create", "item": {"kind": "issue", "title": "x"}, "extra": 1});
        assert!(body_contains(&pattern, &body));
        let wrong = json!({"action": "create", "item": {"kind": "comment"}});
        assert!(!body_contains(&pattern, &wrong));
    }

    #[test]
    fn test_parse_body_json_then_form() {
        assert_eq!(
            parse_body(r#"{"a": 1}"#),
            Some(json!({"a": 1}))
        );
        assert_eq!(
            parse_body("a=1&b=two"),
            Some(json!({"a": "1", "b": "two"}))
        );
    }
}

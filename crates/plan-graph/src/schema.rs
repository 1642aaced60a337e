//! Wire schema for structured plan output.
//!
//! Providers are handed this JSON schema so their structured-output
//! mode emits exactly the shape `PlanGraph` deserializes: `nodes`,
//! `edges`, and `entryPoint`, with the closed action and condition
//! alphabets.

use schemars::schema_for;
use serde_json::Value;

use crate::model::PlanGraph;

/// The JSON schema describing the plan wire shape.
pub fn plan_wire_schema() -> Value {
    let schema = schema_for!(PlanGraph);
    serde_json::to_value(schema).unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_names_required_keys() {
        let schema = plan_wire_schema();
        let required = schema
            .get("required")
            .and_then(Value::as_array)
            .expect("required keys");
        let required: Vec<&str> = required.iter().filter_map(Value::as_str).collect();
        assert!(required.contains(&"nodes"));
        assert!(required.contains(&"edges"));
        assert!(required.contains(&"entryPoint"));
    }

    #[test]
    fn test_schema_is_serializable() {
        let schema = plan_wire_schema();
        assert!(serde_json::to_string(&schema).unwrap().contains("entryPoint"));
    }
}

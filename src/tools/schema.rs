//! Argument parsing and validation against a tool's JSON parameter schema.
//!
//! Only the subset of JSON Schema the tools declare is checked: `required`,
//! per-property primitive `type`, and `minimum`.

use crate::error::ToolError;
use serde_json::{Map, Value};

/// Parse the raw argument string the model sent and check it against `schema`.
pub fn parse_arguments(raw: &str, schema: &Value) -> Result<Map<String, Value>, ToolError> {
    let args = if raw.trim().is_empty() {
        Map::new()
    } else {
        match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(map)) => map,
            Ok(other) => {
                return Err(ToolError::InvalidArguments(format!(
                    "expected a JSON object, got {}",
                    type_name(&other)
                )))
            }
            Err(e) => return Err(ToolError::InvalidArguments(format!("not valid JSON: {}", e))),
        }
    };

    validate(&args, schema)?;
    Ok(args)
}

fn validate(args: &Map<String, Value>, schema: &Value) -> Result<(), ToolError> {
    if let Some(required) = schema.get("required").and_then(Value::as_array) {
        for key in required.iter().filter_map(Value::as_str) {
            if !args.contains_key(key) {
                return Err(ToolError::InvalidArguments(format!(
                    "missing required argument '{}'",
                    key
                )));
            }
        }
    }

    let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
        return Ok(());
    };

    for (key, value) in args {
        let Some(property) = properties.get(key) else {
            continue;
        };

        if let Some(expected) = property.get("type").and_then(Value::as_str) {
            if !matches_type(value, expected) {
                return Err(ToolError::InvalidArguments(format!(
                    "argument '{}' should be {}, got {}",
                    key,
                    expected,
                    type_name(value)
                )));
            }
        }

        if let (Some(minimum), Some(actual)) = (
            property.get("minimum").and_then(Value::as_f64),
            value.as_f64(),
        ) {
            if actual < minimum {
                return Err(ToolError::InvalidArguments(format!(
                    "argument '{}' must be at least {}",
                    key, minimum
                )));
            }
        }
    }

    Ok(())
}

fn matches_type(value: &Value, expected: &str) -> bool {
    match expected {
        "string" => value.is_string(),
        "integer" => value.is_i64() || value.is_u64(),
        "number" => value.is_number(),
        "boolean" => value.is_boolean(),
        "array" => value.is_array(),
        "object" => value.is_object(),
        "null" => value.is_null(),
        _ => true,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio_test::{assert_err, assert_ok};

    fn schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "count": {"type": "integer", "minimum": 1},
                "label": {"type": "string"}
            },
            "required": ["count"]
        })
    }

    #[test]
    fn test_valid_arguments() {
        let args = assert_ok!(parse_arguments(r#"{"count": 3, "label": "x", "extra": true}"#, &schema()));
        assert_eq!(args["count"], 3);
    }

    #[test]
    fn test_empty_string_is_empty_object() {
        let loose = json!({"type": "object", "properties": {}});
        assert!(assert_ok!(parse_arguments("", &loose)).is_empty());
        assert_err!(parse_arguments("  ", &schema()));
    }

    #[test]
    fn test_rejections() {
        let cases = [
            ("[1]", "expected a JSON object"),
            ("{count: 1}", "not valid JSON"),
            (r#"{"label": "x"}"#, "missing required argument 'count'"),
            (r#"{"count": "3"}"#, "should be integer"),
            (r#"{"count": 2.5}"#, "should be integer"),
            (r#"{"count": 0}"#, "at least 1"),
        ];
        for (raw, expected) in cases {
            let err = assert_err!(parse_arguments(raw, &schema()));
            assert!(
                err.to_string().contains(expected),
                "{} -> {} (wanted {})",
                raw,
                err,
                expected
            );
        }
    }
}

//! Argument coercion for model-generated tool calls.
//!
//! Models routinely serialize numbers and booleans as strings
//! (`"n_results": "10"`). Before dispatch, scalar values are normalized to
//! the type the tool's schema declares. Fields the schema does not mention,
//! and values that do not parse, pass through unchanged.

use serde_json::Value;

/// Coerce `args` toward the declared parameter `schema`.
///
/// Only the top-level properties of an object-shaped schema are considered;
/// non-object inputs are returned as-is.
#[must_use]
pub fn coerce_arguments(schema: &Value, args: Value) -> Value {
    let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
        return args;
    };
    let mut map = match args {
        Value::Object(map) => map,
        other => return other,
    };

    for (key, value) in map.iter_mut() {
        let Some(declared) = properties
            .get(key)
            .and_then(|p| p.get("type"))
            .and_then(Value::as_str)
        else {
            continue;
        };
        if let Some(coerced) = coerce_scalar(value, declared) {
            *value = coerced;
        }
    }

    Value::Object(map)
}

fn coerce_scalar(value: &Value, declared: &str) -> Option<Value> {
    let Value::String(s) = value else {
        return None;
    };
    let s = s.trim();

    match declared {
        "integer" => s.parse::<i64>().ok().map(Value::from),
        "number" => {
            // Prefer the integer representation when the text has no
            // fractional part, so `"3"` stays `3` rather than `3.0`.
            if let Ok(i) = s.parse::<i64>() {
                return Some(Value::from(i));
            }
            s.parse::<f64>().ok().map(Value::from)
        }
        "boolean" => match s {
            "true" | "True" => Some(Value::Bool(true)),
            "false" | "False" => Some(Value::Bool(false)),
            _ => None,
        },
        _ => None,
    }
}

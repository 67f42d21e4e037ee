//! Schema adapter: tool declarations to model function specs.
//!
//! Converts a [`ToolDescriptor`]'s parameter schema into the function-calling
//! shape the Chat Completions API expects. Malformed property entries are
//! dropped silently rather than losing the whole tool: partial schema
//! information is still useful to the model.

use serde_json::{Map, Value, json};

use crate::mcp::types::ToolDescriptor;

/// Build the function spec for one catalog entry.
#[must_use]
pub fn to_function_spec(descriptor: &ToolDescriptor) -> Value {
    let parameters = adapt_parameters(&descriptor.tool.input_schema);

    let mut description = descriptor.tool.description.clone().unwrap_or_default();
    if let Some(hint) = parameter_hint(&parameters) {
        if !description.is_empty() {
            description.push(' ');
        }
        description.push_str(hint);
    }

    json!({
        "type": "function",
        "function": {
            "name": descriptor.namespaced_name,
            "description": description,
            "parameters": parameters,
        }
    })
}

/// Keep only well-formed properties (an object with a string `type`); filter
/// `required` down to the survivors. A schema that is not object-shaped at
/// all becomes an empty parameter object.
fn adapt_parameters(input_schema: &Value) -> Value {
    let Some(declared) = input_schema.get("properties").and_then(Value::as_object) else {
        return json!({ "type": "object", "properties": {} });
    };

    let mut properties = Map::new();
    for (name, prop) in declared {
        let well_formed = prop
            .as_object()
            .is_some_and(|o| o.get("type").is_some_and(Value::is_string));
        if well_formed {
            properties.insert(name.clone(), prop.clone());
        } else {
            tracing::debug!(property = %name, "Dropping malformed parameter schema");
        }
    }

    let required: Vec<Value> = input_schema
        .get("required")
        .and_then(Value::as_array)
        .map(|r| {
            r.iter()
                .filter(|name| {
                    name.as_str()
                        .is_some_and(|n| properties.contains_key(n))
                })
                .cloned()
                .collect()
        })
        .unwrap_or_default();

    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

/// Disambiguating hint for parameter names that models habitually misuse.
fn parameter_hint(parameters: &Value) -> Option<&'static str> {
    let properties = parameters.get("properties")?.as_object()?;
    if properties.contains_key("n_results") {
        Some("Set n_results to the number of photos the user asked for.")
    } else {
        None
    }
}

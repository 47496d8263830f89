//! JSON Schema conversion for Gemini's `responseSchema`
//!
//! Gemini accepts an OpenAPI-flavoured subset of JSON Schema: `type` must be
//! a single string, nullability is a separate flag, and some keywords are
//! rejected outright.

use serde_json::Value;

/// Keywords Gemini rejects
const UNSUPPORTED_KEYWORDS: &[&str] = &["additionalProperties", "minItems"];

/// Keywords whose values are arrays of sub-schemas
const COMPOSITION_KEYWORDS: &[&str] = &["anyOf", "oneOf", "allOf"];

/// Convert a JSON Schema into the subset Gemini accepts
///
/// The input is left untouched; a converted copy is returned.
pub fn to_google_schema(schema: &Value) -> Value {
    let mut converted = schema.clone();
    convert_node(&mut converted);
    converted
}

fn convert_node(node: &mut Value) {
    let Some(obj) = node.as_object_mut() else {
        return;
    };

    let flattened = obj.get("type").and_then(Value::as_array).map(|types| {
        let nullable = types.iter().any(|t| t.as_str() == Some("null"));
        let first = types
            .iter()
            .filter_map(Value::as_str)
            .find(|t| *t != "null")
            .unwrap_or("string")
            .to_string();
        (first, nullable)
    });
    if let Some((ty, nullable)) = flattened {
        obj.insert("type".to_string(), Value::String(ty));
        if nullable {
            obj.insert("nullable".to_string(), Value::Bool(true));
        }
    }

    for keyword in UNSUPPORTED_KEYWORDS {
        obj.remove(*keyword);
    }

    if let Some(Value::Object(properties)) = obj.get_mut("properties") {
        for property in properties.values_mut() {
            convert_node(property);
        }
    }

    match obj.get_mut("items") {
        Some(Value::Array(items)) => items.iter_mut().for_each(convert_node),
        Some(item) => convert_node(item),
        None => {}
    }

    for keyword in COMPOSITION_KEYWORDS {
        if let Some(Value::Array(variants)) = obj.get_mut(*keyword) {
            variants.iter_mut().for_each(convert_node);
        }
    }
}

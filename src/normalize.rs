//! Completion output normalization.
//!
//! Model output is text that should be JSON but often arrives wrapped
//! in Markdown code fences or missing collections. The normalizer
//! strips fences, parses, and coerces the result toward each
//! operation's target shape so clients never see a missing or null
//! collection where an array belongs.

use serde_json::{json, Map, Value};

use crate::error::OpError;

/// Remove Markdown code-fence markers (with optional `json` language
/// tag) and trim. Unfenced input passes through unchanged, so the step
/// is safe to apply before every parse.
pub fn strip_code_fences(raw: &str) -> String {
    raw.replace("```json", "")
        .replace("```", "")
        .trim()
        .to_string()
}

/// Parse completion text into a JSON object after fence stripping.
pub fn parse_object(raw: &str) -> Result<Map<String, Value>, OpError> {
    let cleaned = strip_code_fences(raw);
    let value: Value =
        serde_json::from_str(&cleaned).map_err(|err| OpError::Parse(err.to_string()))?;
    match value {
        Value::Object(map) => Ok(map),
        other => Err(OpError::Parse(format!(
            "expected a JSON object, got {}",
            json_type_name(&other)
        ))),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Force `key` to an array, replacing absent or non-array values with `[]`.
pub fn ensure_array(object: &mut Map<String, Value>, key: &str) {
    if !object.get(key).map(|v| v.is_array()).unwrap_or(false) {
        object.insert(key.to_string(), Value::Array(Vec::new()));
    }
}

pub fn ensure_arrays(object: &mut Map<String, Value>, keys: &[&str]) {
    for key in keys {
        ensure_array(object, key);
    }
}

/// Force `key` to an object, replacing absent or non-object values with `{}`.
pub fn ensure_object(object: &mut Map<String, Value>, key: &str) {
    if !object.get(key).map(|v| v.is_object()).unwrap_or(false) {
        object.insert(key.to_string(), Value::Object(Map::new()));
    }
}

/// Coerce `parent.key` to an array when `parent` exists as an object.
/// An absent parent is left alone.
pub fn ensure_nested_array(object: &mut Map<String, Value>, parent: &str, key: &str) {
    if let Some(Value::Object(inner)) = object.get_mut(parent) {
        ensure_array(inner, key);
    }
}

/// Rebuild `similarUniversities` as `{name, country}` entries. Names
/// must be non-blank strings; entries without one are dropped. A
/// missing or blank country becomes `default_country`.
pub fn normalize_similar_universities(object: &mut Map<String, Value>, default_country: &str) {
    let entries = match object.get("similarUniversities") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| similar_entry(item, default_country))
            .collect(),
        _ => Vec::new(),
    };
    object.insert("similarUniversities".to_string(), Value::Array(entries));
}

fn similar_entry(item: &Value, default_country: &str) -> Option<Value> {
    let name = item.get("name")?.as_str()?.trim();
    if name.is_empty() {
        return None;
    }
    let country = item
        .get("country")
        .and_then(|c| c.as_str())
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
        .unwrap_or(default_country);
    Some(json!({ "name": name, "country": country }))
}

/// Force each profile bucket (`safe`, `moderate`, `ambitious`) to an
/// object holding a `universities` array.
pub fn normalize_profile_buckets(object: &mut Map<String, Value>) {
    for bucket in ["safe", "moderate", "ambitious"] {
        ensure_object(object, bucket);
        if let Some(Value::Object(inner)) = object.get_mut(bucket) {
            ensure_array(inner, "universities");
        }
    }
}

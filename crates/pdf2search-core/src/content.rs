//! Artifact-content sanitization.
//!
//! PostgreSQL JSONB cannot store NUL codepoints inside strings. Sanitization
//! happens at the store boundary so robot handlers never need to know
//! about the backing format.

use serde_json::{Map, Value};

/// Strips NUL bytes from every string leaf (and map key) of a JSON
/// tree. Violating content is repaired, not rejected.
pub fn sanitize_content(value: Value) -> Value {
    match value {
        Value::String(s) => Value::String(strip_nul(s)),
        Value::Array(items) => Value::Array(items.into_iter().map(sanitize_content).collect()),
        Value::Object(map) => {
            let mut cleaned = Map::with_capacity(map.len());
            for (key, val) in map {
                cleaned.insert(strip_nul(key), sanitize_content(val));
            }
            Value::Object(cleaned)
        }
        other => other,
    }
}

fn strip_nul(s: String) -> String {
    if s.contains('\u{0}') {
        s.replace('\u{0}', "")
    } else {
        s
    }
}

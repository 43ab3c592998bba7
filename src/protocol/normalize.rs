//! Response body normalization.
//!
//! Whatever the licensing service sends back, the manager always merges a
//! JSON object into the cached verdict.

use serde_json::{Map, Value};
use tracing::warn;

/// Key under which a non-object body is wrapped.
pub const NORMALIZED_KEY: &str = "normalized_response";

/// Value used when the body cannot even be stringified.
pub const RESCUED: &str = "rescued";

/// Coerce a raw response body into a JSON object. Never panics.
pub fn normalize(body: &[u8]) -> Map<String, Value> {
    match serde_json::from_slice::<Value>(body) {
        Ok(value) => normalize_value(value),
        Err(_) => match std::str::from_utf8(body) {
            Ok(text) => wrap(Value::String(text.to_string())),
            Err(e) => {
                warn!(error = %e, "response body is neither JSON nor UTF-8");
                wrap(Value::String(RESCUED.to_string()))
            }
        },
    }
}

/// Coerce an already-parsed JSON value into an object.
pub fn normalize_value(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        Value::String(text) => wrap(Value::String(text)),
        other => wrap(Value::String(other.to_string())),
    }
}

fn wrap(value: Value) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert(NORMALIZED_KEY.to_string(), value);
    map
}

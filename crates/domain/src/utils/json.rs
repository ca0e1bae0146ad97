//! Defensive JSON extraction for free-text capability output.
//!
//! Generation capabilities are asked for JSON but routinely wrap it in prose
//! or markdown fences. Parsing here never fails: the worst case is an empty
//! mapping, which downstream stages read as "field not known".

use serde_json::{Map, Value};
use tracing::debug;

const PREVIEW_CHARS: usize = 200;

/// Best-effort parse of a JSON object out of `raw`.
///
/// 1. Parse the whole input.
/// 2. Parse the slice from the first `{` to the last `}`.
/// 3. Give up and return an empty map.
///
/// Valid JSON that is not an object (arrays, strings, numbers) falls through
/// to step 2, so `[{"a": 1}]` still yields `{"a": 1}`.
pub fn safe_json_object(raw: &str) -> Map<String, Value> {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(raw) {
        return map;
    }

    if let (Some(start), Some(end)) = (raw.find('{'), raw.rfind('}')) {
        if end > start {
            if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(&raw[start..=end]) {
                return map;
            }
        }
    }

    let preview: String = raw.chars().take(PREVIEW_CHARS).collect();
    debug!(preview = %preview, "no JSON object found in capability output");
    Map::new()
}

/// Read the first non-empty string stored under any of `keys`.
pub fn string_field(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| map.get(*key))
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|value| !value.is_empty())
        .map(str::to_string)
}

//! Tolerant JSON helpers for wire parsing.

use serde_json::{Map, Value, json};

/// Parse one inbound frame into a JSON object. Returns `None` for non-JSON
/// or non-object frames; adapters treat that as "no events".
pub(crate) fn parse_frame(raw: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// Fetch a string field from a frame, defaulting to empty.
pub(crate) fn str_field(frame: &Map<String, Value>, key: &str) -> String {
    frame.get(key).and_then(Value::as_str).unwrap_or_default().to_string()
}

/// Fetch an unsigned integer field from a frame, defaulting to zero.
pub(crate) fn u64_field(frame: &Map<String, Value>, key: &str) -> u64 {
    frame.get(key).and_then(Value::as_u64).unwrap_or_default()
}

/// Parse a JSON string, repairing common truncation when the model stops
/// streaming mid-value: an unterminated string literal and unclosed
/// brackets are closed, and a dangling trailing comma is removed.
///
/// Falls back to `{}` when the input is empty or unrecoverable, since tool
/// arguments are always objects.
pub(crate) fn loads_with_repair(raw: &str) -> Value {
    if raw.trim().is_empty() {
        return json!({});
    }
    if let Ok(value) = serde_json::from_str(raw) {
        return value;
    }

    let mut repaired = raw.trim_end().to_string();
    let mut stack = Vec::new();
    let mut in_string = false;
    let mut escaped = false;
    for ch in repaired.chars() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '{' if !in_string => stack.push('}'),
            '[' if !in_string => stack.push(']'),
            '}' | ']' if !in_string => {
                stack.pop();
            }
            _ => {}
        }
    }

    if escaped {
        repaired.pop();
    }
    if in_string {
        repaired.push('"');
    }
    if repaired.ends_with(',') {
        repaired.pop();
    }
    while let Some(closer) = stack.pop() {
        repaired.push(closer);
    }

    serde_json::from_str(&repaired).unwrap_or_else(|_| json!({}))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_frame_rejects_malformed() {
        assert!(parse_frame("not json").is_none());
        assert!(parse_frame("[1, 2, 3]").is_none());
        assert!(parse_frame("42").is_none());
        assert!(parse_frame(r#"{"type": "x"}"#).is_some());
    }

    #[test]
    fn test_repair_passes_valid_json_through() {
        assert_eq!(loads_with_repair(r#"{"a": 1}"#), json!({"a": 1}));
    }

    #[test]
    fn test_repair_closes_truncated_string() {
        assert_eq!(loads_with_repair(r#"{"a": "x"#), json!({"a": "x"}));
    }

    #[test]
    fn test_repair_closes_nested_brackets() {
        assert_eq!(loads_with_repair(r#"{"a": [1, 2"#), json!({"a": [1, 2]}));
    }

    #[test]
    fn test_repair_drops_trailing_comma() {
        assert_eq!(loads_with_repair(r#"{"a": 1,"#), json!({"a": 1}));
    }

    #[test]
    fn test_repair_empty_input_is_empty_object() {
        assert_eq!(loads_with_repair(""), json!({}));
        assert_eq!(loads_with_repair("   "), json!({}));
    }
}

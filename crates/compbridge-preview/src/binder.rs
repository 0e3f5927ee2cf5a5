//! Input binder: turns the raw JSON input blob into component props.
//!
//! Binding never fails. Invalid input falls back to `{}` and carries a
//! validation message for the session's validation slot.

use serde_json::{Map, Value};
use tracing::debug;

/// Validation message for input that is not valid JSON.
pub const INVALID_JSON: &str = "invalid JSON";

/// Validation message for valid JSON that is not an object.
pub const NOT_AN_OBJECT: &str = "input must be a JSON object";

/// Outcome of resolving raw input text.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// Last successfully parsed value, or `{}`.
    pub parsed: Value,
    /// Validation message for the input field, if any.
    pub error: Option<String>,
}

impl Resolution {
    fn empty(error: Option<String>) -> Self {
        Self {
            parsed: Value::Object(Map::new()),
            error,
        }
    }

    /// Props to inject: the parsed value when it is an object, else `{}`.
    pub fn props(&self) -> Value {
        match &self.parsed {
            Value::Object(_) => self.parsed.clone(),
            _ => Value::Object(Map::new()),
        }
    }

    /// Message for the validation slot, covering non-object input as well
    /// as parse failures.
    pub fn validation(&self) -> Option<String> {
        match (&self.error, &self.parsed) {
            (Some(error), _) => Some(error.clone()),
            (None, Value::Object(_)) => None,
            (None, _) => Some(NOT_AN_OBJECT.to_string()),
        }
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Self::empty(None)
    }
}

/// Resolve raw input text.
pub fn resolve(raw: &str) -> Resolution {
    if raw.trim().is_empty() {
        return Resolution::empty(None);
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(parsed) => Resolution {
            parsed,
            error: None,
        },
        Err(e) => {
            debug!(error = %e, "input is not valid JSON");
            Resolution::empty(Some(INVALID_JSON.to_string()))
        }
    }
}

/// Sample input offered to new users, pretty-printed.
pub fn sample_input() -> String {
    let sample = serde_json::json!({
        "title": "Sample title",
        "description": "This is a sample description",
        "count": 42,
        "isActive": true
    });
    serde_json::to_string_pretty(&sample).unwrap_or_else(|_| "{}".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_blank_input_is_empty_object() {
        for raw in ["", "   ", "\n\t"] {
            let resolution = resolve(raw);
            assert_eq!(resolution.parsed, json!({}));
            assert!(resolution.error.is_none());
        }
    }

    #[test]
    fn test_valid_json_keeps_structure() {
        let resolution = resolve(r#"{"n": 5, "user": {"name": "Ada"}, "tags": ["a"]}"#);
        assert_eq!(
            resolution.parsed,
            json!({"n": 5, "user": {"name": "Ada"}, "tags": ["a"]})
        );
        assert!(resolution.error.is_none());
        assert!(resolution.validation().is_none());
    }

    #[test]
    fn test_invalid_json_falls_back() {
        let resolution = resolve("{\"n\": ");
        assert_eq!(resolution.parsed, json!({}));
        assert_eq!(resolution.error.as_deref(), Some(INVALID_JSON));
        assert_eq!(resolution.validation().as_deref(), Some(INVALID_JSON));
    }

    #[test]
    fn test_non_object_is_parsed_but_injected_as_empty() {
        let resolution = resolve("[1, 2]");
        assert_eq!(resolution.parsed, json!([1, 2]));
        assert!(resolution.error.is_none());
        assert_eq!(resolution.props(), json!({}));
        assert_eq!(resolution.validation().as_deref(), Some(NOT_AN_OBJECT));
    }

    #[test]
    fn test_sample_input_round_trips() {
        let resolution = resolve(&sample_input());
        assert_eq!(resolution.parsed["count"], 42);
        assert_eq!(resolution.parsed["isActive"], true);
    }

    proptest! {
        #[test]
        fn resolve_never_panics_and_always_yields_a_value(raw in ".*") {
            let resolution = resolve(&raw);
            if resolution.error.is_some() {
                prop_assert_eq!(resolution.parsed, json!({}));
            }
        }
    }
}

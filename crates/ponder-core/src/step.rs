//! Normalized reasoning steps and observation formatting

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One unit of visible reasoning inside a turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Step {
    /// Standalone reasoning that precedes the action steps
    Thought { content: String },
    /// One thought/action/observation cycle
    Action {
        /// Backend-assigned number, shown to the user but never used for ordering
        index: u32,
        thought: String,
        action: String,
        /// Display form, already run through [`format_observation`]
        observation: String,
    },
}

impl Step {
    pub fn is_thought(&self) -> bool {
        matches!(self, Step::Thought { .. })
    }
}

/// Produce the display form of a raw observation.
///
/// Observations are often JSON emitted by a tool. An object carrying a
/// `result` key shows just that result; any other object or array is
/// pretty-printed whole. Plain text, and bare scalars that happen to parse
/// as JSON, are returned unchanged.
pub fn format_observation(raw: &str) -> String {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(mut map)) => match map.remove("result") {
            Some(Value::String(text)) => text,
            Some(result) => pretty(&result),
            None => pretty(&Value::Object(map)),
        },
        Ok(array @ Value::Array(_)) => pretty(&array),
        _ => raw.to_string(),
    }
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_key_is_unwrapped() {
        let formatted = format_observation(r#"{"result":{"name":"Musk","worth":400}}"#);
        assert_eq!(formatted, "{\n  \"name\": \"Musk\",\n  \"worth\": 400\n}");
    }

    #[test]
    fn test_string_result_is_shown_bare() {
        assert_eq!(
            format_observation(r#"{"tool":"search","result":"3 hits"}"#),
            "3 hits"
        );
    }

    #[test]
    fn test_object_without_result_is_pretty_printed() {
        assert_eq!(
            format_observation(r#"{"a":1}"#),
            "{\n  \"a\": 1\n}"
        );
    }

    #[test]
    fn test_array_is_pretty_printed() {
        assert_eq!(format_observation("[1,2]"), "[\n  1,\n  2\n]");
    }

    #[test]
    fn test_plain_text_and_scalars_unchanged() {
        assert_eq!(format_observation("nothing found"), "nothing found");
        assert_eq!(format_observation("42"), "42");
        assert_eq!(format_observation("\"quoted\""), "\"quoted\"");
        assert_eq!(format_observation("true"), "true");
        assert_eq!(format_observation(""), "");
        assert_eq!(format_observation("{broken"), "{broken");
    }
}

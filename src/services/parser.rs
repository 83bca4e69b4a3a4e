//! Decoding of free-form AI text into schema-checked values.
//!
//! The generation endpoint is asked for bare JSON but routinely wraps its
//! answer in markdown code fences anyway; those are stripped before
//! structural decoding. A parse failure discards the whole response, there
//! is no partial recovery.

use serde_json::Value;
use tracing::debug;

use crate::error::{PlannerError, Result};
use crate::schemas::ResponseSchema;

/// Remove a leading/trailing markdown code fence, language-tagged or bare.
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();

    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    // Drop the language tag ("json", "JSON", ...) up to the first newline.
    let body = match rest.split_once('\n') {
        Some((_tag, body)) => body,
        None => rest,
    };

    body.strip_suffix("```").unwrap_or(body).trim()
}

/// Parse AI output into a JSON value.
pub fn parse_json(text: &str) -> Result<Value> {
    let cleaned = strip_code_fences(text);
    serde_json::from_str(cleaned).map_err(|err| {
        debug!(target: "trip_planner::parser", raw = text, "response was not valid JSON");
        PlannerError::MalformedResponse(format!("AI returned invalid JSON: {err}"))
    })
}

/// Parse AI output and decode it into `T`, validating the value against
/// `T`'s schema first.
pub fn decode<T: ResponseSchema>(text: &str) -> Result<T> {
    let value = parse_json(text)?;
    T::handle().deserialize(&value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn strips_language_tagged_fences() {
        let text = "```json\n{\"a\": 1}\n```";
        assert_eq!(strip_code_fences(text), "{\"a\": 1}");
    }

    #[test]
    fn strips_bare_fences() {
        let text = "```\n{\"a\": 1}\n```";
        assert_eq!(strip_code_fences(text), "{\"a\": 1}");
    }

    #[test]
    fn leaves_clean_text_untouched() {
        assert_eq!(strip_code_fences("{\"a\": 1}"), "{\"a\": 1}");
    }

    #[test]
    fn parse_is_idempotent_on_clean_json() {
        let value = parse_json("{\"a\": [1, 2], \"b\": \"text\"}").unwrap();
        let reparsed = parse_json(&value.to_string()).unwrap();
        assert_eq!(value, reparsed);
    }

    #[test]
    fn parses_fenced_payload() {
        let value = parse_json("```json\n{\"destinations\": []}\n```").unwrap();
        assert_eq!(value, json!({ "destinations": [] }));
    }

    #[test]
    fn rejects_non_json_with_malformed_response() {
        let err = parse_json("I could not produce a plan, sorry!").unwrap_err();
        assert_eq!(err.error_code(), "MALFORMED_RESPONSE");
    }

    #[test]
    fn rejects_truncated_json() {
        let err = parse_json("```json\n{\"destinations\": [\n```").unwrap_err();
        assert_eq!(err.error_code(), "MALFORMED_RESPONSE");
    }
}

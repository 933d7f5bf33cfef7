//! Helpers for decoding oracle verdict responses.
//!
//! The service is prompted for a bare JSON array of names, but in practice
//! it sometimes wraps the array in markdown code fences or surrounding
//! prose. Parsing is lenient about the wrapping and strict about the
//! payload.

use crate::error::{OracleError, Result};
use regex::Regex;
use std::sync::OnceLock;

fn fence_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)^```[\w-]*\s*(.*?)\s*```$").unwrap_or_else(|e| {
            unreachable!("invalid fence regex: {e}");
        })
    })
}

/// Strip a single enclosing markdown code fence, if present.
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    match fence_regex().captures(trimmed) {
        Some(caps) => caps.get(1).map_or(trimmed, |m| m.as_str()),
        None => trimmed,
    }
}

/// Parse a verdict response as a JSON array of names.
///
/// Accepts the array either bare or fenced; anything else is
/// [`OracleError::Malformed`] so the caller's retry policy can decide what
/// to do with it. An empty array is a valid, final answer.
pub fn parse_name_array(text: &str) -> Result<Vec<String>> {
    let body = strip_code_fences(text);
    if body.is_empty() {
        return Err(OracleError::Empty);
    }

    // Tolerate prose around the array by slicing to the outermost brackets.
    let candidate = match (body.find('['), body.rfind(']')) {
        (Some(start), Some(end)) if start < end => &body[start..=end],
        _ => body,
    };

    serde_json::from_str::<Vec<String>>(candidate)
        .map_err(|e| OracleError::Malformed(format!("expected JSON string array: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_bare_array() {
        let out = parse_name_array(r#"["guides", "reference"]"#).unwrap();
        assert_eq!(out, vec!["guides".to_string(), "reference".to_string()]);
    }

    #[test]
    fn parses_fenced_array() {
        let out = parse_name_array("```json\n[\"guides\"]\n```").unwrap();
        assert_eq!(out, vec!["guides".to_string()]);
    }

    #[test]
    fn parses_array_with_surrounding_prose() {
        let out = parse_name_array("The relevant areas are: [\"api\"] as requested.").unwrap();
        assert_eq!(out, vec!["api".to_string()]);
    }

    #[test]
    fn empty_array_is_a_valid_answer() {
        let out = parse_name_array("[]").unwrap();
        assert_eq!(out, Vec::<String>::new());
    }

    #[test]
    fn prose_without_array_is_malformed() {
        let err = parse_name_array("I could not decide.").unwrap_err();
        assert!(matches!(err, OracleError::Malformed(_)));
    }

    #[test]
    fn blank_response_is_empty() {
        let err = parse_name_array("   ").unwrap_err();
        assert!(matches!(err, OracleError::Empty));
    }

    #[test]
    fn strips_fences_without_language_tag() {
        assert_eq!(strip_code_fences("```\n[\"a\"]\n```"), "[\"a\"]");
        assert_eq!(strip_code_fences("plain"), "plain");
    }
}

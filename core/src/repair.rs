//! Best-effort recovery of a JSON object from loosely formatted model output.
//!
//! Models asked for "JSON only" still wrap answers in markdown fences, sprinkle
//! emphasis markers, drop commas between fields, or get truncated by the token
//! limit. This module is pattern matching against that unreliable source, not a
//! parser: one cleanup pass, one structural-repair pass, one brace-balance
//! pass, then a hard failure. Deeper heuristic repair risks fabricating a
//! structurally-valid-but-wrong document, so none is attempted.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::ParseFailure;
use crate::types::StrategyDocument;

static FENCE_JSON_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)```json\n?").expect("valid json fence regex"));
static FENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```\n?").expect("valid fence regex"));
static MARKDOWN_LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]+)\]\([^)]*\)").expect("valid link regex"));
static STRING_BREAK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("\"[ \\t]*\\n[ \\t]*\"").expect("valid string break regex"));
static BRACE_BREAK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("\\}[ \\t]*\\n[ \\t]*\"").expect("valid brace break regex"));
static BRACKET_BREAK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("\\][ \\t]*\\n[ \\t]*\"").expect("valid bracket break regex"));

/// Strip markdown decoration the model was told not to emit but emits anyway:
/// code fences, `**`/`*` emphasis, and `[label](url)` links (collapsed to the
/// label).
pub fn strip_markdown(raw: &str) -> String {
    let text = FENCE_JSON_RE.replace_all(raw, "");
    let text = FENCE_RE.replace_all(&text, "");
    let text = text.replace("**", "").replace('*', "");
    MARKDOWN_LINK_RE.replace_all(&text, "$1").trim().to_string()
}

/// Repair the common structural breaks: a missing comma between two quoted
/// fields separated only by a line break, and a missing comma after `}` or `]`
/// when the next line opens a new quoted key.
pub fn repair_structure(text: &str) -> String {
    let text = STRING_BREAK_RE.replace_all(text, "\",\n\"");
    let text = BRACE_BREAK_RE.replace_all(&text, "},\n\"");
    BRACKET_BREAK_RE.replace_all(&text, "],\n\"").into_owned()
}

/// Append closing braces for opens the response never closed, the signature
/// of a token-limit truncation. The count is naive (string contents included),
/// which matches the single-pass policy: if the text is stranger than a clean
/// truncation, parsing fails and the caller gets the hard error.
pub fn balance_braces(text: &str) -> String {
    let opens = text.matches('{').count();
    let closes = text.matches('}').count();
    if opens > closes {
        let mut balanced = text.to_string();
        balanced.extend(std::iter::repeat_n('}', opens - closes));
        balanced
    } else {
        text.to_string()
    }
}

/// Full cleanup pipeline. Already-clean valid JSON passes through unchanged.
pub fn clean(raw: &str) -> String {
    balance_braces(&repair_structure(&strip_markdown(raw)))
}

/// Clean the raw model text and parse it as a JSON object.
///
/// Returns the document only if the cleaned text parses and is an object at
/// the top level; anything else is a [`ParseFailure`] carrying bounded
/// excerpts for diagnostics. No partially-parsed value ever escapes.
pub fn parse_document(raw: &str) -> Result<StrategyDocument, ParseFailure> {
    let cleaned = clean(raw);
    match serde_json::from_str::<serde_json::Value>(&cleaned) {
        Ok(serde_json::Value::Object(fields)) => Ok(StrategyDocument::new(fields)),
        Ok(other) => Err(ParseFailure {
            reason: format!("expected a JSON object, got {}", value_kind(&other)),
            raw_excerpt: excerpt(raw),
            cleaned_excerpt: excerpt(&cleaned),
        }),
        Err(err) => Err(ParseFailure {
            reason: err.to_string(),
            raw_excerpt: excerpt(raw),
            cleaned_excerpt: excerpt(&cleaned),
        }),
    }
}

fn value_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

/// First and last ~500 characters, enough to see both the markdown prefix and
/// a truncated tail without logging multi-kilobyte payloads.
fn excerpt(text: &str) -> String {
    const WINDOW: usize = 500;
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= WINDOW * 2 {
        return text.to_string();
    }
    let head: String = chars[..WINDOW].iter().collect();
    let tail: String = chars[chars.len() - WINDOW..].iter().collect();
    format!("{head} [...] {tail}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cleanup_is_a_noop_on_clean_json() {
        let input = r#"{"a":"x",
"b":{"c":2},
"d":[1,2,3]}"#;
        assert_eq!(clean(input), input);
    }

    #[test]
    fn fenced_json_round_trips() {
        let original = serde_json::json!({
            "projectName": "Arbor",
            "vision": { "mission": "map every idea", "horizon": 5 }
        });
        let fenced = format!(
            "```json\n{}\n```",
            serde_json::to_string_pretty(&original).unwrap()
        );
        let doc = parse_document(&fenced).expect("fenced JSON should parse");
        assert_eq!(doc.clone().into_value(), original);
    }

    #[test]
    fn uppercase_fence_marker_is_stripped() {
        let doc = parse_document("```JSON\n{\"a\":1}\n```").expect("should parse");
        assert_eq!(doc.get("a"), Some(&serde_json::json!(1)));
    }

    #[test]
    fn missing_closing_brace_is_repaired() {
        let doc = parse_document(r#"{"a":1,"b":{"c":2}"#).expect("one missing brace is repairable");
        assert_eq!(
            doc.into_value(),
            serde_json::json!({"a": 1, "b": {"c": 2}})
        );
    }

    #[test]
    fn missing_comma_between_string_fields_is_repaired() {
        let doc = parse_document("{\"a\":\"x\"\n\"b\":\"y\"}").expect("newline break is repairable");
        assert_eq!(doc.into_value(), serde_json::json!({"a": "x", "b": "y"}));
    }

    #[test]
    fn missing_comma_after_closing_brace_is_repaired() {
        let doc = parse_document("{\"a\":{\"b\":1}\n\"c\":2}").expect("brace break is repairable");
        assert_eq!(doc.into_value(), serde_json::json!({"a": {"b": 1}, "c": 2}));
    }

    #[test]
    fn missing_comma_after_closing_bracket_is_repaired() {
        let doc = parse_document("{\"a\":[1,2]\n\"c\":2}").expect("bracket break is repairable");
        assert_eq!(doc.into_value(), serde_json::json!({"a": [1, 2], "c": 2}));
    }

    #[test]
    fn markdown_links_collapse_to_their_label() {
        assert_eq!(
            strip_markdown(r#"{"site":"[Notion](https://notion.so)"}"#),
            r#"{"site":"Notion"}"#
        );
    }

    #[test]
    fn emphasis_markers_are_stripped() {
        assert_eq!(
            strip_markdown(r#"{"pitch":"**bold** and *subtle*"}"#),
            r#"{"pitch":"bold and subtle"}"#
        );
    }

    #[test]
    fn truncated_mid_string_fails_hard() {
        let err = parse_document(r#"{"a":"truncated right her"#)
            .expect_err("unterminated string cannot be repaired");
        assert!(err.cleaned_excerpt.ends_with('}'));
        assert!(!err.reason.is_empty());
    }

    #[test]
    fn top_level_array_is_rejected() {
        let err = parse_document(r#"[{"a":1}]"#).expect_err("arrays are not strategy documents");
        assert!(err.reason.contains("array"));
    }

    #[test]
    fn excerpt_bounds_long_text() {
        let long = "x".repeat(5000);
        let e = excerpt(&long);
        assert!(e.len() < 1100);
        assert!(e.contains("[...]"));
    }
}

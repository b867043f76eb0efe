//! Response extraction: turns free-form model output into a validated
//! structure or a displayable text fallback.
//!
//! Models are told to return bare JSON but routinely prepend commentary or
//! wrap the object in markdown fences. Extraction evaluates an ordered list
//! of candidate strategies; the first candidate that parses AND passes the
//! target's shape check wins. Nothing here returns an error.

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

/// Shown instead of an empty reply so callers always have text to render.
pub const EMPTY_REPLY_PLACEHOLDER: &str = "No suggestion returned";

/// A target shape for extraction: deserializable, plus a shape predicate
/// evaluated on the parsed JSON before deserialization.
pub trait Schema: DeserializeOwned {
    fn is_well_formed(value: &Value) -> bool;
}

#[derive(Debug, Clone, PartialEq)]
pub enum Extracted<T> {
    Structured(T),
    RawText(String),
}

impl<T> Extracted<T> {
    pub fn is_structured(&self) -> bool {
        matches!(self, Extracted::Structured(_))
    }
}

/// How a candidate JSON string is carved out of the reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// The reply as-is.
    WholeText,
    /// From the first `{` to a `}` that ends the reply.
    TrailingObject,
    /// The body of the first markdown code fence.
    FencedBlock,
}

/// Evaluated in order, first acceptance wins.
pub const STRATEGIES: [Strategy; 3] = [
    Strategy::WholeText,
    Strategy::TrailingObject,
    Strategy::FencedBlock,
];

impl Strategy {
    pub fn candidate(self, raw: &str) -> Option<&str> {
        match self {
            Strategy::WholeText => Some(raw),
            Strategy::TrailingObject => trailing_object(raw),
            Strategy::FencedBlock => fenced_block(raw),
        }
    }
}

/// Strict parse followed by the shape check. `None` means "try the next strategy".
pub fn accept<T: Schema>(candidate: &str) -> Option<T> {
    let value: Value = serde_json::from_str(candidate).ok()?;
    if !T::is_well_formed(&value) {
        return None;
    }
    serde_json::from_value(value).ok()
}

pub fn extract<T: Schema>(raw: &str) -> Extracted<T> {
    for strategy in STRATEGIES {
        let Some(candidate) = strategy.candidate(raw) else {
            continue;
        };
        if let Some(parsed) = accept::<T>(candidate) {
            debug!("Extracted structured reply via {strategy:?}");
            return Extracted::Structured(parsed);
        }
    }

    if raw.trim().is_empty() {
        Extracted::RawText(EMPTY_REPLY_PLACEHOLDER.to_string())
    } else {
        Extracted::RawText(raw.to_string())
    }
}

/// Trailing whitespace is ignored; anything else after the final `}` disqualifies the reply.
fn trailing_object(raw: &str) -> Option<&str> {
    let trimmed = raw.trim_end();
    if !trimmed.ends_with('}') {
        return None;
    }
    let start = trimmed.find('{')?;
    Some(&trimmed[start..])
}

fn fenced_block(raw: &str) -> Option<&str> {
    let open = raw.find("```")?;
    let after_open = &raw[open + 3..];
    // Skip the info string (`json`, `JSON`, ...) up to the end of the line.
    let body_start = after_open.find('\n')? + 1;
    let body = &after_open[body_start..];
    let close = body.find("```")?;
    Some(body[..close].trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FeedbackDocument, StructuredSuggestion};
    use crate::testing::sample_feedback_json;
    use serde_json::json;

    const E2E_REPLY: &str = "Here you go:\n{\"suggestedEdits\":[\"Use action verbs\"],\"sampleLines\":[\"Led a team of 5 engineers\"]}";

    fn structured(raw: &str) -> StructuredSuggestion {
        match extract::<StructuredSuggestion>(raw) {
            Extracted::Structured(s) => s,
            Extracted::RawText(t) => panic!("expected structured, got raw text: {t}"),
        }
    }

    #[test]
    fn test_strict_json_round_trips() {
        let value = json!({
            "title": "Quantify",
            "suggestedEdits": ["Add a metric"],
            "beforeAfter": [{"before": "Improved latency", "after": "Cut p99 latency 40%"}],
            "sampleLines": ["Cut p99 latency 40% by adding a read-through cache"],
            "quickSwaps": [{"from": "helped", "to": ["drove"]}],
            "notes": "Metrics beat adjectives."
        });
        let parsed = structured(&value.to_string());
        assert_eq!(serde_json::to_value(&parsed).unwrap(), value);
    }

    #[test]
    fn test_preamble_then_object() {
        let s = structured(E2E_REPLY);
        assert_eq!(s.suggested_edits, vec!["Use action verbs"]);
        assert_eq!(s.sample_lines, vec!["Led a team of 5 engineers"]);
        assert!(s.title.is_none());
        assert!(s.before_after.is_none());
        assert!(s.quick_swaps.is_none());
        assert!(s.notes.is_none());
    }

    #[test]
    fn test_trailing_newline_after_object_is_tolerated() {
        let s = structured(&format!("{E2E_REPLY}\n\n"));
        assert_eq!(s.sample_lines.len(), 1);
    }

    #[test]
    fn test_text_without_braces_is_raw() {
        let raw = "Try opening with a stronger verb such as 'Led'.";
        assert_eq!(
            extract::<StructuredSuggestion>(raw),
            Extracted::RawText(raw.to_string())
        );
    }

    #[test]
    fn test_empty_reply_gets_placeholder() {
        assert_eq!(
            extract::<StructuredSuggestion>(""),
            Extracted::RawText(EMPTY_REPLY_PLACEHOLDER.to_string())
        );
        assert_eq!(
            extract::<StructuredSuggestion>("  \n"),
            Extracted::RawText(EMPTY_REPLY_PLACEHOLDER.to_string())
        );
    }

    #[test]
    fn test_parsed_but_missing_field_is_demoted() {
        let raw = r#"{"suggestedEdits":["Use action verbs"]}"#;
        assert_eq!(
            extract::<StructuredSuggestion>(raw),
            Extracted::RawText(raw.to_string())
        );
    }

    #[test]
    fn test_parsed_but_wrong_type_is_demoted() {
        let raw = r#"{"suggestedEdits":"Use action verbs","sampleLines":["Led a team"]}"#;
        assert_eq!(
            extract::<StructuredSuggestion>(raw),
            Extracted::RawText(raw.to_string())
        );
    }

    #[test]
    fn test_non_string_elements_are_demoted() {
        let raw = r#"{"suggestedEdits":[1, 2],"sampleLines":["Led a team"]}"#;
        assert!(!extract::<StructuredSuggestion>(raw).is_structured());
    }

    #[test]
    fn test_prose_after_object_is_raw() {
        let raw = "{\"suggestedEdits\":[],\"sampleLines\":[]}\nHope this helps!";
        assert_eq!(
            extract::<StructuredSuggestion>(raw),
            Extracted::RawText(raw.to_string())
        );
    }

    #[test]
    fn test_interior_braces_in_preamble_break_trailing_match() {
        // The candidate starts at the first brace, so it includes the prose.
        let raw = "Use {placeholders} sparingly: {\"suggestedEdits\":[],\"sampleLines\":[]}";
        assert!(!extract::<StructuredSuggestion>(raw).is_structured());
    }

    #[test]
    fn test_fenced_block_is_last_resort() {
        let raw = "Sure!\n```json\n{\"suggestedEdits\":[\"a\"],\"sampleLines\":[\"b\"]}\n```";
        let s = structured(raw);
        assert_eq!(s.suggested_edits, vec!["a"]);
    }

    #[test]
    fn test_trailing_object_candidate() {
        assert_eq!(trailing_object("x {\"a\":1}  "), Some("{\"a\":1}"));
        assert_eq!(trailing_object("x {\"a\":1} y"), None);
        assert_eq!(trailing_object("no braces"), None);
        assert_eq!(trailing_object("only close }"), None);
    }

    #[test]
    fn test_fenced_block_candidate() {
        assert_eq!(fenced_block("```\n{}\n```"), Some("{}"));
        assert_eq!(fenced_block("```json\n{\"a\":1}\n```"), Some("{\"a\":1}"));
        assert_eq!(fenced_block("```json {} ```"), None);
        assert_eq!(fenced_block("no fences"), None);
    }

    #[test]
    fn test_strategies_are_independently_evaluable() {
        let raw = "Preface {\"x\":1}";
        assert_eq!(Strategy::WholeText.candidate(raw), Some(raw));
        assert_eq!(Strategy::TrailingObject.candidate(raw), Some("{\"x\":1}"));
        assert_eq!(Strategy::FencedBlock.candidate(raw), None);
    }

    #[test]
    fn test_feedback_document_after_preamble() {
        let raw = format!("Here is the analysis:\n{}", sample_feedback_json());
        match extract::<FeedbackDocument>(&raw) {
            Extracted::Structured(doc) => assert_eq!(doc.overall_score, 72),
            Extracted::RawText(t) => panic!("expected feedback document, got {t}"),
        }
    }

    #[test]
    fn test_feedback_document_with_fractional_scores() {
        let mut value = sample_feedback_json();
        value["overallScore"] = json!(85.0);
        value["content"]["score"] = json!(72.5);
        match extract::<FeedbackDocument>(&value.to_string()) {
            Extracted::Structured(doc) => {
                assert_eq!(doc.overall_score, 85);
                assert_eq!(doc.content.score, 73);
            }
            Extracted::RawText(t) => panic!("expected feedback document, got {t}"),
        }
    }

    #[test]
    fn test_feedback_shape_mismatch_is_raw() {
        let raw = r#"{"overallScore": 80}"#;
        assert_eq!(
            extract::<FeedbackDocument>(raw),
            Extracted::RawText(raw.to_string())
        );
    }
}

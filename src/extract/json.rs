//! Recovery of structured payloads from free-form model output
//!
//! Four strategies are tried in order and the first that yields valid JSON wins:
//!
//! 1. the whole (newline-normalized) text parses directly
//! 2. the slice from the first open marker to the last close marker parses
//! 3. the longest balanced run (up to three levels of nesting) found by a
//!    regex scan parses
//! 4. the text from the first open marker, completed with the missing close
//!    markers, parses
//!
//! When every strategy fails the caller gets a typed failure carrying a
//! truncated copy of the input instead of an error.

use super::markers::StructuralMarkers;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::OnceLock;
use thiserror::Error;
use tracing::{debug, warn};

/// Number of input characters kept in a failure payload
pub const ORIGINAL_EXCERPT_CHARS: usize = 500;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExtractionError {
    #[error("Empty input string")]
    EmptyInput,

    #[error("Failed to extract valid JSON")]
    NoPayload,

    #[error("Payload does not match {target}: {message}")]
    Schema {
        target: &'static str,
        message: String,
    },
}

/// Which strategy produced a payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Direct,
    OuterSlice,
    BalancedScan,
    TruncationRepair,
}

/// Outcome of an extraction attempt
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    Parsed { value: Value, strategy: Strategy },
    Failed {
        error: ExtractionError,
        original: String,
    },
}

impl Extraction {
    pub fn is_parsed(&self) -> bool {
        matches!(self, Extraction::Parsed { .. })
    }

    pub fn value(&self) -> Option<&Value> {
        match self {
            Extraction::Parsed { value, .. } => Some(value),
            Extraction::Failed { .. } => None,
        }
    }

    pub fn strategy(&self) -> Option<Strategy> {
        match self {
            Extraction::Parsed { strategy, .. } => Some(*strategy),
            Extraction::Failed { .. } => None,
        }
    }

    /// The payload, or the error payload when extraction failed
    pub fn into_value(self) -> Value {
        match self {
            Extraction::Parsed { value, .. } => value,
            Extraction::Failed {
                error: ExtractionError::EmptyInput,
                ..
            } => json!({ "error": ExtractionError::EmptyInput.to_string() }),
            Extraction::Failed { error, original } => json!({
                "error": error.to_string(),
                "original": original,
            }),
        }
    }

    /// Typed view of the payload
    pub fn parse_as<T: DeserializeOwned>(self, target: &'static str) -> Result<T, ExtractionError> {
        match self {
            Extraction::Parsed { value, .. } => {
                serde_json::from_value(value).map_err(|e| ExtractionError::Schema {
                    target,
                    message: e.to_string(),
                })
            }
            Extraction::Failed { error, .. } => Err(error),
        }
    }
}

/// Payload extractor for one pair of structural markers
#[derive(Debug, Clone)]
pub struct Extractor {
    markers: StructuralMarkers,
    balanced: Option<Regex>,
}

impl Extractor {
    pub fn new(markers: StructuralMarkers) -> Self {
        let open = regex::escape(&markers.open.to_string());
        let close = regex::escape(&markers.close.to_string());
        let other = format!("[^{}{}]", open, close);
        let pattern = format!(
            "{o}(?:{n}|(?:{o}(?:{n}|(?:{o}{n}*{c}))*{c}))*{c}",
            o = open,
            c = close,
            n = other
        );
        let balanced = Regex::new(&pattern).ok();
        Self { markers, balanced }
    }

    pub fn extract(&self, text: &str) -> Extraction {
        if text.trim().is_empty() {
            return Extraction::Failed {
                error: ExtractionError::EmptyInput,
                original: String::new(),
            };
        }

        let normalized = normalize_newlines(text);

        if let Some(value) = parse(&normalized) {
            return parsed(value, Strategy::Direct);
        }

        if let Some(value) = self.outer_slice(&normalized).and_then(parse) {
            return parsed(value, Strategy::OuterSlice);
        }

        if let Some(value) = self.balanced_scan(&normalized) {
            return parsed(value, Strategy::BalancedScan);
        }

        if let Some(value) = self.repair_truncated(&normalized).as_deref().and_then(parse) {
            debug!(
                missing = self.markers.deficit(&normalized),
                "Recovered truncated payload by closing open markers"
            );
            return parsed(value, Strategy::TruncationRepair);
        }

        warn!(
            chars = text.chars().count(),
            "Could not extract a structured payload from response"
        );
        Extraction::Failed {
            error: ExtractionError::NoPayload,
            original: excerpt(text),
        }
    }

    fn outer_slice<'a>(&self, text: &'a str) -> Option<&'a str> {
        let start = text.find(self.markers.open)?;
        let end = text.rfind(self.markers.close)?;
        if start < end {
            Some(&text[start..end + self.markers.close.len_utf8()])
        } else {
            None
        }
    }

    fn balanced_scan(&self, text: &str) -> Option<Value> {
        let mut runs: Vec<&str> = self.balanced.as_ref()?.find_iter(text).map(|m| m.as_str()).collect();
        runs.sort_by(|a, b| b.len().cmp(&a.len()));
        runs.into_iter().find_map(parse)
    }

    /// Text from the first open marker with the missing close markers appended
    ///
    /// Returns `None` when the text has no open marker or is not short of
    /// close markers.
    pub fn repair_truncated(&self, text: &str) -> Option<String> {
        let missing = self.markers.deficit(text);
        if missing == 0 {
            return None;
        }
        let start = text.find(self.markers.open)?;
        let mut repaired = text[start..].to_string();
        repaired.extend(std::iter::repeat(self.markers.close).take(missing));
        Some(repaired)
    }
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new(StructuralMarkers::BRACES)
    }
}

fn default_extractor() -> &'static Extractor {
    static EXTRACTOR: OnceLock<Extractor> = OnceLock::new();
    EXTRACTOR.get_or_init(Extractor::default)
}

/// Extracts a JSON payload delimited by curly braces
pub fn extract(text: &str) -> Extraction {
    default_extractor().extract(text)
}

/// Extracts a payload and deserializes it into `T`
pub fn extract_as<T: DeserializeOwned>(text: &str, target: &'static str) -> Result<T, ExtractionError> {
    extract(text).parse_as(target)
}

/// Extraction result serialized back to a string, error payload included
pub fn extract_text(text: &str) -> String {
    extract(text).into_value().to_string()
}

fn parse(text: &str) -> Option<Value> {
    serde_json::from_str(text).ok()
}

fn parsed(value: Value, strategy: Strategy) -> Extraction {
    debug!(?strategy, "Extracted structured payload");
    Extraction::Parsed { value, strategy }
}

fn normalize_newlines(text: &str) -> String {
    text.replace("\r\n", "\n")
}

fn excerpt(text: &str) -> String {
    if text.chars().count() > ORIGINAL_EXCERPT_CHARS {
        let head: String = text.chars().take(ORIGINAL_EXCERPT_CHARS).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use yare::parameterized;

    #[parameterized(
        direct = { r#"{"isValid": true}"#, Strategy::Direct },
        direct_array = { r#"[1, 2, 3]"#, Strategy::Direct },
        prose_around = { r#"Here you go: {"isValid": true} hope it helps"#, Strategy::OuterSlice },
        fenced = { "```json\n{\"a\": {\"b\": 1}}\n```", Strategy::OuterSlice },
        two_objects = { r#"first {"a": 1} then {"b": {"c": 2}} done"#, Strategy::BalancedScan },
        truncated = { r#"{"a": {"b": [1, 2]"#, Strategy::TruncationRepair },
    )]
    fn test_strategy_selection(input: &str, expected: Strategy) {
        let extraction = extract(input);
        assert_eq!(extraction.strategy(), Some(expected), "input: {}", input);
    }

    #[test]
    fn test_balanced_scan_prefers_longest_run() {
        let text = r#"small {"a": 1} and larger {"b": {"c": 2, "d": 3}} end"#;
        let value = extract(text).into_value();
        assert_eq!(value, json!({"b": {"c": 2, "d": 3}}));
    }

    #[test]
    fn test_crlf_is_normalized() {
        let value = extract("{\r\n  \"a\": 1\r\n}").into_value();
        assert_eq!(value, json!({"a": 1}));
    }

    #[test]
    fn test_escaped_newlines_inside_strings_survive() {
        let value = extract(r#"{"improvedCode": "line1\nline2"}"#).into_value();
        assert_eq!(value["improvedCode"], "line1\nline2");
    }

    #[test]
    fn test_empty_input() {
        let extraction = extract("   \n ");
        assert_eq!(
            extraction,
            Extraction::Failed {
                error: ExtractionError::EmptyInput,
                original: String::new(),
            }
        );
        assert_eq!(extraction.into_value(), json!({"error": "Empty input string"}));
    }

    #[test]
    fn test_failure_payload_truncates_original() {
        let text = "no structure here ".repeat(50);
        let value = extract(&text).into_value();

        assert_eq!(value["error"], "Failed to extract valid JSON");
        let original = value["original"].as_str().unwrap();
        assert!(original.ends_with("..."));
        assert_eq!(original.chars().count(), ORIGINAL_EXCERPT_CHARS + 3);
    }

    #[test]
    fn test_short_failure_keeps_whole_original() {
        let value = extract("plain words").into_value();
        assert_eq!(value["original"], "plain words");
    }

    #[test]
    fn test_extraction_is_idempotent() {
        let inputs = [
            r#"{"a": 1}"#,
            r#"Sure! {"isValid": false, "checkResults": {}} Anything else?"#,
            r#"{"a": {"b": {"c": "#,
            "nothing to see",
            "",
        ];
        for input in inputs {
            let once = extract(input).into_value();
            let twice = extract(&once.to_string()).into_value();
            assert_eq!(once, twice, "input: {:?}", input);
        }
    }

    #[test]
    fn test_truncation_repair_for_every_cut_depth() {
        let extractor = Extractor::default();
        let payload = r#"{"a": {"b": {"c": {"d": 1}}}}"#;
        for k in 1..=4 {
            let truncated = &payload[..payload.len() - k];
            let repaired = extractor.repair_truncated(truncated).unwrap();
            let value: Value = serde_json::from_str(&repaired).unwrap();
            assert_eq!(value, json!({"a": {"b": {"c": {"d": 1}}}}), "k = {}", k);
            assert!(extract(truncated).is_parsed(), "k = {}", k);
        }
    }

    #[test]
    fn test_repair_truncated_direct() {
        let extractor = Extractor::default();
        assert_eq!(
            extractor.repair_truncated(r#"text {"a": {"b": 2"#),
            Some(r#"{"a": {"b": 2}}"#.to_string())
        );
        assert_eq!(extractor.repair_truncated(r#"{"a": 1}"#), None);
        assert_eq!(extractor.repair_truncated("no markers"), None);
    }

    #[test]
    fn test_parse_as_reports_schema_mismatch() {
        #[derive(Debug, serde::Deserialize)]
        struct Target {
            #[allow(dead_code)]
            required: String,
        }

        let err = extract_as::<Target>(r#"{"other": 1}"#, "Target").unwrap_err();
        assert!(matches!(err, ExtractionError::Schema { target: "Target", .. }));

        let err = extract_as::<Target>("", "Target").unwrap_err();
        assert_eq!(err, ExtractionError::EmptyInput);
    }

    #[test]
    fn test_extract_text_serializes_payload() {
        assert_eq!(extract_text(r#"x {"a":1} y"#), r#"{"a":1}"#);
    }

    #[test]
    fn test_custom_markers_extractor() {
        let extractor = Extractor::new(StructuralMarkers::new('[', ']'));
        let extraction = extractor.extract("values: [1, [2, 3]] trailing");
        assert_eq!(extraction.into_value(), json!([1, [2, 3]]));
    }
}

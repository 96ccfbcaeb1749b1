//! Extraction of JSON following literal output markers.

use once_cell::sync::Lazy;
use regex::Regex;

use super::Strategy;
use crate::schema::ExtractionSchema;

/// Marker-prefixed object/array patterns, in precedence order.
static MARKERS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?s)JSON Output:\s*(\{.*?\})").unwrap(),
        Regex::new(r"(?s)JSON Output:\s*(\[.*?\])").unwrap(),
        Regex::new(r"(?s)Output:\s*(\{.*?\})").unwrap(),
        Regex::new(r"(?s)Output:\s*(\[.*?\])").unwrap(),
        Regex::new(r"(?s)Result:\s*(\{.*?\})").unwrap(),
        Regex::new(r"(?s)Result:\s*(\[.*?\])").unwrap(),
    ]
});

/// Looks for JSON following markers like `JSON Output:` or `Result:`.
///
/// Prompts ask the model to label its answer this way, so a marker hit is
/// high-precision. The capture is non-greedy up to the first closing
/// delimiter, which under-captures nested structures; those are recovered
/// by the scanning strategy instead.
#[derive(Debug, Clone, Default)]
pub struct MarkerPrefixed;

impl Strategy for MarkerPrefixed {
    #[inline]
    fn name(&self) -> &'static str {
        "marker_prefixed"
    }

    fn candidates(&self, input: &str, _schema: &ExtractionSchema) -> Vec<String> {
        MARKERS
            .iter()
            .filter_map(|pattern| pattern.captures(input))
            .filter_map(|cap| cap.get(1).map(|m| m.as_str().to_string()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::schema::schema;

    fn meta() -> &'static ExtractionSchema {
        schema("case_metadata").unwrap()
    }

    #[test]
    fn test_json_output_marker() {
        let input = "analysis done.\nJSON Output: {\"event_type\": \"plea\"}";
        let got = MarkerPrefixed.candidates(input, meta());
        assert_eq!(got[0], "{\"event_type\": \"plea\"}");
    }

    #[test]
    fn test_result_marker_with_array() {
        let input = "Result: [{\"statute\": \"18 U.S.C. 1960\"}]";
        let got = MarkerPrefixed.candidates(input, meta());
        assert!(got.contains(&"[{\"statute\": \"18 U.S.C. 1960\"}]".to_string()));
    }

    #[test]
    fn test_marker_precedence() {
        let input = "Result: {\"b\": 2}\nJSON Output: {\"a\": 1}";
        let got = MarkerPrefixed.candidates(input, meta());
        assert_eq!(got[0], "{\"a\": 1}");
    }

    #[test]
    fn test_no_marker() {
        assert!(MarkerPrefixed
            .candidates("{\"a\": 1} without any label", meta())
            .is_empty());
    }
}

//! Fenced code block extraction.

use once_cell::sync::Lazy;
use regex::Regex;

use super::Strategy;
use crate::schema::ExtractionSchema;

/// Markdown code fences with an optional language tag.
static CODE_BLOCK: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)```(\w*)\n(.*?)```").unwrap());

/// Extracts candidates from triple-backtick code blocks.
///
/// The model is explicitly asked to fence its JSON output, so this is the
/// highest-precision strategy and runs first. Blocks tagged `json` are
/// preferred over untagged blocks, and within a group the *last* block in
/// the text wins — when a response echoes an example before the real
/// answer, the final block supersedes it.
#[derive(Debug, Clone, Default)]
pub struct FencedBlock;

impl FencedBlock {
    fn looks_like_json(content: &str) -> bool {
        let trimmed = content.trim_start();
        trimmed.starts_with('{') || trimmed.starts_with('[')
    }
}

impl Strategy for FencedBlock {
    #[inline]
    fn name(&self) -> &'static str {
        "fenced_block"
    }

    fn candidates(&self, input: &str, _schema: &ExtractionSchema) -> Vec<String> {
        let mut tagged = Vec::new();
        let mut untagged = Vec::new();

        for cap in CODE_BLOCK.captures_iter(input) {
            let lang = cap.get(1).map(|m| m.as_str()).unwrap_or("");
            let content = cap.get(2).map(|m| m.as_str().trim()).unwrap_or("");
            if content.is_empty() {
                continue;
            }

            if lang.eq_ignore_ascii_case("json") {
                tagged.push(content.to_string());
            } else if lang.is_empty() && Self::looks_like_json(content) {
                untagged.push(content.to_string());
            }
        }

        // Last block in source order is tried first.
        let mut picked = if tagged.is_empty() { untagged } else { tagged };
        picked.reverse();
        picked
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
    fn test_extracts_json_tagged_block() {
        let input = "Here you go:\n```json\n{\"case_number\": \"21-cr-1\"}\n```\n";
        let got = FencedBlock.candidates(input, meta());
        assert_eq!(got, vec!["{\"case_number\": \"21-cr-1\"}".to_string()]);
    }

    #[test]
    fn test_last_block_preferred() {
        let input = "\
```json
{\"id\": 1}
```
and the final version:
```json
{\"id\": 2}
```
";
        let got = FencedBlock.candidates(input, meta());
        assert_eq!(got[0], "{\"id\": 2}");
        assert_eq!(got[1], "{\"id\": 1}");
    }

    #[test]
    fn test_tagged_blocks_shadow_untagged() {
        let input = "\
```
{\"untagged\": true}
```
```json
{\"tagged\": true}
```
";
        let got = FencedBlock.candidates(input, meta());
        assert_eq!(got, vec!["{\"tagged\": true}".to_string()]);
    }

    #[test]
    fn test_untagged_block_must_look_like_json() {
        let input = "```\nplain prose\n```\n```\n[1, 2]\n```\n";
        let got = FencedBlock.candidates(input, meta());
        assert_eq!(got, vec!["[1, 2]".to_string()]);
    }

    #[test]
    fn test_other_language_blocks_ignored() {
        let input = "```python\nprint('hi')\n```\n";
        assert!(FencedBlock.candidates(input, meta()).is_empty());
    }

    #[test]
    fn test_no_blocks() {
        assert!(FencedBlock.candidates("no fences here", meta()).is_empty());
    }
}

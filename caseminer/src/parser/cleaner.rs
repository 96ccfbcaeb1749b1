//! Removal of model reasoning markup before structural parsing.

use once_cell::sync::Lazy;
use regex::Regex;

/// Blocks of chain-of-thought the model may leak into its output.
/// Non-greedy, case-insensitive, and spanning newlines.
static THINK_BLOCKS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?is)<think>.*?</think>").unwrap(),
        Regex::new(r"(?is)<thinking>.*?</thinking>").unwrap(),
        Regex::new(r"(?is)<reasoning>.*?</reasoning>").unwrap(),
    ]
});

/// Any residual angle-bracket markup, removed without interpretation.
static ANY_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").unwrap());

/// Strips reasoning markup and leftover tags from a raw model response.
///
/// Reasoning models wrap deliberation in `<think>`/`<thinking>`/`<reasoning>`
/// blocks; those blocks routinely contain draft JSON that must never reach
/// the extraction cascade. Whole blocks are removed first, then any
/// remaining `<tag>` markup is dropped without interpreting its content.
///
/// Never fails, and is idempotent: `clean(clean(x)) == clean(x)`.
///
/// # Examples
///
/// ```
/// use caseminer::parser::clean;
///
/// let raw = "<think>draft: {\"answer\": \"no\"}</think>\n{\"answer\": \"yes\"}";
/// assert_eq!(clean(raw).trim(), "{\"answer\": \"yes\"}");
/// ```
pub fn clean(raw: &str) -> String {
    let mut text = raw.to_string();
    for pattern in THINK_BLOCKS.iter() {
        text = pattern.replace_all(&text, "").into_owned();
    }
    ANY_TAG.replace_all(&text, "").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_think_block() {
        let raw = "<think>some reasoning here</think>\n{\"a\": 1}";
        assert_eq!(clean(raw).trim(), "{\"a\": 1}");
    }

    #[test]
    fn test_strips_thinking_and_reasoning_blocks() {
        let raw = "<thinking>first</thinking>middle<reasoning>second</reasoning>";
        assert_eq!(clean(raw), "middle");
    }

    #[test]
    fn test_case_insensitive_across_newlines() {
        let raw = "<THINK>line one\nline two\n</THINK>rest";
        assert_eq!(clean(raw), "rest");
    }

    #[test]
    fn test_non_greedy_between_blocks() {
        let raw = "<think>a</think>keep<think>b</think>";
        assert_eq!(clean(raw), "keep");
    }

    #[test]
    fn test_strips_residual_tags() {
        let raw = "<output>{\"a\": 1}</output>";
        assert_eq!(clean(raw), "{\"a\": 1}");
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(clean(""), "");
    }

    #[test]
    fn test_idempotent() {
        let inputs = [
            "<think>x</think>{\"a\": 1}",
            "plain text",
            "",
            "<a><b>nested</b></a>",
            "unmatched < bracket",
        ];
        for raw in inputs {
            let once = clean(raw);
            assert_eq!(clean(&once), once, "not idempotent on {raw:?}");
        }
    }

    #[test]
    fn test_leaves_braces_inside_strings_alone() {
        let raw = "{\"text\": \"a less-than b\"}";
        assert_eq!(clean(raw), raw);
    }
}

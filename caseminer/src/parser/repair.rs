//! Best-effort textual repair of near-valid JSON.

use once_cell::sync::Lazy;
use regex::Regex;

/// Trailing commas immediately before a closing brace or bracket.
static TRAILING_COMMA: Lazy<Regex> = Lazy::new(|| Regex::new(r",(\s*[}\]])").unwrap());

/// Bare word followed by a colon, quoted as if it were a key.
static BARE_KEY: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\s*)(\w+)(\s*):").unwrap());

/// Single-quoted string literal.
static SINGLE_QUOTED: Lazy<Regex> = Lazy::new(|| Regex::new(r"'([^']*)'").unwrap());

/// Non-printable and control characters.
static CONTROL_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\x00-\x1f\x7f-\x9f]").unwrap());

/// Applies a fixed sequence of textual substitutions intended to turn
/// near-valid JSON into valid JSON.
///
/// In order: trim surrounding whitespace, drop trailing commas, quote bare
/// word keys, convert single-quoted literals to double-quoted, strip
/// control characters, and collapse escaped quotes and literal `\n`/`\t`
/// sequences.
///
/// This is a heuristic pass, not a grammar-aware repair. The bare-key step
/// is known to misfire on values containing colons (URLs, timestamps):
/// `"http://x"` becomes `"http"://x"`. A candidate mangled this way simply
/// fails to parse and the cascade moves on to its next strategy, so the
/// misfire costs recall on rare inputs rather than correctness.
///
/// Returns `None` only for empty input. Whether the repair *worked* is
/// judged by the caller, by parsing the result.
///
/// # Examples
///
/// ```
/// use caseminer::parser::repair;
///
/// let fixed = repair("{name: 'Alice', role: 'defendant',}").unwrap();
/// let value: serde_json::Value = serde_json::from_str(&fixed).unwrap();
/// assert_eq!(value["name"], "Alice");
/// ```
pub fn repair(candidate: &str) -> Option<String> {
    if candidate.is_empty() {
        return None;
    }

    let mut text = candidate.trim().to_string();
    text = TRAILING_COMMA.replace_all(&text, "$1").into_owned();
    text = BARE_KEY
        .replace_all(&text, "${1}\"${2}\"${3}:")
        .into_owned();
    text = SINGLE_QUOTED.replace_all(&text, "\"$1\"").into_owned();
    text = CONTROL_CHARS.replace_all(&text, "").into_owned();
    text = text.replace("\\\"", "\"");
    text = text.replace("\\n", " ");
    text = text.replace("\\t", " ");
    Some(text)
}

/// Convenience: repair a candidate, then attempt to parse the result.
pub fn repair_and_parse(candidate: &str) -> Option<serde_json::Value> {
    let repaired = repair(candidate)?;
    serde_json::from_str(&repaired).ok()
}

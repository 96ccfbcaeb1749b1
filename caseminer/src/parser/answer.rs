//! The yes/no/unknown classification path.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::StructuralExtractor;
use crate::schema::{Arity, ExtractionSchema};

/// The classification outcome for statute applicability.
///
/// This is a closed set: any value outside it, or no value at all, coerces
/// to [`Verdict::Unknown`]. The caller persists exactly one of these three
/// states and has no representation for "extraction error" distinct from
/// "the model said it doesn't know".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    /// The case clearly involves the statute.
    Yes,
    /// The case does not involve the statute.
    No,
    /// Applicability could not be determined.
    Unknown,
}

impl Verdict {
    /// Parses a raw answer value, coercing anything out-of-set to `Unknown`.
    pub fn from_answer(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "yes" => Self::Yes,
            "no" => Self::No,
            _ => Self::Unknown,
        }
    }

    /// Strict variant: `None` for anything outside the closed set.
    pub fn from_answer_strict(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "yes" => Some(Self::Yes),
            "no" => Some(Self::No),
            "unknown" => Some(Self::Unknown),
            _ => None,
        }
    }

    /// Returns the lowercase string persisted to storage.
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Yes => "yes",
            Self::No => "no",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The shape the classification prompt asks for: an object with one
/// `answer` key.
static ANSWER_SHAPE: ExtractionSchema = ExtractionSchema {
    name: "answer",
    arity: Arity::Single,
    expected_keys: &["answer"],
    min_expected_keys_present: 1,
    field_kinds: &[],
};

/// Quote-tolerant `answer: value` patterns, applied to the raw text.
static ANSWER_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r#"(?i)"answer"\s*:\s*"([^"]+)""#).unwrap(),
        Regex::new(r#"(?i)'answer'\s*:\s*'([^']+)'"#).unwrap(),
        Regex::new(r#"(?i)answer\s*:\s*"([^"]+)""#).unwrap(),
        Regex::new(r#"(?i)answer\s*:\s*'([^']+)'"#).unwrap(),
    ]
});

/// A bare standalone verdict token anywhere in the text.
static BARE_VERDICT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(yes|no|unknown)\b").unwrap());

/// Extracts a classification verdict from a raw model response.
///
/// A narrower, simpler pipeline than full structural extraction:
///
/// 1. structural extraction constrained to an object with an `answer` key;
///    accepted only if the value is in the closed set
/// 2. quote-tolerant `"answer": "..."` pattern match against the *uncleaned*
///    text, accepting only valid values
/// 3. a bare, word-bounded `yes`/`no`/`unknown` token anywhere in the text
/// 4. [`Verdict::Unknown`]
///
/// This function never fails: it always returns a member of the closed
/// verdict set, for any input whatsoever.
///
/// # Examples
///
/// ```
/// use caseminer::{extract_answer, Verdict};
///
/// assert_eq!(extract_answer(r#"{"answer": "yes"}"#), Verdict::Yes);
/// assert_eq!(extract_answer("total garbage"), Verdict::Unknown);
/// ```
pub fn extract_answer(raw: &str) -> Verdict {
    // Tier 1: structural extraction of an answer object.
    if let Some(value) = StructuralExtractor::new().extract(raw, &ANSWER_SHAPE) {
        if let Some(answer) = value.get("answer").and_then(|v| v.as_str()) {
            if let Some(verdict) = Verdict::from_answer_strict(answer) {
                return verdict;
            }
        }
    }

    // Tier 2: answer patterns directly in the uncleaned text. The raw text
    // is searched on purpose: a response consisting only of a think block
    // may still carry its verdict inside that block.
    for pattern in ANSWER_PATTERNS.iter() {
        if let Some(cap) = pattern.captures(raw) {
            if let Some(m) = cap.get(1) {
                if let Some(verdict) = Verdict::from_answer_strict(m.as_str()) {
                    return verdict;
                }
            }
        }
    }

    // Tier 3: a bare verdict token.
    if let Some(cap) = BARE_VERDICT.captures(raw) {
        if let Some(verdict) = Verdict::from_answer_strict(&cap[1]) {
            return verdict;
        }
    }

    Verdict::Unknown
}

//! Recovery of JSON objects cut off by a response token limit.

use once_cell::sync::Lazy;
use regex::Regex;

use super::Strategy;
use crate::schema::ExtractionSchema;

/// An object that opens but never closes before the end of the text.
static UNTERMINATED: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\{[^{}]*$").unwrap());

/// Points where explanatory prose resumes after a truncated fragment:
/// a blank line, or a line starting with a capital letter, digit, or bullet.
static PROSE_RESUMES: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"\n\s*\n").unwrap(),
        Regex::new(r"\n\s*[A-Z]").unwrap(),
        Regex::new(r"\n\s*[0-9]").unwrap(),
        Regex::new(r"\n\s*[•\-*]").unwrap(),
    ]
});

/// Completes an object the model started but never closed.
///
/// Responses cut off mid-object by a token limit are common enough to be
/// worth a dedicated last-resort pass: take the unterminated fragment, cut
/// it where prose appears to resume, and append the closing braces needed
/// to balance the count.
#[derive(Debug, Clone, Default)]
pub struct TruncationRepair;

impl Strategy for TruncationRepair {
    #[inline]
    fn name(&self) -> &'static str {
        "truncation_repair"
    }

    fn candidates(&self, input: &str, _schema: &ExtractionSchema) -> Vec<String> {
        let Some(m) = UNTERMINATED.find(input) else {
            return Vec::new();
        };

        let mut fragment = &input[m.start()..];
        for pattern in PROSE_RESUMES.iter() {
            if let Some(cut) = pattern.find(fragment) {
                fragment = &fragment[..cut.start()];
                break;
            }
        }

        let mut completed = fragment.to_string();
        let open = completed.matches('{').count();
        let close = completed.matches('}').count();
        if open > close {
            completed.push_str(&"}".repeat(open - close));
        }
        vec![completed]
    }
}

//! Whole-text parse, the final fallback.

use super::Strategy;
use crate::schema::ExtractionSchema;

/// Treats the entire cleaned text as a single candidate.
///
/// Runs last: when the model did exactly what it was asked and returned
/// nothing but JSON, every other strategy's pattern matching is
/// unnecessary, but when it did not, this parse fails fast.
#[derive(Debug, Clone, Default)]
pub struct WholeText;

impl Strategy for WholeText {
    #[inline]
    fn name(&self) -> &'static str {
        "whole_text"
    }

    fn candidates(&self, input: &str, _schema: &ExtractionSchema) -> Vec<String> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Vec::new();
        }
        vec![trimmed.to_string()]
    }
}

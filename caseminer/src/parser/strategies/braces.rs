//! Balanced-brace scanning for JSON buried in prose.

use once_cell::sync::Lazy;
use regex::Regex;

use super::Strategy;
use crate::schema::{Arity, ExtractionSchema};

/// A `{...}` region with one level of nested-brace tolerance.
static OBJECT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\{[^{}]*(?:\{[^{}]*\}[^{}]*)*\}").unwrap());

/// A `[...]` region with one level of nested-bracket tolerance.
static ARRAY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\[\s*(?:[^\[\]]*|\[[^\[\]]*\])*\s*\]").unwrap());

/// Scans the text for balanced `{...}` or `[...]` regions.
///
/// Higher recall than the fenced strategy, and correspondingly lower
/// precision: prose braces match too, which is why every candidate still
/// has to clear the schema-plausibility gate downstream. Matches are
/// returned last-first — when a response contains several structures, the
/// final one is the model's actual answer and earlier ones are drafts.
#[derive(Debug, Clone, Default)]
pub struct BalancedScan;

impl Strategy for BalancedScan {
    #[inline]
    fn name(&self) -> &'static str {
        "balanced_scan"
    }

    fn candidates(&self, input: &str, schema: &ExtractionSchema) -> Vec<String> {
        let pattern = match schema.arity {
            Arity::Single => &*OBJECT,
            Arity::List => &*ARRAY,
        };

        let mut found: Vec<String> = pattern
            .find_iter(input)
            .map(|m| m.as_str().to_string())
            .collect();
        found.reverse();
        found
    }
}

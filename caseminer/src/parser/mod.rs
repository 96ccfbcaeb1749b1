//! The structural extraction cascade.
//!
//! Model responses arrive as free text that *usually* contains the JSON we
//! asked for, wrapped in anything from markdown fences to half a page of
//! prose, or cut off mid-object by a token limit. Extraction cleans the
//! text once, then tries a fixed cascade of strategies from high precision
//! to last resort, returning the first candidate that repairs, parses, and
//! plausibly matches the requested schema.

mod answer;
mod cleaner;
mod repair;
pub mod strategies;

pub use answer::{extract_answer, Verdict};
pub use cleaner::clean;
pub use repair::{repair, repair_and_parse};

use serde_json::Value;
use tracing::debug;

use crate::schema::ExtractionSchema;
use crate::validate::is_plausible;
use strategies::{
    BalancedScan, FencedBlock, MarkerPrefixed, Strategy, TruncationRepair, WholeText,
};

/// Structural extractor that walks the strategy cascade in a fixed order.
///
/// The order is deliberate: fenced blocks and markers are high-precision
/// (the model was explicitly asked to use them) and are tried first;
/// balanced-brace scanning is higher-recall but can match irrelevant braces
/// from prose; truncation repair and the whole-text parse are last resort.
///
/// # Examples
///
/// ```
/// use caseminer::parser::StructuralExtractor;
/// use caseminer::schema::schema;
///
/// let extractor = StructuralExtractor::new();
/// let charges = schema("charges").unwrap();
/// let raw = "Here are the charges:\n```json\n[{\"statute\": \"18 U.S.C. 1960\"}]\n```";
/// let value = extractor.extract(raw, charges).unwrap();
/// assert!(value.is_array());
/// ```
#[derive(Debug)]
pub struct StructuralExtractor {
    strategies: Vec<Box<dyn Strategy>>,
}

impl Default for StructuralExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl StructuralExtractor {
    /// Creates an extractor with the default strategy cascade:
    ///
    /// 1. `FencedBlock` — triple-backtick blocks, last block first
    /// 2. `BalancedScan` — balanced `{...}`/`[...]` regions, last match first
    /// 3. `MarkerPrefixed` — text after `JSON Output:`-style markers
    /// 4. `TruncationRepair` — complete an object cut off by a token limit
    /// 5. `WholeText` — parse the entire cleaned text
    pub fn new() -> Self {
        Self {
            strategies: vec![
                Box::new(FencedBlock),
                Box::new(BalancedScan),
                Box::new(MarkerPrefixed),
                Box::new(TruncationRepair),
                Box::new(WholeText),
            ],
        }
    }

    /// Extracts a schema-plausible JSON value from a raw model response.
    ///
    /// The input is cleaned once, then each strategy's candidates are
    /// repaired and parsed in order; the first parse that passes the
    /// plausibility gate wins. Returns `None` when every strategy is
    /// exhausted — extraction failure is an expected outcome, not an error.
    ///
    /// Deterministic: the same input and schema always yield the same
    /// result.
    pub fn extract(&self, raw: &str, schema: &ExtractionSchema) -> Option<Value> {
        let cleaned = clean(raw);

        for strategy in &self.strategies {
            let candidates = strategy.candidates(&cleaned, schema);
            for candidate in &candidates {
                let Some(value) = repair_and_parse(candidate) else {
                    continue;
                };
                if is_plausible(&value, schema) {
                    debug!(
                        strategy = strategy.name(),
                        schema = schema.name,
                        "extraction succeeded"
                    );
                    return Some(value);
                }
                debug!(
                    strategy = strategy.name(),
                    schema = schema.name,
                    "candidate parsed but failed the plausibility gate"
                );
            }
        }

        debug!(schema = schema.name, "all extraction strategies failed");
        None
    }

    /// Returns the strategy names in cascade order.
    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }
}

/// Extracts a schema-plausible JSON value using the default cascade.
///
/// Convenience wrapper around [`StructuralExtractor::extract`].
pub fn extract(raw: &str, schema: &ExtractionSchema) -> Option<Value> {
    StructuralExtractor::new().extract(raw, schema)
}

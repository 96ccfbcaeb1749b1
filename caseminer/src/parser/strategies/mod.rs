//! Extraction strategies that locate candidate JSON substrings in text.

mod braces;
mod fenced;
mod marker;
mod truncation;
mod whole_text;

pub use braces::BalancedScan;
pub use fenced::FencedBlock;
pub use marker::MarkerPrefixed;
pub use truncation::TruncationRepair;
pub use whole_text::WholeText;

use crate::schema::ExtractionSchema;

/// One self-contained technique for locating candidate JSON substrings.
///
/// A strategy does not parse, repair, or validate — it only produces the
/// substrings worth trying, in preference order (most preferred first).
/// The extractor owns repair, parsing, and the plausibility gate.
pub trait Strategy: Send + Sync + std::fmt::Debug {
    /// Returns the name of this strategy for diagnostics.
    fn name(&self) -> &'static str;

    /// Returns candidate substrings from the cleaned input, most preferred
    /// first. An empty vector means the strategy does not apply.
    fn candidates(&self, input: &str, schema: &ExtractionSchema) -> Vec<String>;
}

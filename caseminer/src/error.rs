//! Error types for the classification and enrichment pipeline.
//!
//! Failure to extract anything useful from a model response is *not* an
//! error: the extraction cascade returns `None` and the answer path returns
//! [`Verdict::Unknown`](crate::Verdict::Unknown). The variants here cover
//! the failures that have an owner to report to: configuration, transport,
//! response envelopes, and storage.

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while driving the pipeline.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Required configuration is missing or invalid.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// The HTTP transport failed in a way that exhausted all retries.
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Every model in the fallback list was tried and failed.
    #[error("All fallback models exhausted for this request")]
    ModelsExhausted,

    /// The provider returned an envelope no known shape matched.
    #[error("No text content found in provider response")]
    EmptyEnvelope,

    /// A storage operation failed.
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// JSON serialization error from serde_json.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The named extraction schema is not in the registry.
    #[error("Unknown extraction schema: {0}")]
    UnknownSchema(String),
}

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an unknown-schema error.
    #[inline]
    pub fn unknown_schema(name: impl Into<String>) -> Self {
        Self::UnknownSchema(name.into())
    }
}

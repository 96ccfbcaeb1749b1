//! # caseminer
//!
//! Classification and structured-entity extraction for U.S. Department of
//! Justice press releases, built around a resilient JSON-extraction
//! cascade.
//!
//! An external language model is asked either a three-valued question (does
//! this case involve 18 U.S.C. § 1960?) or for structured records
//! (participants, charges, financial actions, ...). Models answer in text
//! that is *usually* JSON and routinely is not quite: wrapped in markdown
//! fences, preceded by reasoning markup, buried in prose, cut off
//! mid-object, or syntactically sloppy. This crate recovers a well-typed
//! value from that text deterministically, or fails in a way the caller
//! can distinguish from success.
//!
//! ## Quick start
//!
//! ```rust
//! use caseminer::{extract, extract_answer, normalize, Verdict};
//! use caseminer::schema::schema;
//!
//! // The classification path always yields a member of the closed set.
//! let raw = "<think>let me check the statute...</think>\n{\"answer\": \"yes\"}";
//! assert_eq!(extract_answer(raw), Verdict::Yes);
//!
//! // The enrichment path recovers schema-plausible JSON from messy text.
//! let charges = schema("charges").unwrap();
//! let raw = "Here are the charges:\n```json\n[{\"statute\": \"18 U.S.C. § 1960\"}]\n```";
//! let value = extract(raw, charges).unwrap();
//! let payload = normalize(value, charges).unwrap();
//! assert_eq!(payload.len(), 1);
//! ```
//!
//! ## Layout
//!
//! - [`parser`] — the cleaning, repair, and strategy cascade, plus the
//!   yes/no/unknown answer path
//! - [`schema`] — the static registry of extraction schemas
//! - [`validate`] / [`normalize`] — plausibility gate and arity coercion
//! - [`client`] — blocking model client with retry and model fallback
//! - [`storage`] — the `CaseStore` sink interface and its SQLite backing
//! - [`pipeline`] — the batch classification/enrichment workflows

pub mod client;
pub mod config;
pub mod error;
pub mod normalize;
pub mod parser;
pub mod pipeline;
pub mod schema;
pub mod storage;
pub mod validate;

pub use client::ApiClient;
pub use config::Config;
pub use error::{Error, Result};
pub use normalize::{normalize, NormalizedPayload};
pub use parser::{clean, extract, extract_answer, repair, StructuralExtractor, Verdict};
pub use pipeline::{DefaultPrompts, ModelBackend, Pipeline, PromptSource, RunSummary};
pub use schema::{Arity, ExtractionSchema, FieldKind};
pub use storage::{ActivityStatus, CaseRecord, CaseStore, SqliteStore, StoreReport};
pub use validate::is_plausible;

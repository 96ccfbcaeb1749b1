//! Classification and enrichment workflows.
//!
//! One entity is processed end-to-end at a time: prompt, call, extract,
//! normalize, store, log. A fixed pause separates entities to respect
//! provider rate limits. Nothing here is fatal to a batch: the worst
//! outcome for a single entity is "left unprocessed, retried next run",
//! because resumption works by re-querying the store for entities whose
//! latest activity status is not `success`.

use std::thread;
use std::time::Duration;

use tracing::{info, warn};

use crate::client::ApiClient;
use crate::config::Config;
use crate::error::Result;
use crate::normalize::{normalize, NormalizedPayload};
use crate::parser::{extract_answer, StructuralExtractor, Verdict};
use crate::schema::{Arity, ExtractionSchema};
use crate::storage::{require_schema, ActivityStatus, CaseRecord, CaseStore};

/// Response budget for classification calls.
const CLASSIFY_MAX_TOKENS: u32 = 2000;
/// Response budget for enrichment calls, sized for complete JSON output.
const ENRICH_MAX_TOKENS: u32 = 4000;
/// Near-deterministic sampling for both tasks.
const TEMPERATURE: f32 = 0.1;
/// Activity-log schema name used for the classification task.
const CLASSIFICATION_LOG: &str = "classification";

/// The model provider, as the pipeline sees it.
///
/// [`ApiClient`] is the production implementation; tests substitute
/// scripted backends to exercise the workflows without a network.
pub trait ModelBackend {
    /// Sends one prompt and returns the response text.
    fn complete(&self, prompt: &str, max_tokens: u32, temperature: f32) -> Result<String>;
}

impl ModelBackend for ApiClient {
    fn complete(&self, prompt: &str, max_tokens: u32, temperature: f32) -> Result<String> {
        ApiClient::complete(self, prompt, max_tokens, temperature)
    }
}

/// Produces the prompt text for each task.
///
/// Prompt wording is a collaborator concern; the pipeline only requires
/// that prompts carry the `Press Release Body:` marker so oversized bodies
/// can be truncated without losing the instructions.
pub trait PromptSource {
    /// Prompt for the yes/no/unknown statute classification.
    fn classification(&self, title: &str, body: &str) -> String;
    /// Prompt for one enrichment category.
    fn extraction(&self, schema: &ExtractionSchema, title: &str, body: &str) -> String;
}

/// Compact built-in prompt templates.
#[derive(Debug, Clone, Default)]
pub struct DefaultPrompts;

impl PromptSource for DefaultPrompts {
    fn classification(&self, title: &str, body: &str) -> String {
        format!(
            "You are a legal analyst. Determine whether the following U.S. \
             Department of Justice press release involves violations of \
             18 U.S.C. \u{a7} 1960 (operating an unlicensed money transmitting \
             business). Return ONLY a JSON object of the form \
             {{\"answer\": \"yes|no|unknown\"}}.\n\n\
             Press Release Title:\n{title}\n\
             Press Release Body:\n{body}\n"
        )
    }

    fn extraction(&self, schema: &ExtractionSchema, title: &str, body: &str) -> String {
        let shape = match schema.arity {
            Arity::Single => "a single JSON object",
            Arity::List => "a JSON array of objects",
        };
        format!(
            "You are a legal data extraction expert. From the following U.S. \
             Department of Justice press release, extract {category} records \
             with these fields: {fields}. Return ONLY {shape} with those \
             fields, using null for anything the text does not provide.\n\n\
             Press Release Title:\n{title}\n\
             Press Release Body:\n{body}\n",
            category = schema.name,
            fields = schema.expected_keys.join(", "),
        )
    }
}

/// Summary counts for one batch run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Schema processed, or `classification`.
    pub schema_name: String,
    /// Entities attempted.
    pub total: usize,
    /// Entities whose outcome was logged `success`.
    pub succeeded: usize,
    /// Entities left for the next run.
    pub failed: usize,
}

/// The classification and enrichment driver.
///
/// # Examples
///
/// ```no_run
/// use caseminer::{Config, Pipeline, Verdict};
///
/// let pipeline = Pipeline::new(&Config::from_env()).unwrap();
/// let verdict = pipeline.classify("case-1", "Title", "Body text");
/// assert!(matches!(verdict, Verdict::Yes | Verdict::No | Verdict::Unknown));
/// ```
pub struct Pipeline {
    backend: Box<dyn ModelBackend>,
    prompts: Box<dyn PromptSource>,
    extractor: StructuralExtractor,
    request_pause: Duration,
}

impl Pipeline {
    /// Creates a pipeline backed by the live API client and the built-in
    /// prompts.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`](crate::Error::Config) when the API key is
    /// missing.
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            backend: Box::new(ApiClient::new(config)?),
            prompts: Box::new(DefaultPrompts),
            extractor: StructuralExtractor::new(),
            request_pause: config.request_pause,
        })
    }

    /// Creates a pipeline with an arbitrary backend and prompt source.
    pub fn with_backend(
        backend: Box<dyn ModelBackend>,
        prompts: Box<dyn PromptSource>,
        request_pause: Duration,
    ) -> Self {
        Self {
            backend,
            prompts,
            extractor: StructuralExtractor::new(),
            request_pause,
        }
    }

    /// Classifies one press release for statute applicability.
    ///
    /// Never fails: API failure, envelope failure, and extraction failure
    /// all coerce to [`Verdict::Unknown`], because the caller persists
    /// exactly one of three states.
    pub fn classify(&self, id: &str, title: &str, body: &str) -> Verdict {
        let prompt = self.prompts.classification(title, body);
        match self.backend.complete(&prompt, CLASSIFY_MAX_TOKENS, TEMPERATURE) {
            Ok(raw) => {
                let verdict = extract_answer(&raw);
                info!(case_id = id, verdict = %verdict, "classified");
                verdict
            }
            Err(e) => {
                warn!(case_id = id, error = %e, "classification call failed");
                Verdict::Unknown
            }
        }
    }

    /// Extracts and normalizes one enrichment category for one press
    /// release. `None` means nothing schema-plausible could be recovered.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownSchema`](crate::Error::UnknownSchema) for an
    /// unregistered schema name; per-response failures are `Ok(None)`.
    pub fn enrich(
        &self,
        id: &str,
        title: &str,
        body: &str,
        schema_name: &str,
    ) -> Result<Option<NormalizedPayload>> {
        let schema = require_schema(schema_name)?;
        let prompt = self.prompts.extraction(schema, title, body);

        let raw = match self.backend.complete(&prompt, ENRICH_MAX_TOKENS, TEMPERATURE) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(case_id = id, schema = schema_name, error = %e, "enrichment call failed");
                return Ok(None);
            }
        };

        let Some(value) = self.extractor.extract(&raw, schema) else {
            return Ok(None);
        };
        Ok(normalize(value, schema))
    }

    /// Runs classification over every pending case, persisting verdicts and
    /// activity-log rows as it goes.
    pub fn run_classification(
        &self,
        store: &dyn CaseStore,
        limit: usize,
    ) -> Result<RunSummary> {
        let cases = store.pending_classification(limit)?;
        info!(total = cases.len(), "starting classification run");

        let mut summary = RunSummary {
            schema_name: CLASSIFICATION_LOG.to_string(),
            total: cases.len(),
            succeeded: 0,
            failed: 0,
        };

        for (index, case) in cases.iter().enumerate() {
            if self.classify_case(store, case) {
                summary.succeeded += 1;
            } else {
                summary.failed += 1;
            }
            if index + 1 < cases.len() {
                thread::sleep(self.request_pause);
            }
        }

        info!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            "classification run complete"
        );
        Ok(summary)
    }

    /// Runs enrichment for one schema over every pending case.
    pub fn run_enrichment(
        &self,
        store: &dyn CaseStore,
        schema_name: &str,
        limit: usize,
    ) -> Result<RunSummary> {
        let schema = require_schema(schema_name)?;
        let cases = store.pending_for(schema_name, limit)?;
        info!(schema = schema_name, total = cases.len(), "starting enrichment run");

        let mut summary = RunSummary {
            schema_name: schema_name.to_string(),
            total: cases.len(),
            succeeded: 0,
            failed: 0,
        };

        for (index, case) in cases.iter().enumerate() {
            if self.enrich_case(store, case, schema) {
                summary.succeeded += 1;
            } else {
                summary.failed += 1;
            }
            if index + 1 < cases.len() {
                thread::sleep(self.request_pause);
            }
        }

        info!(
            schema = schema_name,
            succeeded = summary.succeeded,
            failed = summary.failed,
            "enrichment run complete"
        );
        Ok(summary)
    }

    /// Runs enrichment for every registered schema, sequentially.
    pub fn run_all_enrichment(
        &self,
        store: &dyn CaseStore,
        limit: usize,
    ) -> Result<Vec<RunSummary>> {
        crate::schema::schema_names()
            .into_iter()
            .map(|name| self.run_enrichment(store, name, limit))
            .collect()
    }

    fn classify_case(&self, store: &dyn CaseStore, case: &CaseRecord) -> bool {
        let verdict = self.classify(&case.id, &case.title, &case.body);
        match store.store_verdict(&case.id, verdict) {
            Ok(()) => {
                self.log(
                    store,
                    &case.id,
                    CLASSIFICATION_LOG,
                    ActivityStatus::Success,
                    &format!("classified {verdict}"),
                );
                true
            }
            Err(e) => {
                warn!(case_id = %case.id, error = %e, "failed to store verdict");
                self.log(
                    store,
                    &case.id,
                    CLASSIFICATION_LOG,
                    ActivityStatus::Error,
                    &e.to_string(),
                );
                false
            }
        }
    }

    fn enrich_case(
        &self,
        store: &dyn CaseStore,
        case: &CaseRecord,
        schema: &ExtractionSchema,
    ) -> bool {
        let prompt = self.prompts.extraction(schema, &case.title, &case.body);

        let raw = match self.backend.complete(&prompt, ENRICH_MAX_TOKENS, TEMPERATURE) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(case_id = %case.id, schema = schema.name, error = %e, "API call failed");
                self.log(
                    store,
                    &case.id,
                    schema.name,
                    ActivityStatus::Error,
                    &format!("API call failed: {e}"),
                );
                return false;
            }
        };

        let Some(value) = self.extractor.extract(&raw, schema) else {
            // The raw text goes into the notes so failed responses can be
            // inspected offline.
            self.log(
                store,
                &case.id,
                schema.name,
                ActivityStatus::Skipped,
                &format!("no schema-plausible JSON extracted; raw response: {raw}"),
            );
            return false;
        };

        let Some(payload) = normalize(value, schema) else {
            self.log(
                store,
                &case.id,
                schema.name,
                ActivityStatus::Error,
                "payload shape could not be coerced to the schema arity",
            );
            return false;
        };

        match store.store_payload(&case.id, schema, &payload, &case.url) {
            Ok(report) => {
                self.log(
                    store,
                    &case.id,
                    schema.name,
                    ActivityStatus::Success,
                    &format!(
                        "stored {} elements, skipped {} non-object elements",
                        report.stored, report.skipped
                    ),
                );
                true
            }
            Err(e) => {
                warn!(case_id = %case.id, schema = schema.name, error = %e, "storage failed");
                self.log(
                    store,
                    &case.id,
                    schema.name,
                    ActivityStatus::Error,
                    &e.to_string(),
                );
                false
            }
        }
    }

    fn log(
        &self,
        store: &dyn CaseStore,
        case_id: &str,
        schema_name: &str,
        status: ActivityStatus,
        notes: &str,
    ) {
        if let Err(e) = store.log_activity(case_id, schema_name, status, notes) {
            warn!(case_id, schema_name, error = %e, "failed to append activity log");
        }
    }
}

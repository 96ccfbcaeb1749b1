//! The static registry of extraction schemas.
//!
//! A schema describes the shape one enrichment category is expected to take:
//! whether the model should return a single object or a list of objects,
//! which keys a plausible result carries, and how individual fields must be
//! coerced before they reach a scalar text column. The registry is built
//! once at first use and is immutable afterwards.

use std::collections::HashMap;

use once_cell::sync::Lazy;

/// Whether a schema expects a single object or a list of objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// Exactly one object (e.g. case metadata).
    Single,
    /// Zero or more objects (e.g. participants, charges).
    List,
}

/// Storage-level coercion policy for a single field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Plain scalar text; stored as-is.
    Text,
    /// The column is scalar text but models often return a list here;
    /// list values are flattened to a comma-joined string.
    CommaJoined,
    /// The column holds serialized JSON; object/array values are
    /// re-serialized to a JSON string.
    Json,
}

/// The expected shape of one enrichment category's extracted data.
#[derive(Debug, Clone)]
pub struct ExtractionSchema {
    /// Registry key, also the sink table name.
    pub name: &'static str,
    /// Single object or list of objects.
    pub arity: Arity,
    /// Keys a plausible result is expected to carry.
    pub expected_keys: &'static [&'static str],
    /// Minimum number of expected keys that must be present for a parsed
    /// object to be considered plausible.
    pub min_expected_keys_present: usize,
    /// Fields with a non-default storage coercion.
    pub field_kinds: &'static [(&'static str, FieldKind)],
}

impl ExtractionSchema {
    /// Returns the coercion policy for a field, defaulting to [`FieldKind::Text`].
    pub fn field_kind(&self, field: &str) -> FieldKind {
        self.field_kinds
            .iter()
            .find(|(name, _)| *name == field)
            .map(|(_, kind)| *kind)
            .unwrap_or(FieldKind::Text)
    }

    /// Returns true if `key` is one of this schema's expected keys.
    #[inline]
    pub fn expects_key(&self, key: &str) -> bool {
        self.expected_keys.contains(&key)
    }
}

/// All extraction schemas, keyed by name.
///
/// One entry per enrichment category. `case_metadata` is the only
/// single-object schema; it also carries the higher plausibility threshold
/// (at least 3 expected keys present) since its prompts embed a JSON example
/// the model sometimes echoes back.
pub static SCHEMAS: Lazy<HashMap<&'static str, ExtractionSchema>> = Lazy::new(|| {
    let all = [
        ExtractionSchema {
            name: "case_metadata",
            arity: Arity::Single,
            expected_keys: &[
                "district_office",
                "usa_name",
                "event_type",
                "judge_name",
                "judge_title",
                "case_number",
                "max_penalty_text",
                "sentence_summary",
                "money_amounts",
                "crypto_assets",
                "statutes_json",
                "timeline_json",
            ],
            min_expected_keys_present: 3,
            field_kinds: &[
                ("money_amounts", FieldKind::CommaJoined),
                ("crypto_assets", FieldKind::CommaJoined),
                ("statutes_json", FieldKind::Json),
                ("timeline_json", FieldKind::Json),
                ("extras_json", FieldKind::Json),
            ],
        },
        ExtractionSchema {
            name: "participants",
            arity: Arity::List,
            expected_keys: &[
                "name",
                "role",
                "title",
                "organization",
                "location",
                "age",
                "nationality",
                "status",
            ],
            min_expected_keys_present: 1,
            field_kinds: &[],
        },
        ExtractionSchema {
            name: "case_agencies",
            arity: Arity::List,
            expected_keys: &[
                "agency_name",
                "abbreviation",
                "role",
                "office_location",
                "agents_mentioned",
                "contribution",
            ],
            min_expected_keys_present: 1,
            field_kinds: &[("agents_mentioned", FieldKind::CommaJoined)],
        },
        ExtractionSchema {
            name: "charges",
            arity: Arity::List,
            expected_keys: &[
                "charge_description",
                "statute",
                "severity",
                "max_penalty",
                "fine_amount",
                "defendant",
                "status",
            ],
            min_expected_keys_present: 1,
            field_kinds: &[],
        },
        ExtractionSchema {
            name: "financial_actions",
            arity: Arity::List,
            expected_keys: &[
                "action_type",
                "amount",
                "currency",
                "description",
                "asset_type",
                "defendant",
                "status",
            ],
            min_expected_keys_present: 1,
            field_kinds: &[],
        },
        ExtractionSchema {
            name: "victims",
            arity: Arity::List,
            expected_keys: &[
                "victim_type",
                "description",
                "number_affected",
                "loss_amount",
                "geographic_scope",
                "vulnerability_factors",
                "impact_description",
            ],
            min_expected_keys_present: 1,
            field_kinds: &[],
        },
        ExtractionSchema {
            name: "quotes",
            arity: Arity::List,
            expected_keys: &[
                "quote_text",
                "speaker_name",
                "speaker_title",
                "speaker_organization",
                "quote_type",
                "context",
                "significance",
            ],
            min_expected_keys_present: 1,
            field_kinds: &[],
        },
        ExtractionSchema {
            name: "themes",
            arity: Arity::List,
            expected_keys: &[
                "theme_name",
                "description",
                "significance",
                "related_statutes",
                "geographic_scope",
                "temporal_aspects",
                "stakeholders",
            ],
            min_expected_keys_present: 1,
            field_kinds: &[
                ("related_statutes", FieldKind::CommaJoined),
                ("stakeholders", FieldKind::CommaJoined),
            ],
        },
    ];

    all.into_iter().map(|s| (s.name, s)).collect()
});

/// Looks up a schema by name.
pub fn schema(name: &str) -> Option<&'static ExtractionSchema> {
    SCHEMAS.get(name)
}

/// Returns the names of all registered schemas in a stable order.
pub fn schema_names() -> Vec<&'static str> {
    let mut names: Vec<_> = SCHEMAS.keys().copied().collect();
    names.sort_unstable();
    names
}

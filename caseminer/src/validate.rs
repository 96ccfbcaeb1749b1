//! Schema-plausibility checks for parsed values.

use serde_json::Value;

use crate::schema::{Arity, ExtractionSchema};

/// Decides whether a parsed value plausibly matches the expected shape.
///
/// This is a coarse filter, not validation: its only job is to reject
/// parses that are syntactically valid JSON but semantically unrelated to
/// the requested schema — most often the model echoing a JSON example from
/// its own prompt. A single-arity schema needs a mapping carrying at least
/// `min_expected_keys_present` of the expected keys; a list-arity schema
/// needs a sequence, with element-level filtering deferred to the storage
/// sink.
///
/// # Examples
///
/// ```
/// use caseminer::{is_plausible, schema::schema};
/// use serde_json::json;
///
/// let charges = schema("charges").unwrap();
/// assert!(is_plausible(&json!([{"statute": "18 U.S.C. 1960"}]), charges));
/// assert!(!is_plausible(&json!({"statute": "18 U.S.C. 1960"}), charges));
/// ```
pub fn is_plausible(value: &Value, schema: &ExtractionSchema) -> bool {
    match schema.arity {
        Arity::Single => match value {
            Value::Object(map) => {
                let present = map.keys().filter(|k| schema.expects_key(k)).count();
                present >= schema.min_expected_keys_present
            }
            _ => false,
        },
        Arity::List => value.is_array(),
    }
}

//! Coercion of validated payloads into the shape the storage sink expects.

use serde_json::{Map, Value};
use tracing::warn;

use crate::schema::{Arity, ExtractionSchema, FieldKind};

/// A parsed value coerced to match its schema's arity exactly.
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizedPayload {
    /// A single object, for `Arity::Single` schemas.
    Single(Map<String, Value>),
    /// A list of elements, for `Arity::List` schemas. Non-mapping elements
    /// survive to this point on purpose; the sink filters and counts them.
    List(Vec<Value>),
}

impl NormalizedPayload {
    /// Number of elements this payload will offer to the sink.
    pub fn len(&self) -> usize {
        match self {
            Self::Single(_) => 1,
            Self::List(items) => items.len(),
        }
    }

    /// True when a list payload carries no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Coerces a parsed value into the canonical shape for its schema.
///
/// Arity rules:
/// - `Single`: a list is unwrapped to its first element when that element
///   is a mapping (logged as a deviation); a mapping passes through;
///   anything else fails.
/// - `List`: a mapping is wrapped into a one-element list; a list passes
///   through as-is — element-level type filtering happens at the sink,
///   counted and reported, never silently dropped here.
///
/// After arity coercion each mapping gets the schema's field policy:
/// list values in comma-joined fields are flattened to a `", "`-joined
/// string, and object/array values in JSON fields are re-serialized to a
/// JSON string.
///
/// Returns `None` only when the top-level shape cannot be coerced at all
/// (a bare string or number where an object or list was required).
///
/// # Examples
///
/// ```
/// use caseminer::{normalize, NormalizedPayload, schema::schema};
/// use serde_json::json;
///
/// let participants = schema("participants").unwrap();
/// let payload = normalize(json!({"name": "Jane"}), participants).unwrap();
/// assert!(matches!(payload, NormalizedPayload::List(ref items) if items.len() == 1));
/// ```
pub fn normalize(value: Value, schema: &ExtractionSchema) -> Option<NormalizedPayload> {
    match schema.arity {
        Arity::Single => {
            let map = match value {
                Value::Object(map) => map,
                Value::Array(items) => {
                    warn!(
                        schema = schema.name,
                        "expected a single object, got a list; using the first element"
                    );
                    match items.into_iter().next() {
                        Some(Value::Object(map)) => map,
                        _ => return None,
                    }
                }
                _ => return None,
            };
            Some(NormalizedPayload::Single(apply_field_policy(map, schema)))
        }
        Arity::List => {
            let items = match value {
                Value::Array(items) => items,
                Value::Object(map) => {
                    warn!(
                        schema = schema.name,
                        "expected a list, got a single object; wrapping"
                    );
                    vec![Value::Object(map)]
                }
                _ => return None,
            };
            let items = items
                .into_iter()
                .map(|item| match item {
                    Value::Object(map) => Value::Object(apply_field_policy(map, schema)),
                    other => other,
                })
                .collect();
            Some(NormalizedPayload::List(items))
        }
    }
}

/// Applies the schema's per-field coercion policy to one mapping.
fn apply_field_policy(map: Map<String, Value>, schema: &ExtractionSchema) -> Map<String, Value> {
    map.into_iter()
        .map(|(key, value)| {
            let coerced = match (schema.field_kind(&key), &value) {
                (FieldKind::CommaJoined, Value::Array(items)) => {
                    Value::String(comma_join(items))
                }
                (FieldKind::Json, Value::Array(_)) | (FieldKind::Json, Value::Object(_)) => {
                    Value::String(value.to_string())
                }
                _ => value,
            };
            (key, coerced)
        })
        .collect()
}

fn comma_join(items: &[Value]) -> String {
    items
        .iter()
        .map(|item| match item {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

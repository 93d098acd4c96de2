//! Raw stored records.
//!
//! Collections are persisted and manipulated as JSON objects rather than typed
//! structs, so fields the typed views do not know about (or cannot parse)
//! survive every rewrite of the collection untouched.

use super::CollectionKind;
use crate::core::{Result, StoreError, is_valid_id, new_id};
use serde::Serialize;
use serde_json::{Map, Value};

pub type Document = Map<String, Value>;

/// Fields of a user that may leave the local store.
const PUBLIC_USER_FIELDS: [&str; 4] = ["name", "email", "role", "escuelaId"];

/// Serialize a record or patch into a document; anything but a JSON object is rejected.
pub fn to_document<T: Serialize>(value: &T) -> Result<Document> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::Serialization(format!(
            "expected a JSON object, got {other}"
        ))),
    }
}

/// Identity of a stored record, if it carries a usable one.
pub fn identity_of(kind: CollectionKind, record: &Value) -> Option<&str> {
    let id = record.get(kind.identity_field())?;
    if kind.id_prefix().is_some() && !is_valid_id(id) {
        return None;
    }
    id.as_str()
}

/// Ensure a record of a generated-id collection carries a valid identifier.
///
/// Returns the (possibly rewritten) record and whether it had to change.
/// Null entries become `{ "id": .. }`; numeric identifiers are kept in their
/// decimal string form; non-object values pass through untouched.
pub fn heal_identity(kind: CollectionKind, record: Value) -> (Value, bool) {
    let Some(prefix) = kind.id_prefix() else {
        return (record, false);
    };
    let field = kind.identity_field();

    match record {
        Value::Null => {
            let mut doc = Document::new();
            doc.insert(field.to_string(), Value::String(new_id(prefix)));
            (Value::Object(doc), true)
        }
        Value::Object(mut doc) => {
            let replacement = match doc.get(field) {
                Some(id) if is_valid_id(id) => None,
                Some(Value::Number(n)) => Some(n.to_string()),
                _ => Some(new_id(prefix)),
            };
            match replacement {
                Some(id) => {
                    doc.insert(field.to_string(), Value::String(id));
                    (Value::Object(doc), true)
                }
                None => (Value::Object(doc), false),
            }
        }
        other => (other, false),
    }
}

/// Heal every record of a collection; the flag reports whether any changed.
pub fn heal_all(kind: CollectionKind, records: Vec<Value>) -> (Vec<Value>, bool) {
    let mut changed = false;
    let healed = records
        .into_iter()
        .map(|record| {
            let (record, fixed) = heal_identity(kind, record);
            changed |= fixed;
            record
        })
        .collect();
    (healed, changed)
}

/// Copy of `record` without the given fields. Non-object values are returned as-is.
pub fn without_fields(record: &Value, fields: &[&str]) -> Value {
    match record {
        Value::Object(doc) => {
            let mut copy = doc.clone();
            for field in fields {
                copy.remove(*field);
            }
            Value::Object(copy)
        }
        other => other.clone(),
    }
}

/// Shallow merge: patch fields overwrite, everything else is retained.
pub fn merge_patch(target: &mut Document, patch: Document) {
    for (field, value) in patch {
        target.insert(field, value);
    }
}

/// Reduce a user record to the fields that may be exported (no credentials).
pub fn public_user(record: &Value) -> Value {
    let mut out = Document::new();
    if let Value::Object(doc) = record {
        for field in PUBLIC_USER_FIELDS {
            if let Some(value) = doc.get(field) {
                out.insert(field.to_string(), value.clone());
            }
        }
    }
    Value::Object(out)
}

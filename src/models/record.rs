//! Flat CMS records.
//!
//! A [`Record`] is what every store hands to the UI: the CMS `{id, attributes}`
//! envelope already flattened by [`crate::core::normalize`].

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// CMS primary key.
pub type RecordId = u64;

/// Untyped field map, used for write payloads and record bodies.
pub type Fields = Map<String, Value>;

/// A normalized CMS record: `{id, ...fields}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: RecordId,
    #[serde(flatten)]
    pub fields: Fields,
}

impl Record {
    pub fn new(id: RecordId) -> Self {
        Self {
            id,
            fields: Fields::new(),
        }
    }

    /// Builder-style field setter, mostly for tests and local construction.
    pub fn with(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.set(field, value);
        self
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// String field, `None` when absent or not a string.
    pub fn str(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(Value::as_str)
    }

    pub fn set(&mut self, field: &str, value: impl Into<Value>) {
        self.fields.insert(field.to_string(), value.into());
    }

    /// Id of a to-one relation field, whether it holds `{id, ...}` or a bare id.
    pub fn relation_id(&self, field: &str) -> Option<RecordId> {
        self.get(field).and_then(reference_id)
    }
}

/// Id of a relation value: `{id, ...}` or a bare id.
pub fn reference_id(value: &Value) -> Option<RecordId> {
    match value {
        Value::Object(map) => map.get("id").and_then(id_from_value),
        other => id_from_value(other),
    }
}

/// Accepts numeric ids and numeric strings.
pub fn id_from_value(value: &Value) -> Option<RecordId> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn deserialize_id<'de, D>(deserializer: D) -> Result<RecordId, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    id_from_value(&value).ok_or_else(|| de::Error::custom(format!("invalid record id: {}", value)))
}

// ============================================================================
// List splicing
// ============================================================================

/// Replace the record with the same id in place. Returns `false` if absent.
pub fn replace_by_id(list: &mut [Record], record: &Record) -> bool {
    match list.iter_mut().find(|r| r.id == record.id) {
        Some(slot) => {
            *slot = record.clone();
            true
        }
        None => false,
    }
}

/// Drop every record with `id`. Returns `true` if anything was removed.
pub fn remove_by_id(list: &mut Vec<Record>, id: RecordId) -> bool {
    let before = list.len();
    list.retain(|r| r.id != id);
    list.len() != before
}

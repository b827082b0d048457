//! Flattening of the CMS response envelope.
//!
//! The CMS wraps every entity as `{id, attributes: {...}}` and every relation
//! as `{data: ...}`. [`Node::classify`] names those shapes once; [`normalize`]
//! walks a value and flattens both, so stores and views only ever see
//! `{id, ...fields}`.

use serde_json::{Map, Value};

use crate::core::error::ApiError;
use crate::models::{Loaded, Pagination, Record};

/// Shape of a JSON value as far as the CMS envelope is concerned.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// `{id, attributes: {...}}` (optionally with `meta`).
    Entity {
        id: Value,
        attributes: Map<String, Value>,
    },
    /// `{data: <entity | [entity] | null>}` (optionally with `meta`).
    Relation(Value),
    /// Any other object, including already-flat records.
    Object(Map<String, Value>),
    List(Vec<Value>),
    Scalar(Value),
}

impl Node {
    pub fn classify(value: Value) -> Self {
        match value {
            Value::Object(mut map) => {
                if is_entity(&map) {
                    let id = map.remove("id").unwrap_or(Value::Null);
                    match map.remove("attributes") {
                        Some(Value::Object(attributes)) => Self::Entity { id, attributes },
                        // is_entity guarantees an object
                        _ => Self::Scalar(Value::Null),
                    }
                } else if is_relation(&map) {
                    Self::Relation(map.remove("data").unwrap_or(Value::Null))
                } else {
                    Self::Object(map)
                }
            }
            Value::Array(items) => Self::List(items),
            other => Self::Scalar(other),
        }
    }
}

fn is_entity(map: &Map<String, Value>) -> bool {
    map.contains_key("id")
        && map.get("attributes").is_some_and(Value::is_object)
        && map
            .keys()
            .all(|k| matches!(k.as_str(), "id" | "attributes" | "meta"))
}

fn is_relation(map: &Map<String, Value>) -> bool {
    matches!(
        map.get("data"),
        Some(Value::Object(_) | Value::Array(_) | Value::Null)
    ) && map.keys().all(|k| matches!(k.as_str(), "data" | "meta"))
}

/// Recursively flatten entities and relations.
///
/// Idempotent: a value that is already flat comes back unchanged.
pub fn normalize(value: Value) -> Value {
    match Node::classify(value) {
        Node::Entity { id, attributes } => {
            let mut flat: Map<String, Value> = attributes
                .into_iter()
                .map(|(k, v)| (k, normalize(v)))
                .collect();
            flat.insert("id".to_string(), id);
            Value::Object(flat)
        }
        Node::Relation(data) => normalize(data),
        Node::Object(map) => Value::Object(map.into_iter().map(|(k, v)| (k, normalize(v))).collect()),
        Node::List(items) => Value::Array(items.into_iter().map(normalize).collect()),
        Node::Scalar(value) => value,
    }
}

// ============================================================================
// Response envelopes
// ============================================================================

/// Top-level `{data, meta?}` response split into its parts.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub data: Value,
    pub pagination: Option<Pagination>,
}

impl Envelope {
    /// Custom endpoints sometimes return bare arrays or objects; those are
    /// taken as the data itself.
    pub fn from_response(value: Value) -> Self {
        match value {
            Value::Object(mut map) if map.contains_key("data") && is_relation(&map) => {
                let pagination = map
                    .get("meta")
                    .and_then(|meta| meta.get("pagination"))
                    .and_then(|p| serde_json::from_value(p.clone()).ok());
                Self {
                    data: map.remove("data").unwrap_or(Value::Null),
                    pagination,
                }
            }
            other => Self {
                data: other,
                pagination: None,
            },
        }
    }
}

/// Decode one record from a response (enveloped or not).
pub fn record_from_response(value: Value) -> Result<Record, ApiError> {
    let data = normalize(Envelope::from_response(value).data);
    Ok(serde_json::from_value(data)?)
}

/// Decode a list response into records plus pagination.
///
/// A single object is treated as a one-element list and `null` as empty.
pub fn records_from_response(value: Value) -> Result<Loaded<Vec<Record>>, ApiError> {
    let envelope = Envelope::from_response(value);
    let records = match normalize(envelope.data) {
        Value::Array(items) => items
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Record>, _>>()?,
        Value::Null => Vec::new(),
        single => vec![serde_json::from_value(single)?],
    };
    Ok(Loaded {
        data: records,
        pagination: envelope.pagination,
    })
}

/// Make sure a to-many relation field is a list (`[]` when absent or null).
pub fn ensure_list(record: &mut Record, field: &str) {
    let missing = match record.get(field) {
        None | Some(Value::Null) => true,
        Some(_) => false,
    };
    if missing {
        record.set(field, Value::Array(Vec::new()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn wrapped_project() -> Value {
        json!({
            "id": 42,
            "attributes": {
                "title": "Pollinator Patch",
                "hero_image": {"data": {"id": 7, "attributes": {"url": "/uploads/bee.jpg"}}},
                "featured_gallery": {"data": [
                    {"id": 8, "attributes": {"url": "/uploads/a.jpg"}},
                    {"id": 9, "attributes": {"url": "/uploads/b.jpg"}}
                ]},
                "garden": {"data": null},
                "tags": ["bees", "native"]
            }
        })
    }

    #[test]
    fn test_classify() {
        assert!(matches!(Node::classify(wrapped_project()), Node::Entity { .. }));
        assert!(matches!(
            Node::classify(json!({"data": null})),
            Node::Relation(Value::Null)
        ));
        assert!(matches!(
            Node::classify(json!({"id": 1, "title": "flat"})),
            Node::Object(_)
        ));
        // A record that merely has a string field called `data`
        assert!(matches!(
            Node::classify(json!({"data": "raw"})),
            Node::Object(_)
        ));
        assert!(matches!(Node::classify(json!([1, 2])), Node::List(_)));
        assert!(matches!(Node::classify(json!("x")), Node::Scalar(_)));
    }

    #[test]
    fn test_normalize_flattens_nested_relations() {
        let flat = normalize(wrapped_project());
        assert_eq!(
            flat,
            json!({
                "id": 42,
                "title": "Pollinator Patch",
                "hero_image": {"id": 7, "url": "/uploads/bee.jpg"},
                "featured_gallery": [
                    {"id": 8, "url": "/uploads/a.jpg"},
                    {"id": 9, "url": "/uploads/b.jpg"}
                ],
                "garden": null,
                "tags": ["bees", "native"]
            })
        );
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let once = normalize(wrapped_project());
        assert_eq!(normalize(once.clone()), once);

        let flat = json!({"id": 1, "title": "Compost Day", "garden": {"id": 2, "slug": "oak-park"}});
        assert_eq!(normalize(flat.clone()), flat);
    }

    #[test]
    fn test_outer_id_wins_over_attribute_id() {
        let value = json!({"id": 5, "attributes": {"id": 99, "name": "x"}});
        assert_eq!(normalize(value)["id"], json!(5));
    }

    #[test]
    fn test_envelope_extracts_pagination() {
        let envelope = Envelope::from_response(json!({
            "data": [],
            "meta": {"pagination": {"page": 2, "pageSize": 15, "pageCount": 4, "total": 50}}
        }));
        assert_eq!(envelope.data, json!([]));
        assert_eq!(envelope.pagination.map(|p| p.page), Some(2));

        let bare = Envelope::from_response(json!([{"id": 1}]));
        assert_eq!(bare.data, json!([{"id": 1}]));
        assert!(bare.pagination.is_none());
    }

    #[test]
    fn test_records_from_response_shapes() {
        let list = records_from_response(json!({"data": [
            {"id": 1, "attributes": {"title": "a"}},
            {"id": 2, "attributes": {"title": "b"}}
        ]}))
        .unwrap();
        assert_eq!(list.data.len(), 2);
        assert_eq!(list.data[1].str("title"), Some("b"));

        let single = records_from_response(json!({"data": {"id": 3, "attributes": {}}})).unwrap();
        assert_eq!(single.data.len(), 1);

        let empty = records_from_response(json!({"data": null})).unwrap();
        assert!(empty.data.is_empty());

        let bare = records_from_response(json!([{"id": 4, "title": "flat"}])).unwrap();
        assert_eq!(bare.data[0].id, 4);
    }

    #[test]
    fn test_record_from_response_requires_id() {
        let record = record_from_response(json!({"data": {"id": 3, "attributes": {"title": "t"}}}))
            .unwrap();
        assert_eq!(record.id, 3);
        assert!(matches!(
            record_from_response(json!({"data": {"title": "no id"}})),
            Err(ApiError::Decode(_))
        ));
    }

    #[test]
    fn test_ensure_list() {
        let mut record = Record::new(1).with("related_events", Value::Null);
        ensure_list(&mut record, "related_events");
        ensure_list(&mut record, "featured_gallery");
        assert_eq!(record.get("related_events"), Some(&json!([])));
        assert_eq!(record.get("featured_gallery"), Some(&json!([])));

        let mut kept = Record::new(2).with("featured_gallery", json!([{"id": 1}]));
        ensure_list(&mut kept, "featured_gallery");
        assert_eq!(kept.get("featured_gallery"), Some(&json!([{"id": 1}])));
    }
}

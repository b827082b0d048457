//! Shaping of write payloads before they are sent to the CMS.
//!
//! The CMS accepts relation references as `{id}` (or lists of them) and
//! rejects fields that are not in a content type's schema. Views hand stores
//! whatever they loaded, so every write goes through a [`PayloadShape`].

use serde_json::{Map, Value, json};

use crate::core::normalize::Node;
use crate::models::{Fields, id_from_value};

/// How a store's write payload is cleaned up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayloadShape {
    /// Schema whitelist; `None` keeps every field.
    pub fields: Option<&'static [&'static str]>,
    /// Relation fields whose values are reduced to `{id}` references.
    pub relations: &'static [&'static str],
    /// Date fields where an empty string means "no date".
    pub date_fields: &'static [&'static str],
}

impl PayloadShape {
    /// Keep every field; only collapse `{data: ...}` wrappers.
    pub const fn open() -> Self {
        Self {
            fields: None,
            relations: &[],
            date_fields: &[],
        }
    }

    /// Drop everything not in `fields`.
    pub const fn strict(fields: &'static [&'static str]) -> Self {
        Self {
            fields: Some(fields),
            relations: &[],
            date_fields: &[],
        }
    }

    pub const fn with_relations(mut self, relations: &'static [&'static str]) -> Self {
        self.relations = relations;
        self
    }

    pub const fn with_dates(mut self, date_fields: &'static [&'static str]) -> Self {
        self.date_fields = date_fields;
        self
    }

    /// Apply the shape to a payload.
    pub fn apply(&self, data: Fields) -> Fields {
        data.into_iter()
            .filter(|(key, _)| self.allows(key))
            .map(|(key, value)| {
                let value = if self.date_fields.contains(&key.as_str()) && value == "" {
                    Value::Null
                } else if self.relations.contains(&key.as_str()) {
                    collapse_reference(value)
                } else {
                    collapse_wrapped(value)
                };
                (key, value)
            })
            .collect()
    }

    fn allows(&self, key: &str) -> bool {
        self.fields.is_none_or(|fields| fields.contains(&key))
    }
}

impl Default for PayloadShape {
    fn default() -> Self {
        Self::open()
    }
}

/// `{data: {id, ...}}` → `{id}`, `{data: [...]}` → `[{id}, ...]`,
/// `{data: null}` → `null`. Other values pass through.
pub fn collapse_wrapped(value: Value) -> Value {
    match Node::classify(value) {
        Node::Relation(data) => references(data),
        Node::Entity { id, .. } => json!({ "id": id }),
        Node::Object(map) => Value::Object(map),
        Node::List(items) => Value::Array(items),
        Node::Scalar(value) => value,
    }
}

/// Like [`collapse_wrapped`], but also reduces populated relations
/// (`{id, title, ...}`) and bare ids to `{id}`. List entries without an id are
/// dropped.
pub fn collapse_reference(value: Value) -> Value {
    let value = match Node::classify(value) {
        Node::Relation(data) => data,
        Node::Entity { id, .. } => return json!({ "id": id }),
        Node::Object(map) => Value::Object(map),
        Node::List(items) => Value::Array(items),
        Node::Scalar(value) => value,
    };
    references(value)
}

fn references(value: Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.iter().filter_map(reference).collect()),
        Value::Null => Value::Null,
        other => reference(&other).unwrap_or(Value::Null),
    }
}

fn reference(value: &Value) -> Option<Value> {
    let id = match value {
        Value::Object(map) => map.get("id")?,
        other => other,
    };
    id_from_value(id).map(|id| {
        let mut map = Map::new();
        map.insert("id".to_string(), id.into());
        Value::Object(map)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(value: Value) -> Fields {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    #[test]
    fn test_open_shape_collapses_wrapped_relations() {
        let shaped = PayloadShape::open().apply(fields(json!({
            "title": "Bed 4",
            "hero_image": {"data": {"id": 7}},
            "gallery": {"data": [{"id": 1, "attributes": {}}, {"id": 2, "attributes": {}}]},
            "garden": {"data": null}
        })));
        assert_eq!(
            Value::Object(shaped),
            json!({
                "title": "Bed 4",
                "hero_image": {"id": 7},
                "gallery": [{"id": 1}, {"id": 2}],
                "garden": null
            })
        );
    }

    #[test]
    fn test_open_shape_leaves_flat_objects_alone() {
        let payload = json!({"location": {"lat": 1.5, "lng": 2.5}, "title": "x"});
        assert_eq!(
            Value::Object(PayloadShape::open().apply(fields(payload.clone()))),
            payload
        );
    }

    #[test]
    fn test_declared_relations_reduce_to_ids() {
        const SHAPE: PayloadShape = PayloadShape::open()
            .with_relations(&["hero_image", "related_events"])
            .with_dates(&["date_start", "date_end"]);

        let shaped = SHAPE.apply(fields(json!({
            "hero_image": {"id": 7, "url": "/uploads/x.jpg"},
            "related_events": [{"id": 3, "title": "a"}, 4, {"title": "no id"}, null],
            "date_start": "",
            "date_end": "2024-05-01"
        })));
        assert_eq!(
            Value::Object(shaped),
            json!({
                "hero_image": {"id": 7},
                "related_events": [{"id": 3}, {"id": 4}],
                "date_start": null,
                "date_end": "2024-05-01"
            })
        );
    }

    #[test]
    fn test_strict_shape_strips_unknown_fields() {
        const SHAPE: PayloadShape = PayloadShape::strict(&["title_template", "garden"]);
        let shaped = SHAPE.apply(fields(json!({
            "title_template": "Workday {n}",
            "garden": {"data": {"id": 2}},
            "createdAt": "2024-01-01",
            "id": 5
        })));
        assert_eq!(
            Value::Object(shaped),
            json!({"title_template": "Workday {n}", "garden": {"id": 2}})
        );
    }
}

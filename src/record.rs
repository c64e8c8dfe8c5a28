//! Product records and the collection they live in.
//!
//! A record is an open-ended JSON object. The only field the service
//! interprets is `id`; everything else is opaque payload echoed back as-is.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Name of the reserved identifier field.
pub const ID_FIELD: &str = "id";

/// Ordered sequence of records, in insertion order.
pub type Collection = Vec<Record>;

/// A single product: a JSON object with one reserved integer field, `id`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    /// Empty record with no fields (not even an `id`).
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a request body. Anything other than a JSON object is rejected.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        match serde_json::from_slice::<Value>(bytes)? {
            Value::Object(fields) => Ok(Self(fields)),
            other => Err(Error::Malformed(format!(
                "expected a JSON object, got {}",
                kind(&other)
            ))),
        }
    }

    /// The record's identifier, if it carries a non-negative integer `id`.
    #[must_use]
    pub fn id(&self) -> Option<u64> {
        self.0.get(ID_FIELD).and_then(Value::as_u64)
    }

    /// Assign the identifier. An existing `id` key keeps its position.
    pub fn set_id(&mut self, id: u64) {
        self.0.insert(ID_FIELD.to_owned(), Value::from(id));
    }

    /// Shallow merge: fields in `patch` overwrite ours, the rest are kept.
    /// A stray `id` in the patch is ignored.
    pub fn merge(&mut self, patch: Record) {
        for (key, value) in patch.0 {
            if key != ID_FIELD {
                self.0.insert(key, value);
            }
        }
    }

    /// Replace every field with those of `with`, keeping only our `id`.
    pub fn replace(&mut self, with: Record) {
        let mut fields = Map::with_capacity(with.0.len() + 1);
        if let Some(id) = self.0.remove(ID_FIELD) {
            fields.insert(ID_FIELD.to_owned(), id);
        }
        for (key, value) in with.0 {
            if key != ID_FIELD {
                fields.insert(key, value);
            }
        }
        self.0 = fields;
    }

    /// Look up a payload field.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Set a payload field, returning the previous value. Setting `id` this
    /// way is allowed but bypasses identifier assignment.
    pub fn insert(
        &mut self,
        field: impl Into<String>,
        value: impl Into<Value>,
    ) -> Option<Value> {
        self.0.insert(field.into(), value.into())
    }
}

impl From<Map<String, Value>> for Record {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        Value::Object(record.0)
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => Record::from(map),
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn merge_overwrites_and_keeps() {
        let mut r = record(json!({"id": 3, "name": "A", "price": 5}));
        r.merge(record(json!({"price": 9})));
        assert_eq!(Value::from(r), json!({"id": 3, "name": "A", "price": 9}));
    }

    #[test]
    fn merge_ignores_incoming_id() {
        let mut r = record(json!({"id": 3, "name": "A"}));
        r.merge(record(json!({"id": 77, "name": "B"})));
        assert_eq!(r.id(), Some(3));
        assert_eq!(r.get("name"), Some(&json!("B")));
    }

    #[test]
    fn replace_drops_unmentioned_fields() {
        let mut r = record(json!({"id": 1, "name": "A", "price": 5}));
        r.replace(record(json!({"name": "B", "id": 40})));
        assert_eq!(Value::from(r), json!({"id": 1, "name": "B"}));
    }

    #[test]
    fn set_id_keeps_field_order() {
        let mut r = Record::from_json(br#"{"id": 0, "name": "A"}"#).unwrap();
        r.set_id(12);
        assert_eq!(serde_json::to_string(&r).unwrap(), r#"{"id":12,"name":"A"}"#);

        let mut r = Record::from_json(br#"{"name": "A"}"#).unwrap();
        r.set_id(12);
        assert_eq!(serde_json::to_string(&r).unwrap(), r#"{"name":"A","id":12}"#);
    }

    #[test]
    fn from_json_requires_object() {
        assert!(Record::from_json(b"{not json").is_err());
        assert!(Record::from_json(b"[1, 2]").is_err());
        assert!(Record::from_json(b"42").is_err());
        assert!(Record::from_json(b"").is_err());
        assert!(Record::from_json(b"{}").is_ok());
    }

    #[test]
    fn id_rejects_non_integers() {
        assert_eq!(record(json!({"id": "7"})).id(), None);
        assert_eq!(record(json!({"id": -1})).id(), None);
        assert_eq!(record(json!({"id": 1.5})).id(), None);
        assert_eq!(record(json!({"name": "x"})).id(), None);
    }
}

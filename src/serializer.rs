//! Serialization layer for the backing document. JSON via serde_json.
//!
//! Implement [`Serializer`] if you need the collection in a different format.

use crate::error::{Error, Result};
use crate::record::{Collection, Record};

/// Converts collection snapshots to/from bytes for persistence.
pub trait Serializer: Send + Sync {
    /// Encode the records to bytes.
    fn serialize(&self, records: &[Record]) -> Result<Vec<u8>>;

    /// Decode bytes back into a collection.
    fn deserialize(&self, bytes: &[u8]) -> Result<Collection>;
}

/// JSON serializer with optional pretty-printing.
#[derive(Debug, Clone, Default)]
pub struct JsonSerializer {
    pretty: bool,
}

impl JsonSerializer {
    /// Compact JSON (single line, no extra whitespace).
    pub fn new() -> Self {
        Self::default()
    }

    /// Indented JSON, two spaces per level. This is what lands on disk unless
    /// the store is configured otherwise.
    pub fn pretty() -> Self {
        Self { pretty: true }
    }
}

impl Serializer for JsonSerializer {
    fn serialize(&self, records: &[Record]) -> Result<Vec<u8>> {
        let bytes = if self.pretty {
            serde_json::to_vec_pretty(records)
        } else {
            serde_json::to_vec(records)
        };
        bytes.map_err(Error::from)
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<Collection> {
        serde_json::from_slice(bytes).map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pretty_output_is_indented() {
        let records = vec![Record::from_json(br#"{"id":1,"name":"A"}"#).unwrap()];
        let out = JsonSerializer::pretty().serialize(&records).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "[\n  {\n    \"id\": 1,\n    \"name\": \"A\"\n  }\n]");
    }

    #[test]
    fn empty_collection_compact() {
        let out = JsonSerializer::new().serialize(&[]).unwrap();
        assert_eq!(out, b"[]");
    }

    #[test]
    fn rejects_non_array_documents() {
        let ser = JsonSerializer::new();
        assert!(matches!(ser.deserialize(b"{}"), Err(Error::Malformed(_))));
        assert!(matches!(ser.deserialize(b"[1]"), Err(Error::Malformed(_))));
        assert!(matches!(ser.deserialize(b"[{"), Err(Error::Malformed(_))));
        assert_eq!(ser.deserialize(b"[]").unwrap(), Vec::<Record>::new());
    }
}

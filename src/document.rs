// src/document.rs
use rand::Rng;
use serde_json::{Map, Value};

/// A schema-less document: field name -> JSON value. Stored documents
/// always carry a server-generated string `_id`.
pub type Document = Map<String, Value>;

/// Generate a document id: nanoseconds since the Unix epoch, a dash,
/// and a random decimal in [0, 1e6). Roughly monotonic, unique enough
/// for concurrent inserts.
pub fn generate_id() -> String {
    let nanos = chrono::Utc::now()
        .timestamp_nanos_opt()
        .unwrap_or_default();
    let salt = rand::thread_rng().gen_range(0..1_000_000);
    format!("{}-{}", nanos, salt)
}

/// Read a document's `_id`, if stamped.
pub fn doc_id(doc: &Document) -> Option<&str> {
    doc.get("_id").and_then(Value::as_str)
}

// src/query/planner.rs
// Decide whether a find can be answered from an index. Only a
// single-entry predicate with no logical operators on an indexed field
// qualifies; everything else is a full scan. The index path trusts the
// tree and does not re-check the predicate on returned documents.

use serde_json::{Map, Value};

use super::match_document;
use crate::document::Document;
use crate::index::encode_key;
use crate::storage::Collection;

#[derive(Debug, Clone)]
pub enum QueryPlan {
    /// Evaluate the predicate against every document.
    FullScan,
    /// Exact-key lookup.
    Point { field: String, key: Vec<u8> },
    /// Leaf-chain walk between optional bounds.
    Range {
        field: String,
        start: Option<Vec<u8>>,
        end: Option<Vec<u8>>,
        include_start: bool,
        include_end: bool,
    },
    /// One point lookup per key, concatenated.
    MultiPoint { field: String, keys: Vec<Vec<u8>> },
}

pub fn plan_query(query: &Map<String, Value>, collection: &Collection) -> QueryPlan {
    if query.len() != 1 || query.contains_key("$or") || query.contains_key("$and") {
        return QueryPlan::FullScan;
    }

    let Some((field, condition)) = query.iter().next() else {
        return QueryPlan::FullScan;
    };
    if !collection.has_index(field) {
        return QueryPlan::FullScan;
    }

    match condition {
        Value::String(_) | Value::Number(_) | Value::Bool(_) => QueryPlan::Point {
            field: field.clone(),
            key: encode_key(condition),
        },
        Value::Object(operators) => {
            // First supported operator wins; anything else keeps the
            // strict full-scan semantics.
            if let Some(bound) = operators.get("$gt") {
                QueryPlan::Range {
                    field: field.clone(),
                    start: Some(encode_key(bound)),
                    end: None,
                    include_start: false,
                    include_end: false,
                }
            } else if let Some(bound) = operators.get("$lt") {
                QueryPlan::Range {
                    field: field.clone(),
                    start: None,
                    end: Some(encode_key(bound)),
                    include_start: false,
                    include_end: false,
                }
            } else if let Some(operand) = operators.get("$eq") {
                QueryPlan::Point {
                    field: field.clone(),
                    key: encode_key(operand),
                }
            } else if let Some(Value::Array(candidates)) = operators.get("$in") {
                QueryPlan::MultiPoint {
                    field: field.clone(),
                    keys: candidates.iter().map(encode_key).collect(),
                }
            } else {
                QueryPlan::FullScan
            }
        }
        _ => QueryPlan::FullScan,
    }
}

/// Run a find against a collection snapshot the caller holds a read
/// lock on.
pub fn execute_find(collection: &Collection, query: &Map<String, Value>) -> Vec<Document> {
    match plan_query(query, collection) {
        QueryPlan::FullScan => collection
            .all()
            .into_iter()
            .filter(|doc| match_document(doc, query))
            .collect(),
        QueryPlan::Point { field, key } => {
            let ids = match collection.get_index(&field) {
                Some(tree) => tree.search(&key),
                None => Vec::new(),
            };
            fetch_documents(collection, ids)
        }
        QueryPlan::Range {
            field,
            start,
            end,
            include_start,
            include_end,
        } => {
            let ids = match collection.get_index(&field) {
                Some(tree) => tree.range_search(
                    start.as_deref(),
                    end.as_deref(),
                    include_start,
                    include_end,
                ),
                None => Vec::new(),
            };
            fetch_documents(collection, ids)
        }
        QueryPlan::MultiPoint { field, keys } => {
            let ids = match collection.get_index(&field) {
                Some(tree) => tree.search_in(&keys),
                None => Vec::new(),
            };
            fetch_documents(collection, ids)
        }
    }
}

fn fetch_documents(collection: &Collection, ids: Vec<Vec<u8>>) -> Vec<Document> {
    ids.into_iter()
        .filter_map(|raw| String::from_utf8(raw).ok())
        .filter_map(|id| collection.get_by_id(&id))
        .collect()
}

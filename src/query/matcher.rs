// src/query/matcher.rs
// Evaluate a JSON-shaped predicate against one document. A top-level
// `$or` (checked first) or `$and` suppresses any sibling entries;
// otherwise every entry is field -> condition with AND semantics.

use serde_json::{Map, Value};

use crate::document::Document;

pub fn match_document(doc: &Document, query: &Map<String, Value>) -> bool {
    if query.is_empty() {
        return true;
    }

    if let Some(conditions) = query.get("$or") {
        return match_or(doc, conditions);
    }
    if let Some(conditions) = query.get("$and") {
        return match_and(doc, conditions);
    }

    query
        .iter()
        .all(|(field, condition)| match_field(doc, field, condition))
}

/// A field condition is either a comparator map (all operators must
/// hold) or a literal compared with deep equality. A missing field
/// never matches.
fn match_field(doc: &Document, field: &str, condition: &Value) -> bool {
    let Some(field_value) = doc.get(field) else {
        return false;
    };

    if let Value::Object(operators) = condition {
        return operators
            .iter()
            .all(|(op, operand)| apply_operator(field_value, op, operand));
    }

    compare_eq(field_value, condition)
}

fn apply_operator(field_value: &Value, operator: &str, operand: &Value) -> bool {
    match operator {
        "$eq" => compare_eq(field_value, operand),
        "$gt" => compare_numeric(field_value, operand, |a, b| a > b),
        "$lt" => compare_numeric(field_value, operand, |a, b| a < b),
        "$like" => compare_like(field_value, operand),
        "$in" => compare_in(field_value, operand),
        other => {
            log::warn!("unknown operator {}", other);
            false
        }
    }
}

fn compare_eq(field_value: &Value, operand: &Value) -> bool {
    field_value == operand
}

/// Both sides must coerce to a double; mismatched types fail the
/// comparison rather than erroring.
fn compare_numeric(field_value: &Value, operand: &Value, cmp: fn(f64, f64) -> bool) -> bool {
    match (field_value.as_f64(), operand.as_f64()) {
        (Some(a), Some(b)) => cmp(a, b),
        _ => false,
    }
}

fn compare_in(field_value: &Value, operand: &Value) -> bool {
    match operand {
        Value::Array(candidates) => candidates.iter().any(|c| c == field_value),
        _ => false,
    }
}

/// `%` matches any substring (including empty), `_` exactly one
/// character; the pattern is anchored at both ends.
fn compare_like(field_value: &Value, pattern: &Value) -> bool {
    match (field_value, pattern) {
        (Value::String(text), Value::String(pattern)) => {
            like_match(text.as_bytes(), pattern.as_bytes())
        }
        _ => false,
    }
}

fn like_match(text: &[u8], pattern: &[u8]) -> bool {
    if pattern.is_empty() {
        return text.is_empty();
    }

    if pattern[0] == b'%' {
        let mut rest = pattern;
        while let Some((&b'%', tail)) = rest.split_first() {
            rest = tail;
        }
        if rest.is_empty() {
            return true;
        }
        (0..=text.len()).any(|i| like_match(&text[i..], rest))
    } else if text.is_empty() {
        false
    } else if pattern[0] == b'_' || pattern[0] == text[0] {
        like_match(&text[1..], &pattern[1..])
    } else {
        false
    }
}

/// Any object sub-predicate matching suffices; non-object entries are
/// skipped. A non-sequence operand never matches.
fn match_or(doc: &Document, conditions: &Value) -> bool {
    let Value::Array(conditions) = conditions else {
        return false;
    };
    conditions.iter().any(|condition| match condition {
        Value::Object(sub) => match_document(doc, sub),
        _ => false,
    })
}

/// Every sub-predicate must match and every entry must be an object.
fn match_and(doc: &Document, conditions: &Value) -> bool {
    let Value::Array(conditions) = conditions else {
        return false;
    };
    conditions.iter().all(|condition| match condition {
        Value::Object(sub) => match_document(doc, sub),
        _ => false,
    })
}

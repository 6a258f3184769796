// src/server/wire.rs
// Request/response envelopes. The stream carries bare JSON objects in
// both directions; responses are written with a trailing newline.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::document::Document;

pub const CMD_INSERT: &str = "insert";
pub const CMD_FIND: &str = "find";
pub const CMD_DELETE: &str = "delete";
pub const CMD_CREATE_INDEX: &str = "create_index";

pub const STATUS_SUCCESS: &str = "success";
pub const STATUS_ERROR: &str = "error";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Request {
    #[serde(default)]
    pub database: String,
    #[serde(rename = "operation", default)]
    pub command: String,
    /// Documents to insert; insert only.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub data: Vec<Document>,
    /// Predicate for find/delete, field selector for create_index.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub query: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<Document>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
}

impl Response {
    pub fn error(message: impl Into<String>) -> Response {
        Response {
            status: STATUS_ERROR.to_string(),
            message: Some(message.into()),
            data: None,
            count: None,
        }
    }

    pub fn success(message: Option<String>, data: Option<Vec<Document>>, count: Option<usize>) -> Response {
        Response {
            status: STATUS_SUCCESS.to_string(),
            message,
            data,
            count,
        }
    }

    pub fn is_error(&self) -> bool {
        self.status == STATUS_ERROR
    }
}

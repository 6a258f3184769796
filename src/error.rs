// src/error.rs
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("index on field '{0}' already exists")]
    IndexExists(String),

    #[error("index on field '{0}' does not exist")]
    IndexMissing(String),

    #[error("corrupt index file: {0}")]
    CorruptIndex(String),

    #[error("write queue is shut down")]
    QueueClosed,
}

pub type Result<T> = std::result::Result<T, DbError>;

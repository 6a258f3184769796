// src/lib.rs
// docstore: embedded document database. Collections persist as JSON
// maps, secondary lookups go through on-disk B+ tree indexes, and a
// newline-delimited JSON protocol serves them over TCP.

pub mod config;
pub mod document;
pub mod error;
pub mod index;
pub mod query;
pub mod server;
pub mod storage;

// Public exports
pub use config::Config;
pub use document::{generate_id, Document};
pub use error::{DbError, Result};
pub use index::{encode_key, BTree, IndexFile};
pub use query::{execute_find, match_document};
pub use server::wire::{Request, Response};
pub use server::TcpServer;
pub use storage::{Collection, CollectionManager, Engine, WriteOutcome};

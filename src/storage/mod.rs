// src/storage/mod.rs
// Collection engine: document map, per-collection indexes, persistence,
// and the manager that serializes writes through a single worker.

pub mod collection;
pub mod docmap;
pub mod manager;
pub mod persistence;

pub use collection::Collection;
pub use docmap::DocMap;
pub use manager::{CollectionManager, Engine, WriteOutcome, WriteResult};
pub use persistence::load_collection;

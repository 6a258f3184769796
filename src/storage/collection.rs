// src/storage/collection.rs
// A named collection: the document map plus one B+ tree per indexed
// field. All mutation here assumes the caller holds the collection's
// write lock; the manager enforces that through the write queue.

use std::collections::HashMap;
use std::path::PathBuf;

use crate::document::{doc_id, generate_id, Document};
use crate::error::{DbError, Result};
use crate::index::{encode_key, BTree};

/// Tree order used for rebuilds and request-created indexes.
pub const DEFAULT_INDEX_ORDER: usize = 64;

pub struct Collection {
    pub(crate) name: String,
    pub(crate) data_dir: PathBuf,
    pub(crate) data: super::DocMap,
    pub(crate) indexes: HashMap<String, BTree>,
}

impl Collection {
    pub fn new(name: impl Into<String>, data_dir: impl Into<PathBuf>) -> Self {
        Collection {
            name: name.into(),
            data_dir: data_dir.into(),
            data: super::DocMap::new(),
            indexes: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Insert a document: stamp a fresh `_id`, feed every active index
    /// whose field the document carries, then store it. Returns the id.
    pub fn insert(&mut self, mut doc: Document) -> String {
        let id = generate_id();
        doc.insert("_id".to_string(), serde_json::Value::String(id.clone()));

        for (field, tree) in &mut self.indexes {
            if let Some(value) = doc.get(field.as_str()) {
                tree.insert(encode_key(value), id.clone().into_bytes());
            }
        }

        self.data.put(id.clone(), doc);
        id
    }

    /// Delete one document by id, unhooking it from every index that
    /// carries its field. Returns false when the id is unknown.
    pub fn delete_by_id(&mut self, id: &str) -> bool {
        let Some(doc) = self.data.get(id) else {
            return false;
        };
        let doc = doc.clone();

        for (field, tree) in &mut self.indexes {
            if let Some(value) = doc.get(field.as_str()) {
                tree.delete(&encode_key(value), id.as_bytes());
            }
        }

        self.data.remove(id)
    }

    pub fn get_by_id(&self, id: &str) -> Option<Document> {
        self.data.get(id).cloned()
    }

    /// Snapshot of every stored document.
    pub fn all(&self) -> Vec<Document> {
        self.data.items().into_iter().map(|(_, doc)| doc).collect()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn has_index(&self, field: &str) -> bool {
        self.indexes.contains_key(field)
    }

    pub fn get_index(&self, field: &str) -> Option<&BTree> {
        self.indexes.get(field)
    }

    pub fn index_fields(&self) -> Vec<String> {
        self.indexes.keys().cloned().collect()
    }

    /// Create an index on a field by scanning every document, then
    /// persist it. Errors when the field is already indexed.
    pub fn create_index(&mut self, field: &str, order: usize) -> Result<()> {
        if self.indexes.contains_key(field) {
            return Err(DbError::IndexExists(field.to_string()));
        }

        let tree = self.build_index(field, order);
        self.indexes.insert(field.to_string(), tree);
        self.save_index(field)
    }

    /// Discard and rebuild every active index from the current
    /// documents, persisting each rebuilt tree.
    pub fn rebuild_all_indexes(&mut self) -> Result<()> {
        let fields = self.index_fields();
        self.indexes.clear();

        for field in fields {
            let tree = self.build_index(&field, DEFAULT_INDEX_ORDER);
            self.indexes.insert(field.clone(), tree);
            self.save_index(&field)?;
        }
        Ok(())
    }

    fn build_index(&self, field: &str, order: usize) -> BTree {
        let mut tree = BTree::new(order);
        for (_, doc) in self.data.items() {
            let Some(id) = doc_id(&doc) else {
                continue;
            };
            if let Some(value) = doc.get(field) {
                tree.insert(encode_key(value), id.as_bytes().to_vec());
            }
        }
        tree
    }
}

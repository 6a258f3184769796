// src/storage/persistence.rs
// On-disk layout: `<data_dir>/<collection>.json` holds the document
// map as a JSON object `_id -> document`; each index lives at
// `<data_dir>/indexes/<collection>_<field>.idx`. Files are written to
// a temp path and renamed into place so a crash mid-write cannot leave
// a truncated file.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use super::{Collection, DocMap};
use crate::error::{DbError, Result};
use crate::index::IndexFile;

const INDEX_EXT: &str = "idx";

/// Load a collection from disk. A missing, empty, or whitespace-only
/// file yields an empty collection.
pub fn load_collection(data_dir: &Path, name: &str) -> Result<Collection> {
    let mut collection = Collection::new(name, data_dir);
    let path = collection.data_path();
    if !path.exists() {
        return Ok(collection);
    }

    let raw = fs::read_to_string(&path)?;
    if raw.trim().is_empty() {
        return Ok(collection);
    }

    let parsed: Map<String, Value> = serde_json::from_str(&raw)?;
    let mut map = DocMap::new();
    for (id, value) in parsed {
        if let Value::Object(doc) = value {
            map.put(id, doc);
        }
    }
    collection.data = map;
    Ok(collection)
}

impl Collection {
    pub(crate) fn data_path(&self) -> PathBuf {
        self.data_dir.join(format!("{}.json", self.name))
    }

    fn index_path(&self, field: &str) -> PathBuf {
        self.data_dir
            .join("indexes")
            .join(format!("{}_{}.{}", self.name, field, INDEX_EXT))
    }

    /// Persist the document map as one JSON object.
    pub fn save(&self) -> Result<()> {
        let mut out = Map::new();
        for (id, doc) in self.data.items() {
            out.insert(id, Value::Object(doc));
        }
        let payload = serde_json::to_string_pretty(&Value::Object(out))?;

        fs::create_dir_all(&self.data_dir)?;
        write_atomic(&self.data_path(), payload.as_bytes())
    }

    /// Persist one index as a breadth-first node snapshot.
    pub fn save_index(&self, field: &str) -> Result<()> {
        let tree = self
            .indexes
            .get(field)
            .ok_or_else(|| DbError::IndexMissing(field.to_string()))?;

        let path = self.index_path(field);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let payload = serde_json::to_string_pretty(&IndexFile::from_tree(tree, field))?;
        write_atomic(&path, payload.as_bytes())
    }

    pub fn save_all_indexes(&self) -> Result<()> {
        for field in self.indexes.keys() {
            self.save_index(field)?;
        }
        Ok(())
    }

    /// Load one index file if it exists; a missing file is not an error.
    pub fn load_index(&mut self, field: &str) -> Result<()> {
        let path = self.index_path(field);
        if !path.exists() {
            return Ok(());
        }

        let raw = fs::read_to_string(&path)?;
        let file: IndexFile = serde_json::from_str(&raw)?;
        self.indexes.insert(field.to_string(), file.into_tree()?);
        Ok(())
    }

    /// Scan the index directory for this collection's `.idx` files and
    /// load each; the field name is the segment between the collection
    /// prefix and the extension.
    pub fn load_all_indexes(&mut self) -> Result<()> {
        let index_dir = self.data_dir.join("indexes");
        if !index_dir.exists() {
            return Ok(());
        }

        let prefix = format!("{}_", self.name);
        let mut fields = Vec::new();
        for entry in fs::read_dir(&index_dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                continue;
            };
            let Some(stem) = name.strip_suffix(&format!(".{}", INDEX_EXT)) else {
                continue;
            };
            if let Some(field) = stem.strip_prefix(&prefix) {
                if !field.is_empty() {
                    fields.push(field.to_string());
                }
            }
        }

        for field in fields {
            self.load_index(&field)?;
        }
        Ok(())
    }
}

fn write_atomic(path: &Path, payload: &[u8]) -> Result<()> {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, payload)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn user(name: &str, age: i64) -> crate::document::Document {
        let mut doc = crate::document::Document::new();
        doc.insert("name".to_string(), json!(name));
        doc.insert("age".to_string(), json!(age));
        doc
    }

    #[test]
    fn test_missing_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let coll = load_collection(dir.path(), "users").unwrap();
        assert!(coll.is_empty());
    }

    #[test]
    fn test_blank_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("users.json"), "  \n\t ").unwrap();
        let coll = load_collection(dir.path(), "users").unwrap();
        assert!(coll.is_empty());
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let mut coll = Collection::new("users", dir.path());
        let a = coll.insert(user("alice", 30));
        let b = coll.insert(user("bob", 25));
        coll.save().unwrap();

        let reloaded = load_collection(dir.path(), "users").unwrap();
        assert_eq!(reloaded.len(), 2);
        assert_eq!(reloaded.get_by_id(&a).unwrap()["name"], json!("alice"));
        assert_eq!(reloaded.get_by_id(&b).unwrap()["age"], json!(25));
    }

    #[test]
    fn test_garbage_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("users.json"), "{not json").unwrap();
        assert!(load_collection(dir.path(), "users").is_err());
    }

    #[test]
    fn test_index_files_round_trip() {
        let dir = TempDir::new().unwrap();
        let mut coll = Collection::new("users", dir.path());
        coll.insert(user("alice", 30));
        coll.insert(user("bob", 25));
        coll.create_index("age", 4).unwrap();
        coll.save().unwrap();

        assert!(dir.path().join("indexes").join("users_age.idx").exists());

        let mut reloaded = load_collection(dir.path(), "users").unwrap();
        reloaded.load_all_indexes().unwrap();
        assert!(reloaded.has_index("age"));

        let tree = reloaded.get_index("age").unwrap();
        assert_eq!(
            tree.search(&crate::index::encode_key(&json!(30))).len(),
            1
        );
    }

    #[test]
    fn test_load_all_indexes_ignores_foreign_files() {
        let dir = TempDir::new().unwrap();
        let index_dir = dir.path().join("indexes");
        fs::create_dir_all(&index_dir).unwrap();
        fs::write(index_dir.join("orders_total.idx"), "{}").unwrap();
        fs::write(index_dir.join("users_age.notidx"), "{}").unwrap();

        let mut coll = Collection::new("users", dir.path());
        coll.load_all_indexes().unwrap();
        assert!(coll.index_fields().is_empty());
    }
}

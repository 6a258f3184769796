// src/server/dispatch.rs
// Route a decoded request to its command handler. Writes go through
// the engine's queue; find reads the collection directly under its
// read lock.

use super::wire::{
    Request, Response, CMD_CREATE_INDEX, CMD_DELETE, CMD_FIND, CMD_INSERT,
};
use crate::document::doc_id;
use crate::query::{execute_find, match_document};
use crate::storage::collection::DEFAULT_INDEX_ORDER;
use crate::storage::{Engine, WriteOutcome};

pub fn handle_request(engine: &Engine, req: &Request) -> Response {
    if req.database.is_empty() {
        return Response::error("database name is required");
    }

    match req.command.as_str() {
        CMD_INSERT => handle_insert(engine, req),
        CMD_FIND => handle_find(engine, req),
        CMD_DELETE => handle_delete(engine, req),
        CMD_CREATE_INDEX => handle_create_index(engine, req),
        other => Response::error(format!("unknown command: {}", other)),
    }
}

fn handle_insert(engine: &Engine, req: &Request) -> Response {
    if req.data.is_empty() {
        return Response::error("no data provided for insert");
    }

    let docs = req.data.clone();
    let result = engine.enqueue_write(&req.database, move |coll| {
        let mut inserted_ids = Vec::with_capacity(docs.len());
        for doc in docs {
            inserted_ids.push(coll.insert(doc));
        }

        coll.save()
            .map_err(|e| format!("failed to save data: {}", e))?;
        coll.save_all_indexes()
            .map_err(|e| format!("failed to save indexes: {}", e))?;

        let message = format!("Inserted {} document(s)", inserted_ids.len());
        Ok(WriteOutcome {
            inserted_ids,
            message,
            ..WriteOutcome::default()
        })
    });

    match result {
        Ok(outcome) => Response::success(
            Some(outcome.message),
            None,
            Some(outcome.inserted_ids.len()),
        ),
        Err(message) => Response::error(message),
    }
}

fn handle_find(engine: &Engine, req: &Request) -> Response {
    let collection = match engine.collection(&req.database) {
        Ok(collection) => collection,
        Err(e) => return Response::error(format!("failed to load database: {}", e)),
    };

    let guard = collection.read();
    let results = execute_find(&guard, &req.query);
    let count = results.len();
    Response::success(None, Some(results), Some(count))
}

fn handle_delete(engine: &Engine, req: &Request) -> Response {
    let query = req.query.clone();
    let result = engine.enqueue_write(&req.database, move |coll| {
        let mut deleted = 0;
        for doc in coll.all() {
            if !match_document(&doc, &query) {
                continue;
            }
            if let Some(id) = doc_id(&doc) {
                if coll.delete_by_id(id) {
                    deleted += 1;
                }
            }
        }

        if deleted > 0 {
            coll.save()
                .map_err(|e| format!("failed to save changes: {}", e))?;
            coll.rebuild_all_indexes()
                .map_err(|e| format!("failed to rebuild indexes: {}", e))?;
        }

        Ok(WriteOutcome {
            deleted,
            message: format!("Deleted {} document(s)", deleted),
            ..WriteOutcome::default()
        })
    });

    match result {
        Ok(outcome) => Response::success(Some(outcome.message), None, Some(outcome.deleted)),
        Err(message) => Response::error(message),
    }
}

fn handle_create_index(engine: &Engine, req: &Request) -> Response {
    let Some(field) = req.query.keys().next().cloned() else {
        return Response::error("field name required in query");
    };

    let result = engine.enqueue_write(&req.database, move |coll| {
        coll.create_index(&field, DEFAULT_INDEX_ORDER)
            .map_err(|e| format!("failed to create index: {}", e))?;
        Ok(WriteOutcome {
            message: format!("Index created on field '{}'", field),
            ..WriteOutcome::default()
        })
    });

    match result {
        Ok(outcome) => Response::success(Some(outcome.message), None, None),
        Err(message) => Response::error(message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn request(value: serde_json::Value) -> Request {
        serde_json::from_value(value).unwrap()
    }

    fn engine() -> (TempDir, Engine) {
        let dir = TempDir::new().unwrap();
        let engine = Engine::new(dir.path());
        (dir, engine)
    }

    #[test]
    fn test_database_name_is_required() {
        let (_dir, engine) = engine();
        let resp = handle_request(&engine, &request(json!({"operation": "find"})));
        assert!(resp.is_error());
        assert_eq!(resp.message.unwrap(), "database name is required");
    }

    #[test]
    fn test_unknown_command() {
        let (_dir, engine) = engine();
        let resp = handle_request(
            &engine,
            &request(json!({"database": "users", "operation": "upsert"})),
        );
        assert!(resp.is_error());
        assert_eq!(resp.message.unwrap(), "unknown command: upsert");
    }

    #[test]
    fn test_insert_requires_data() {
        let (_dir, engine) = engine();
        let resp = handle_request(
            &engine,
            &request(json!({"database": "users", "operation": "insert"})),
        );
        assert!(resp.is_error());
        assert_eq!(resp.message.unwrap(), "no data provided for insert");
    }

    #[test]
    fn test_insert_then_find() {
        let (_dir, engine) = engine();
        let resp = handle_request(
            &engine,
            &request(json!({
                "database": "users",
                "operation": "insert",
                "data": [{"name": "a", "age": 20}]
            })),
        );
        assert_eq!(resp.status, "success");
        assert_eq!(resp.count, Some(1));
        assert_eq!(resp.message.unwrap(), "Inserted 1 document(s)");

        let resp = handle_request(
            &engine,
            &request(json!({"database": "users", "operation": "find", "query": {}})),
        );
        assert_eq!(resp.count, Some(1));
        let docs = resp.data.unwrap();
        assert_eq!(docs[0]["name"], json!("a"));
        let id = docs[0]["_id"].as_str().unwrap();
        let mut halves = id.splitn(2, '-');
        assert!(halves.next().unwrap().chars().all(|c| c.is_ascii_digit()));
        assert!(halves.next().unwrap().chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_delete_with_predicate() {
        let (_dir, engine) = engine();
        handle_request(
            &engine,
            &request(json!({
                "database": "users",
                "operation": "insert",
                "data": [{"age": 10}, {"age": 20}, {"age": 30}]
            })),
        );

        let resp = handle_request(
            &engine,
            &request(json!({
                "database": "users",
                "operation": "delete",
                "query": {"age": {"$gt": 15}}
            })),
        );
        assert_eq!(resp.count, Some(2));
        assert_eq!(resp.message.unwrap(), "Deleted 2 document(s)");

        let resp = handle_request(
            &engine,
            &request(json!({"database": "users", "operation": "find", "query": {}})),
        );
        assert_eq!(resp.count, Some(1));
    }

    #[test]
    fn test_delete_nothing_matches() {
        let (_dir, engine) = engine();
        handle_request(
            &engine,
            &request(json!({
                "database": "users",
                "operation": "insert",
                "data": [{"age": 10}]
            })),
        );
        let resp = handle_request(
            &engine,
            &request(json!({
                "database": "users",
                "operation": "delete",
                "query": {"age": 99}
            })),
        );
        assert_eq!(resp.status, "success");
        assert_eq!(resp.count, Some(0));
    }

    #[test]
    fn test_create_index_and_duplicate() {
        let (_dir, engine) = engine();
        let resp = handle_request(
            &engine,
            &request(json!({
                "database": "users",
                "operation": "create_index",
                "query": {"age": 1}
            })),
        );
        assert_eq!(resp.status, "success");
        assert_eq!(resp.message.unwrap(), "Index created on field 'age'");

        let resp = handle_request(
            &engine,
            &request(json!({
                "database": "users",
                "operation": "create_index",
                "query": {"age": 1}
            })),
        );
        assert!(resp.is_error());
        assert!(resp.message.unwrap().contains("already exists"));
    }

    #[test]
    fn test_create_index_requires_field() {
        let (_dir, engine) = engine();
        let resp = handle_request(
            &engine,
            &request(json!({
                "database": "users",
                "operation": "create_index",
                "query": {}
            })),
        );
        assert!(resp.is_error());
        assert_eq!(resp.message.unwrap(), "field name required in query");
    }

    #[test]
    fn test_indexed_find_after_insert() {
        let (_dir, engine) = engine();
        handle_request(
            &engine,
            &request(json!({
                "database": "users",
                "operation": "create_index",
                "query": {"age": 1}
            })),
        );
        handle_request(
            &engine,
            &request(json!({
                "database": "users",
                "operation": "insert",
                "data": [{"age": 10}, {"age": 20}, {"age": 30}]
            })),
        );

        let resp = handle_request(
            &engine,
            &request(json!({
                "database": "users",
                "operation": "find",
                "query": {"age": {"$gt": 15}}
            })),
        );
        assert_eq!(resp.count, Some(2));
    }
}

// src/storage/manager.rs
// Collection cache plus the write queue: one background worker drains
// write jobs in enqueue order and is the only code path that takes a
// collection's write lock, so writes against a collection are strictly
// serialized while reads share the read lock.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use crossbeam::channel;
use parking_lot::{Mutex, RwLock};

use super::{load_collection, Collection};
use crate::error::Result;

const WRITE_QUEUE_SIZE: usize = 100;

/// One collection instance per name per engine. On a cache miss the
/// collection file and all of its index files are loaded.
pub struct CollectionManager {
    data_dir: PathBuf,
    collections: Mutex<HashMap<String, Arc<RwLock<Collection>>>>,
}

impl CollectionManager {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        CollectionManager {
            data_dir: data_dir.into(),
            collections: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(&self, name: &str) -> Result<Arc<RwLock<Collection>>> {
        let mut cache = self.collections.lock();
        if let Some(collection) = cache.get(name) {
            return Ok(collection.clone());
        }

        let mut collection = load_collection(&self.data_dir, name)?;
        collection.load_all_indexes()?;

        let collection = Arc::new(RwLock::new(collection));
        cache.insert(name.to_string(), collection.clone());
        Ok(collection)
    }
}

/// What a completed write job reports back.
#[derive(Debug, Default)]
pub struct WriteOutcome {
    pub inserted_ids: Vec<String>,
    pub deleted: usize,
    pub message: String,
}

/// Write jobs reply with an outcome or a human-readable failure that
/// goes straight into an error response.
pub type WriteResult = std::result::Result<WriteOutcome, String>;

type WriteOp = Box<dyn FnOnce(&mut Collection) -> WriteResult + Send>;

struct WriteJob {
    collection: String,
    op: WriteOp,
    reply: channel::Sender<WriteResult>,
}

/// Handle on the whole database: collection cache plus the write
/// queue feeding the single worker. Cheap to clone; every connection
/// thread holds one.
#[derive(Clone)]
pub struct Engine {
    manager: Arc<CollectionManager>,
    queue: channel::Sender<WriteJob>,
}

impl Engine {
    pub fn new(data_dir: impl Into<PathBuf>) -> Engine {
        let manager = Arc::new(CollectionManager::new(data_dir));
        let (queue, jobs) = channel::bounded::<WriteJob>(WRITE_QUEUE_SIZE);

        let worker_manager = manager.clone();
        thread::spawn(move || write_worker(worker_manager, jobs));

        Engine { manager, queue }
    }

    /// Read path: resolve a collection through the cache.
    pub fn collection(&self, name: &str) -> Result<Arc<RwLock<Collection>>> {
        self.manager.get(name)
    }

    /// Enqueue a write job and wait for its reply. Blocks while the
    /// queue is full; that back-pressure is the only admission control.
    pub fn enqueue_write<F>(&self, collection: &str, op: F) -> WriteResult
    where
        F: FnOnce(&mut Collection) -> WriteResult + Send + 'static,
    {
        let (reply, receipt) = channel::bounded(1);
        let job = WriteJob {
            collection: collection.to_string(),
            op: Box::new(op),
            reply,
        };

        if self.queue.send(job).is_err() {
            return Err("write queue is shut down".to_string());
        }
        match receipt.recv() {
            Ok(result) => result,
            Err(_) => Err("write worker dropped the job".to_string()),
        }
    }
}

/// Drains jobs until every engine handle is gone. The worker takes the
/// collection write lock around the operation, so index updates are
/// always sequenced with the document mutation that triggered them.
fn write_worker(manager: Arc<CollectionManager>, jobs: channel::Receiver<WriteJob>) {
    for job in jobs.iter() {
        let result = match manager.get(&job.collection) {
            Ok(collection) => {
                let mut guard = collection.write();
                (job.op)(&mut guard)
            }
            Err(e) => Err(format!("failed to get collection: {}", e)),
        };
        // A disconnected reply means the client gave up; the mutation
        // has already run to completion either way.
        let _ = job.reply.send(result);
    }
}

// src/storage/docmap.rs
// Chained hash map `_id -> document`. Buckets are singly-linked pair
// chains; the hash is polynomial over the key bytes with multiplier 3
// and wrapping 32-bit arithmetic. Iteration order is unspecified.

use crate::document::Document;

const INITIAL_CAPACITY: usize = 16;
const LOAD_FACTOR: f64 = 0.75;

#[derive(Debug, Clone)]
struct Pair {
    key: String,
    value: Document,
    next: Option<Box<Pair>>,
}

#[derive(Debug, Clone)]
pub struct DocMap {
    buckets: Vec<Option<Box<Pair>>>,
    size: usize,
}

impl DocMap {
    pub fn new() -> Self {
        DocMap {
            buckets: (0..INITIAL_CAPACITY).map(|_| None).collect(),
            size: 0,
        }
    }

    fn hash(key: &str) -> u32 {
        let mut hash: u32 = 0;
        for byte in key.bytes() {
            hash = hash.wrapping_mul(3).wrapping_add(u32::from(byte));
        }
        hash
    }

    fn bucket_index(&self, key: &str) -> usize {
        Self::hash(key) as usize % self.buckets.len()
    }

    /// Upsert: replace an existing key's document or chain a new pair
    /// at the bucket head.
    pub fn put(&mut self, key: String, value: Document) {
        if self.size as f64 / self.buckets.len() as f64 >= LOAD_FACTOR {
            self.resize();
        }

        let index = self.bucket_index(&key);

        let mut cursor = self.buckets[index].as_deref_mut();
        while let Some(pair) = cursor {
            if pair.key == key {
                pair.value = value;
                return;
            }
            cursor = pair.next.as_deref_mut();
        }

        let next = self.buckets[index].take();
        self.buckets[index] = Some(Box::new(Pair { key, value, next }));
        self.size += 1;
    }

    pub fn get(&self, key: &str) -> Option<&Document> {
        let mut cursor = self.buckets[self.bucket_index(key)].as_deref();
        while let Some(pair) = cursor {
            if pair.key == key {
                return Some(&pair.value);
            }
            cursor = pair.next.as_deref();
        }
        None
    }

    /// Returns false when the key is absent. The bucket chain is
    /// rebuilt without the removed pair; chain order is irrelevant for
    /// an unordered container.
    pub fn remove(&mut self, key: &str) -> bool {
        let index = self.bucket_index(key);
        let mut chain = self.buckets[index].take();
        let mut kept: Option<Box<Pair>> = None;
        let mut removed = false;

        while let Some(mut pair) = chain {
            chain = pair.next.take();
            if !removed && pair.key == key {
                removed = true;
                continue;
            }
            pair.next = kept;
            kept = Some(pair);
        }

        self.buckets[index] = kept;
        if removed {
            self.size -= 1;
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Snapshot of every (key, document) pair.
    pub fn items(&self) -> Vec<(String, Document)> {
        let mut items = Vec::with_capacity(self.size);
        for bucket in &self.buckets {
            let mut cursor = bucket.as_deref();
            while let Some(pair) = cursor {
                items.push((pair.key.clone(), pair.value.clone()));
                cursor = pair.next.as_deref();
            }
        }
        items
    }

    /// Double the bucket array and re-chain every pair. Chains land in
    /// reverse traversal order, which the unordered contract allows.
    fn resize(&mut self) {
        let new_capacity = self.buckets.len() * 2;
        let old_buckets = std::mem::replace(
            &mut self.buckets,
            (0..new_capacity).map(|_| None).collect(),
        );

        for bucket in old_buckets {
            let mut chain = bucket;
            while let Some(mut pair) = chain {
                chain = pair.next.take();
                let index = Self::hash(&pair.key) as usize % new_capacity;
                pair.next = self.buckets[index].take();
                self.buckets[index] = Some(pair);
            }
        }
    }
}

impl Default for DocMap {
    fn default() -> Self {
        Self::new()
    }
}

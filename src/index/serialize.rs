// src/index/serialize.rs
// Logical snapshot of a B+ tree: a breadth-first node list with child
// links as list indices, keys and values as base64 strings. Node 0 is
// the root. Leaf forward pointers are not stored; they are re-threaded
// from the node-list order on load.

use std::collections::HashMap;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use super::btree::{BTree, Node, NodeId, NodeKind};
use crate::error::{DbError, Result};

#[derive(Debug, Serialize, Deserialize)]
pub struct IndexFile {
    pub field: String,
    pub order: usize,
    pub nodes: Vec<SerializedNode>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SerializedNode {
    pub is_leaf: bool,
    pub keys: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<Vec<String>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<usize>,
}

impl IndexFile {
    /// Snapshot a tree for the named field.
    pub fn from_tree(tree: &BTree, field: &str) -> IndexFile {
        let arena = tree.arena();

        // Breadth-first numbering from the root; the arena may hold
        // more nodes than are reachable (splits never compact it).
        let mut order_of: HashMap<NodeId, usize> = HashMap::new();
        let mut bfs: Vec<NodeId> = vec![tree.root_id()];
        let mut head = 0;
        order_of.insert(tree.root_id(), 0);
        while head < bfs.len() {
            let id = bfs[head];
            head += 1;
            if let NodeKind::Internal { children, .. } = &arena[id].kind {
                for &child in children {
                    if !order_of.contains_key(&child) {
                        order_of.insert(child, bfs.len());
                        bfs.push(child);
                    }
                }
            }
        }

        let nodes = bfs
            .iter()
            .map(|&id| match &arena[id].kind {
                NodeKind::Leaf { keys, values, .. } => SerializedNode {
                    is_leaf: true,
                    keys: keys.iter().map(|k| BASE64.encode(k)).collect(),
                    values: values
                        .iter()
                        .map(|vs| vs.iter().map(|v| BASE64.encode(v)).collect())
                        .collect(),
                    children: Vec::new(),
                },
                NodeKind::Internal { keys, children } => SerializedNode {
                    is_leaf: false,
                    keys: keys.iter().map(|k| BASE64.encode(k)).collect(),
                    values: Vec::new(),
                    children: children.iter().map(|c| order_of[c]).collect(),
                },
            })
            .collect();

        IndexFile {
            field: field.to_string(),
            order: tree.order(),
            nodes,
        }
    }

    /// Materialize the snapshot back into a tree: nodes first, then a
    /// second pass wires parent/child links, then leaves are chained in
    /// list order.
    pub fn into_tree(self) -> Result<BTree> {
        if self.nodes.is_empty() {
            return Ok(BTree::new(self.order));
        }

        let node_count = self.nodes.len();
        let mut arena: Vec<Node> = Vec::with_capacity(node_count);
        for sn in &self.nodes {
            let keys = sn
                .keys
                .iter()
                .map(|k| decode(k))
                .collect::<Result<Vec<_>>>()?;
            let kind = if sn.is_leaf {
                let values = sn
                    .values
                    .iter()
                    .map(|vs| vs.iter().map(|v| decode(v)).collect::<Result<Vec<_>>>())
                    .collect::<Result<Vec<_>>>()?;
                if values.len() != keys.len() {
                    return Err(DbError::CorruptIndex(
                        "leaf keys and values are not aligned".to_string(),
                    ));
                }
                NodeKind::Leaf {
                    keys,
                    values,
                    next: None,
                }
            } else {
                if sn.children.is_empty() {
                    return Err(DbError::CorruptIndex(
                        "internal node without children".to_string(),
                    ));
                }
                NodeKind::Internal {
                    keys,
                    children: sn.children.clone(),
                }
            };
            arena.push(Node { parent: None, kind });
        }

        for (id, sn) in self.nodes.iter().enumerate() {
            for &child in &sn.children {
                if child >= node_count {
                    return Err(DbError::CorruptIndex(format!(
                        "child index {} out of range",
                        child
                    )));
                }
                arena[child].parent = Some(id);
            }
        }

        let mut prev_leaf: Option<NodeId> = None;
        for id in 0..node_count {
            if matches!(arena[id].kind, NodeKind::Leaf { .. }) {
                if let Some(prev) = prev_leaf {
                    if let NodeKind::Leaf { next, .. } = &mut arena[prev].kind {
                        *next = Some(id);
                    }
                }
                prev_leaf = Some(id);
            }
        }

        Ok(BTree::from_parts(self.order, arena, 0))
    }
}

fn decode(encoded: &str) -> Result<Vec<u8>> {
    BASE64
        .decode(encoded)
        .map_err(|e| DbError::CorruptIndex(format!("bad base64: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn populated_tree(order: usize, n: u32) -> BTree {
        let mut tree = BTree::new(order);
        for i in 0..n {
            tree.insert(
                format!("{:05}", i).into_bytes(),
                format!("id-{}", i).into_bytes(),
            );
        }
        tree
    }

    #[test]
    fn test_empty_tree_round_trip() {
        let tree = BTree::new(64);
        let file = IndexFile::from_tree(&tree, "age");
        assert_eq!(file.field, "age");
        assert_eq!(file.order, 64);
        assert_eq!(file.nodes.len(), 1);

        let restored = file.into_tree().unwrap();
        assert!(restored.search(b"anything").is_empty());
    }

    #[test]
    fn test_round_trip_preserves_search_results() {
        let tree = populated_tree(2, 150);
        let json = serde_json::to_string(&IndexFile::from_tree(&tree, "name")).unwrap();
        let restored: IndexFile = serde_json::from_str(&json).unwrap();
        let restored = restored.into_tree().unwrap();

        for i in 0..150 {
            let key = format!("{:05}", i).into_bytes();
            assert_eq!(restored.search(&key), tree.search(&key), "key {}", i);
        }

        let lo = format!("{:05}", 30).into_bytes();
        let hi = format!("{:05}", 90).into_bytes();
        assert_eq!(
            restored.range_search(Some(&lo), Some(&hi), true, true),
            tree.range_search(Some(&lo), Some(&hi), true, true),
        );
    }

    #[test]
    fn test_on_disk_shape() {
        let tree = populated_tree(2, 40);
        let value = serde_json::to_value(IndexFile::from_tree(&tree, "age")).unwrap();

        assert_eq!(value["field"], "age");
        assert_eq!(value["order"], 2);
        let nodes = value["nodes"].as_array().unwrap();
        assert!(nodes.len() > 1, "40 keys at order 2 must split");

        // Root is node 0 and, after splits, an internal node carrying
        // children indices but no values.
        assert_eq!(nodes[0]["is_leaf"], false);
        assert!(nodes[0]["children"].is_array());
        assert!(nodes[0].get("values").is_none());

        // Leaves carry base64 key strings and aligned value lists.
        let leaf = nodes
            .iter()
            .find(|n| n["is_leaf"] == true)
            .expect("no leaf serialized");
        assert!(leaf["keys"][0].is_string());
        assert!(leaf["values"][0].is_array());
        assert!(leaf.get("children").is_none());
    }

    #[test]
    fn test_duplicate_key_value_lists_survive() {
        let mut tree = BTree::new(4);
        tree.insert(b"k".to_vec(), b"a".to_vec());
        tree.insert(b"k".to_vec(), b"b".to_vec());

        let restored = IndexFile::from_tree(&tree, "f").into_tree().unwrap();
        assert_eq!(restored.search(b"k"), vec![b"a".to_vec(), b"b".to_vec()]);
    }

    #[test]
    fn test_corrupt_children_rejected() {
        let file = IndexFile {
            field: "f".to_string(),
            order: 4,
            nodes: vec![SerializedNode {
                is_leaf: false,
                keys: vec![],
                values: vec![],
                children: vec![7],
            }],
        };
        assert!(file.into_tree().is_err());
    }

    #[test]
    fn test_bad_base64_rejected() {
        let file = IndexFile {
            field: "f".to_string(),
            order: 4,
            nodes: vec![SerializedNode {
                is_leaf: true,
                keys: vec!["not base64!!".to_string()],
                values: vec![vec![]],
                children: vec![],
            }],
        };
        assert!(file.into_tree().is_err());
    }
}

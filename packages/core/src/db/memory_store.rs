//! MemoryStore - In-Process NodeStore
//!
//! Keeps rows in insertion order behind a `tokio::sync::RwLock` and evaluates
//! predicates in Rust. Ids are sequential integers (`1`, `2`, ...), matching
//! what the SQL store hands out, so paths look the same on both backends.
//!
//! Useful for tests and for callers that rebuild a tree from a snapshot
//! without touching disk.

use crate::db::node_store::NodeStore;
use crate::models::{Node, NodeId, NodeQuery, Predicate};
use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct Rows {
    rows: Vec<Node>,
    positions: HashMap<NodeId, usize>,
    next_id: i64,
}

impl Rows {
    fn reindex(&mut self) {
        self.positions = self
            .rows
            .iter()
            .enumerate()
            .filter_map(|(pos, node)| node.id.clone().map(|id| (id, pos)))
            .collect();
    }

    fn allocate_id(&mut self) -> NodeId {
        self.next_id += 1;
        NodeId::from(self.next_id)
    }
}

/// In-memory `NodeStore` implementation
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Rows>,
}

/// Strip transient in-memory state before a row is stored
fn to_row(node: &Node) -> Node {
    let mut row = node.clone();
    row.children = Vec::new();
    row.cached_parent = None;
    row
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored rows
    pub async fn len(&self) -> usize {
        self.inner.read().await.rows.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl NodeStore for MemoryStore {
    async fn save(&self, mut node: Node) -> Result<Node> {
        let mut inner = self.inner.write().await;
        let now = Utc::now();
        node.modified_at = now;

        let id = match node.id.clone() {
            Some(id) => id,
            None => {
                let id = inner.allocate_id();
                node.id = Some(id.clone());
                id
            }
        };

        match inner.positions.get(&id).copied() {
            Some(pos) => {
                node.created_at = inner.rows[pos].created_at;
                inner.rows[pos] = to_row(&node);
            }
            None => {
                node.created_at = now;
                if let Some(numeric) = id.as_i64() {
                    inner.next_id = inner.next_id.max(numeric);
                }
                let pos = inner.rows.len();
                inner.rows.push(to_row(&node));
                inner.positions.insert(id, pos);
            }
        }

        Ok(node)
    }

    async fn find_one_by_id(&self, id: &NodeId) -> Result<Option<Node>> {
        let inner = self.inner.read().await;
        Ok(inner.positions.get(id).map(|&pos| inner.rows[pos].clone()))
    }

    async fn find_where(&self, query: NodeQuery) -> Result<Vec<Node>> {
        let inner = self.inner.read().await;
        let mut found: Vec<Node> = inner
            .rows
            .iter()
            .filter(|node| query.predicate.matches(node))
            .cloned()
            .collect();
        query.order_by.sort(&mut found);
        Ok(found)
    }

    async fn count_where(&self, predicate: Predicate) -> Result<u64> {
        let inner = self.inner.read().await;
        Ok(inner.rows.iter().filter(|node| predicate.matches(node)).count() as u64)
    }

    async fn delete_where(&self, predicate: Predicate) -> Result<u64> {
        let mut inner = self.inner.write().await;
        let before = inner.rows.len();
        inner.rows.retain(|node| !predicate.matches(node));
        let deleted = before - inner.rows.len();
        if deleted > 0 {
            inner.reindex();
        }
        Ok(deleted as u64)
    }
}

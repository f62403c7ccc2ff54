//! NodeStore Trait - Persistence Abstraction
//!
//! This module defines the `NodeStore` trait the tree service persists through.
//! The store is flat: it knows rows, ids and the four predicate shapes in
//! [`Predicate`](crate::models::Predicate), never the tree itself.
//!
//! # Design Decisions
//!
//! 1. **Async-First**: All methods are async so embedded and networked
//!    backends fit behind the same trait
//! 2. **Ownership Semantics**: `save` takes the node by value and hands back
//!    the persisted version (with its assigned id)
//! 3. **Error Handling**: Uses `anyhow::Result`; the tree layer passes store
//!    failures through as `TreeError::StoreFailure`
//! 4. **No Transactions**: A placement and its cascade are separate saves;
//!    callers that need atomicity bracket them with their own transaction
//!
//! # Examples
//!
//! ```rust,no_run
//! use pathtree_core::db::{MemoryStore, NodeStore};
//! use pathtree_core::models::Node;
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = MemoryStore::new();
//!     let saved = store.save(Node::new("Chapter".to_string(), json!({}))).await?;
//!     assert!(saved.id.is_some());
//!     Ok(())
//! }
//! ```

use crate::models::{Node, NodeId, NodeQuery, Predicate};
use anyhow::Result;
use async_trait::async_trait;

/// Abstraction layer for node persistence operations
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` so a store can be shared behind an
/// `Arc` across tasks.
#[async_trait]
pub trait NodeStore: Send + Sync {
    /// Insert or update a node.
    ///
    /// A node without an id is inserted and receives a fresh id; a node with
    /// an id replaces the stored row with that id (inserting it if missing).
    /// `children` and the memoized parent are never stored.
    async fn save(&self, node: Node) -> Result<Node>;

    /// Get node by ID
    ///
    /// - `Ok(Some(node))` if node exists
    /// - `Ok(None)` if node doesn't exist (not an error)
    async fn find_one_by_id(&self, id: &NodeId) -> Result<Option<Node>>;

    /// All rows matching `query.predicate`, in `query.order_by` order
    async fn find_where(&self, query: NodeQuery) -> Result<Vec<Node>>;

    /// Number of rows matching `predicate`
    async fn count_where(&self, predicate: Predicate) -> Result<u64>;

    /// Delete every row matching `predicate`, returning how many went away
    async fn delete_where(&self, predicate: Predicate) -> Result<u64>;
}

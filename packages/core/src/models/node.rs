//! Node Data Structures
//!
//! This module defines the `Node` record kept in the flat store and its
//! identifier type. Ancestry is encoded on every row as a materialized path
//! (`1/4/9/`), a depth counter (`level`) and a parent reference.
//!
//! # Architecture
//!
//! - **Flat storage**: A node row never references its children; the tree
//!   shape lives entirely in `path`, `level` and `parent_id`
//! - **Store-assigned ids**: `id` is `None` until the first save
//! - **Transient children**: `children` is filled only by tree reconstruction
//!   and is never written back by a store
//!
//! # Examples
//!
//! ```rust
//! use pathtree_core::models::{Node, NodeId};
//! use serde_json::json;
//!
//! // A fresh node, not yet persisted
//! let draft = Node::new("Chapter 1".to_string(), json!({"kind": "chapter"}));
//! assert!(draft.id.is_none());
//!
//! // A node as a store would return it
//! let stored = Node::with_id(NodeId::from(7), "Chapter 1".to_string(), json!({}));
//! assert_eq!(stored.id, Some(NodeId::from(7)));
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Validation errors for node identifiers and payloads
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid node ID format: {0}")]
    InvalidId(String),

    #[error("Properties validation failed: {0}")]
    InvalidProperties(String),
}

/// Opaque node identifier assigned by the store.
///
/// Ids are embedded verbatim in materialized paths, so they can never be
/// empty and can never contain the path separator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Create an id from its textual form, rejecting values that cannot be
    /// embedded in a path
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        if value.is_empty() {
            return Err(ValidationError::InvalidId("id cannot be empty".to_string()));
        }
        if value.contains('/') {
            return Err(ValidationError::InvalidId(format!(
                "id '{}' contains the path separator",
                value
            )));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Numeric view of the id, for stores that key rows by integer
    pub fn as_i64(&self) -> Option<i64> {
        self.0.parse().ok()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<i64> for NodeId {
    fn from(value: i64) -> Self {
        Self(value.to_string())
    }
}

impl From<u64> for NodeId {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

impl From<i32> for NodeId {
    fn from(value: i32) -> Self {
        Self(value.to_string())
    }
}

impl AsRef<str> for NodeId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A record in the tree.
///
/// # Fields
///
/// - `id`: Store-assigned identifier (`None` until first saved)
/// - `path`: Materialized ancestor chain, `root_id/.../self_id/` (empty until placed)
/// - `level`: Depth from the root, root = 0
/// - `parent_id`: Direct parent, `None` iff the node is a root
/// - `content`: Primary text of the node
/// - `properties`: Free-form JSON payload
/// - `created_at` / `modified_at`: Maintained by the store on save
/// - `children`: Filled by tree reconstruction only
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: Option<NodeId>,

    #[serde(default)]
    pub path: String,

    #[serde(default)]
    pub level: u32,

    pub parent_id: Option<NodeId>,

    #[serde(default)]
    pub content: String,

    #[serde(default)]
    pub properties: serde_json::Value,

    pub created_at: DateTime<Utc>,

    pub modified_at: DateTime<Utc>,

    /// In-memory child graph built by the tree builder
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Node>,

    /// Memoized parent lookup, valid while `parent_id` is unchanged
    #[serde(skip)]
    pub(crate) cached_parent: Option<Box<Node>>,
}

impl Node {
    /// Create a new, unsaved node
    pub fn new(content: String, properties: serde_json::Value) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            path: String::new(),
            level: 0,
            parent_id: None,
            content,
            properties,
            created_at: now,
            modified_at: now,
            children: Vec::new(),
            cached_parent: None,
        }
    }

    /// Create a node that already carries an identifier
    pub fn with_id(id: NodeId, content: String, properties: serde_json::Value) -> Self {
        Self {
            id: Some(id),
            ..Self::new(content, properties)
        }
    }

    /// Whether the node has ever been saved
    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    /// Whether the node has been given a position in a tree
    pub fn is_placed(&self) -> bool {
        self.id.is_some() && !self.path.is_empty()
    }

    /// A node is a root iff it has no parent reference
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Rewrite the tree columns, dropping any memoized parent
    pub(crate) fn set_position(&mut self, path: String, parent_id: Option<NodeId>, level: u32) {
        if self.parent_id != parent_id {
            self.cached_parent = None;
        }
        self.path = path;
        self.parent_id = parent_id;
        self.level = level;
    }

    pub fn set_content(&mut self, content: String) {
        self.content = content;
    }

    /// Merge a JSON object into `properties`, overwriting existing keys
    pub fn merge_properties(&mut self, updates: serde_json::Value) -> Result<(), ValidationError> {
        let serde_json::Value::Object(updates) = updates else {
            return Err(ValidationError::InvalidProperties(
                "updates must be a JSON object".to_string(),
            ));
        };
        match &mut self.properties {
            serde_json::Value::Object(existing) => {
                existing.extend(updates);
            }
            other => {
                *other = serde_json::Value::Object(updates);
            }
        }
        Ok(())
    }

    /// Walk the reconstructed graph in pre-order
    pub fn iter_preorder(&self) -> impl Iterator<Item = &Node> {
        let mut stack = vec![self];
        std::iter::from_fn(move || {
            let node = stack.pop()?;
            stack.extend(node.children.iter().rev());
            Some(node)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_node_id_rejects_separator_and_empty() {
        assert!(NodeId::new("12").is_ok());
        assert!(NodeId::new("a-b").is_ok());
        assert_eq!(
            NodeId::new(""),
            Err(ValidationError::InvalidId("id cannot be empty".to_string()))
        );
        assert!(matches!(
            NodeId::new("3/4"),
            Err(ValidationError::InvalidId(_))
        ));
    }

    #[test]
    fn test_node_id_numeric_view() {
        assert_eq!(NodeId::from(42).as_i64(), Some(42));
        assert_eq!(NodeId::new("abc").unwrap().as_i64(), None);
    }

    #[test]
    fn test_new_node_is_unsaved_root() {
        let node = Node::new("Draft".to_string(), json!({}));
        assert!(!node.is_persisted());
        assert!(!node.is_placed());
        assert!(node.is_root());
        assert_eq!(node.level, 0);
        assert!(node.children.is_empty());
    }

    #[test]
    fn test_set_position_clears_parent_cache_on_reparent() {
        let mut node = Node::with_id(NodeId::from(9), "n".to_string(), json!({}));
        node.set_position("3/9/".to_string(), Some(NodeId::from(3)), 1);
        node.cached_parent = Some(Box::new(Node::with_id(
            NodeId::from(3),
            "p".to_string(),
            json!({}),
        )));

        // Same parent keeps the memo
        node.set_position("3/9/".to_string(), Some(NodeId::from(3)), 1);
        assert!(node.cached_parent.is_some());

        node.set_position("9/".to_string(), None, 0);
        assert!(node.cached_parent.is_none());
    }

    #[test]
    fn test_merge_properties() {
        let mut node = Node::new("n".to_string(), json!({"a": 1}));
        node.merge_properties(json!({"b": 2, "a": 3})).unwrap();
        assert_eq!(node.properties, json!({"a": 3, "b": 2}));

        assert!(node.merge_properties(json!("scalar")).is_err());
    }

    #[test]
    fn test_serialization_skips_cache_and_empty_children() {
        let mut node = Node::with_id(NodeId::from(1), "root".to_string(), json!({}));
        node.path = "1/".to_string();
        node.cached_parent = Some(Box::new(Node::new("x".to_string(), json!({}))));

        let value = serde_json::to_value(&node).unwrap();
        assert_eq!(value["id"], "1");
        assert_eq!(value["path"], "1/");
        assert_eq!(value["parentId"], serde_json::Value::Null);
        assert!(value.get("children").is_none());
        assert!(value.get("cachedParent").is_none());
    }

    #[test]
    fn test_iter_preorder() {
        let mut root = Node::with_id(NodeId::from(1), "1".to_string(), json!({}));
        let mut b = Node::with_id(NodeId::from(2), "2".to_string(), json!({}));
        b.children
            .push(Node::with_id(NodeId::from(4), "4".to_string(), json!({})));
        root.children.push(b);
        root.children
            .push(Node::with_id(NodeId::from(3), "3".to_string(), json!({})));

        let order: Vec<String> = root
            .iter_preorder()
            .map(|n| n.id.as_ref().unwrap().to_string())
            .collect();
        assert_eq!(order, vec!["1", "2", "4", "3"]);
    }
}

//! Tree Error Types
//!
//! Errors raised by the path codec, placement operations, the cascade and tree
//! reconstruction. Store failures are carried through untouched.

use thiserror::Error;

/// Result alias for tree operations
pub type TreeResult<T> = Result<T, TreeError>;

/// Errors that can occur while maintaining or rebuilding a tree
#[derive(Error, Debug)]
pub enum TreeError {
    /// A malformed path (or an id that cannot be embedded in one) reached the codec
    #[error("Invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    /// The target parent of `set_child_of` has no id or no path
    #[error("Parent node is not persisted: {context}")]
    ParentNotPersisted { context: String },

    /// The target sibling of `set_sibling_of` has no id or no path
    #[error("Sibling node is not persisted: {context}")]
    SiblingNotPersisted { context: String },

    /// A query was requested for a node that was never saved or placed
    #[error("Node is not persisted: {context}")]
    NodeNotPersisted { context: String },

    /// The placement would make a node its own ancestor
    #[error("Circular reference: node {node_id} is an ancestor of {target_id}")]
    CircularReference { node_id: String, target_id: String },

    /// Reconstruction input references a parent that has not been seen yet
    #[error("Orphan node {node_id}: parent {parent_id} not seen before it")]
    OrphanNode { node_id: String, parent_id: String },

    /// A named presenter was requested but never registered
    #[error("No presenter registered under '{name}'")]
    UnknownTransform { name: String },

    /// Opaque failure from the persistence collaborator
    #[error("Store operation failed: {0}")]
    StoreFailure(#[from] anyhow::Error),
}

impl TreeError {
    pub fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn parent_not_persisted(context: impl Into<String>) -> Self {
        Self::ParentNotPersisted {
            context: context.into(),
        }
    }

    pub fn sibling_not_persisted(context: impl Into<String>) -> Self {
        Self::SiblingNotPersisted {
            context: context.into(),
        }
    }

    pub fn node_not_persisted(context: impl Into<String>) -> Self {
        Self::NodeNotPersisted {
            context: context.into(),
        }
    }

    pub fn circular_reference(node_id: impl Into<String>, target_id: impl Into<String>) -> Self {
        Self::CircularReference {
            node_id: node_id.into(),
            target_id: target_id.into(),
        }
    }

    pub fn orphan_node(node_id: impl Into<String>, parent_id: impl Into<String>) -> Self {
        Self::OrphanNode {
            node_id: node_id.into(),
            parent_id: parent_id.into(),
        }
    }

    pub fn unknown_transform(name: impl Into<String>) -> Self {
        Self::UnknownTransform { name: name.into() }
    }
}

//! Tree Service
//!
//! Keeps the materialized path, level and parent reference of every node
//! consistent while nodes are created and moved, and answers structural
//! queries against a [`NodeStore`].
//!
//! # Placement
//!
//! `set_as_root`, `set_child_of` and `set_sibling_of` share one flow:
//!
//! 1. Validate the target (nothing is persisted if this fails)
//! 2. Save the node once if it has no id yet, since the path embeds the id
//! 3. Compute the new path/level/parent with the path codec and save
//! 4. Cascade the new prefix to every existing descendant
//!
//! # Atomicity
//!
//! The placement save and each descendant save are separate store calls. A
//! failure during the cascade is returned immediately: descendants visited
//! before the failure keep their new paths, the rest stay stale. Callers that
//! need all-or-nothing moves wrap the call in their own transaction, and must
//! not move overlapping subtrees concurrently.

use crate::db::{NodeStore, TreeEvent};
use crate::models::{Node, NodeId, Predicate};
use crate::tree::builder::{build_from_sequence, build_subtree, Presenter, PresenterRegistry};
use crate::tree::error::{TreeError, TreeResult};
use crate::tree::path_codec::{
    decode_ancestor_chain, encode_child_path, encode_root_path, encode_sibling_path,
    validate_path,
};
use crate::tree::queries::{self, require_id, require_placed};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Broadcast channel capacity for tree events.
///
/// Subscribers that lag further than this miss events; they only ever need
/// the latest structure, which they can re-read from the store.
const TREE_EVENT_CHANNEL_CAPACITY: usize = 128;

/// Validated destination of a placement
enum Placement {
    Root,
    ChildOf {
        parent_id: NodeId,
        parent_path: String,
        parent_level: u32,
    },
    SiblingOf {
        sibling_id: NodeId,
        sibling_path: String,
        parent_id: Option<NodeId>,
        level: u32,
    },
}

impl Placement {
    fn child_of(parent: &Node) -> TreeResult<Self> {
        let parent_id = parent
            .id
            .clone()
            .ok_or_else(|| TreeError::parent_not_persisted("parent has no id"))?;
        if parent.path.is_empty() {
            return Err(TreeError::parent_not_persisted(format!(
                "parent {} has no path",
                parent_id
            )));
        }
        validate_path(&parent.path)?;

        Ok(Placement::ChildOf {
            parent_id,
            parent_path: parent.path.clone(),
            parent_level: parent.level,
        })
    }

    fn sibling_of(sibling: &Node) -> TreeResult<Self> {
        let sibling_id = sibling
            .id
            .clone()
            .ok_or_else(|| TreeError::sibling_not_persisted("sibling has no id"))?;
        if sibling.path.is_empty() {
            return Err(TreeError::sibling_not_persisted(format!(
                "sibling {} has no path",
                sibling_id
            )));
        }
        validate_path(&sibling.path)?;

        Ok(Placement::SiblingOf {
            sibling_id,
            sibling_path: sibling.path.clone(),
            parent_id: sibling.parent_id.clone(),
            level: sibling.level,
        })
    }

    fn path_for(&self, id: &NodeId) -> TreeResult<String> {
        match self {
            Placement::Root => encode_root_path(id),
            Placement::ChildOf { parent_path, .. } => encode_child_path(parent_path, id),
            Placement::SiblingOf { sibling_path, .. } => encode_sibling_path(sibling_path, id),
        }
    }

    fn parent_id(&self) -> Option<NodeId> {
        match self {
            Placement::Root => None,
            Placement::ChildOf { parent_id, .. } => Some(parent_id.clone()),
            Placement::SiblingOf { parent_id, .. } => parent_id.clone(),
        }
    }

    fn level(&self) -> u32 {
        match self {
            Placement::Root => 0,
            Placement::ChildOf { parent_level, .. } => parent_level + 1,
            Placement::SiblingOf { level, .. } => *level,
        }
    }

    /// Reject a destination inside the node's own subtree
    fn check_not_below(&self, id: &NodeId) -> TreeResult<()> {
        let (target, chain) = match self {
            Placement::Root => return Ok(()),
            Placement::ChildOf {
                parent_id,
                parent_path,
                ..
            } => (parent_id, decode_ancestor_chain(parent_path)?),
            Placement::SiblingOf {
                sibling_id,
                sibling_path,
                ..
            } => {
                let mut chain = decode_ancestor_chain(sibling_path)?;
                chain.pop();
                (sibling_id, chain)
            }
        };

        if chain.contains(id) {
            return Err(TreeError::circular_reference(id.as_str(), target.as_str()));
        }
        Ok(())
    }
}

/// Materialized-path tree maintenance over a [`NodeStore`]
#[derive(Clone)]
pub struct TreeService {
    store: Arc<dyn NodeStore>,

    /// Named presenters available to `load_tree` and `build_complete_tree`
    presenters: PresenterRegistry,

    /// Broadcast channel for tree events (128 subscriber capacity)
    event_tx: broadcast::Sender<TreeEvent>,
}

impl std::fmt::Debug for TreeService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeService")
            .field("presenters", &self.presenters)
            .finish_non_exhaustive()
    }
}

impl TreeService {
    /// Create a new TreeService
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use pathtree_core::db::MemoryStore;
    /// # use pathtree_core::services::TreeService;
    /// # use std::sync::Arc;
    /// let service = TreeService::new(Arc::new(MemoryStore::new()));
    /// ```
    pub fn new(store: Arc<dyn NodeStore>) -> Self {
        let (event_tx, _) = broadcast::channel(TREE_EVENT_CHANNEL_CAPACITY);
        Self {
            store,
            presenters: PresenterRegistry::new(),
            event_tx,
        }
    }

    /// Replace the presenter registry
    pub fn with_presenters(mut self, presenters: PresenterRegistry) -> Self {
        self.presenters = presenters;
        self
    }

    /// Get access to the underlying store
    pub fn store(&self) -> &Arc<dyn NodeStore> {
        &self.store
    }

    pub fn presenters(&self) -> &PresenterRegistry {
        &self.presenters
    }

    /// Subscribe to tree events
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use pathtree_core::db::MemoryStore;
    /// # use pathtree_core::services::TreeService;
    /// # use std::sync::Arc;
    /// # #[tokio::main]
    /// # async fn main() {
    /// let service = TreeService::new(Arc::new(MemoryStore::new()));
    /// let mut rx = service.subscribe_to_events();
    /// tokio::spawn(async move {
    ///     while let Ok(event) = rx.recv().await {
    ///         println!("{}", event.event_type());
    ///     }
    /// });
    /// # }
    /// ```
    pub fn subscribe_to_events(&self) -> broadcast::Receiver<TreeEvent> {
        self.event_tx.subscribe()
    }

    /// Emit a tree event to all subscribers
    ///
    /// Errors (no active subscribers) are ignored.
    fn emit_event(&self, event: TreeEvent) {
        let _ = self.event_tx.send(event);
    }

    // ------------------------------------------------------------------
    // Placement
    // ------------------------------------------------------------------

    /// Make `node` the root of its own tree: path `id/`, level 0, no parent
    pub async fn set_as_root(&self, node: Node) -> TreeResult<Node> {
        self.place(node, Placement::Root).await
    }

    /// Move `node` (and its subtree) under `parent`
    ///
    /// # Errors
    ///
    /// - `ParentNotPersisted` if `parent` has no id or path
    /// - `CircularReference` if `parent` lies inside `node`'s subtree
    pub async fn set_child_of(&self, node: Node, parent: &Node) -> TreeResult<Node> {
        self.place(node, Placement::child_of(parent)?).await
    }

    /// Move `node` (and its subtree) next to `sibling`, under the same parent
    ///
    /// # Errors
    ///
    /// - `SiblingNotPersisted` if `sibling` has no id or path
    /// - `CircularReference` if `sibling` lies inside `node`'s subtree
    pub async fn set_sibling_of(&self, node: Node, sibling: &Node) -> TreeResult<Node> {
        self.place(node, Placement::sibling_of(sibling)?).await
    }

    async fn place(&self, mut node: Node, placement: Placement) -> TreeResult<Node> {
        match &node.id {
            Some(id) => placement.check_not_below(id)?,
            None => {
                node = self.store.save(node).await?;
                tracing::debug!("Saved new node {:?} before placement", node.id);
            }
        }

        let id = require_id(&node)?.clone();
        let path = placement.path_for(&id)?;
        let old_path = Some(node.path.clone()).filter(|p| !p.is_empty());

        node.set_position(path, placement.parent_id(), placement.level());
        let node = self.store.save(node).await?;

        tracing::info!(
            "Placed node {} at {} (level {})",
            id,
            node.path,
            node.level
        );

        self.emit_event(TreeEvent::NodePlaced {
            node: node.clone(),
            old_path,
        });

        self.propagate(&node).await?;

        Ok(node)
    }

    /// Rewrite path and level of every descendant of `node` from its current
    /// position, depth-first, parents before their children.
    ///
    /// Returns the number of descendants rewritten. Stops at the first store
    /// failure; see the module docs for the partial-rewrite window.
    pub async fn propagate(&self, node: &Node) -> TreeResult<usize> {
        let (root_id, root_path) = require_placed(node)?;

        let mut visited: HashSet<NodeId> = HashSet::new();
        visited.insert(root_id.clone());

        let mut stack: Vec<(Node, String, u32)> = Vec::new();
        let children = self.store.find_where(queries::children(root_id)).await?;
        for child in children.into_iter().rev() {
            stack.push((child, root_path.to_string(), node.level + 1));
        }

        let mut rewritten = 0;
        while let Some((mut child, parent_path, level)) = stack.pop() {
            let child_id = require_id(&child)?.clone();
            if !visited.insert(child_id.clone()) {
                return Err(TreeError::circular_reference(
                    child_id.as_str(),
                    root_id.as_str(),
                ));
            }

            let path = encode_child_path(&parent_path, &child_id)?;
            let parent_id = child.parent_id.clone();
            child.set_position(path, parent_id, level);
            let child = self.store.save(child).await?;
            rewritten += 1;

            tracing::debug!(
                "Cascaded node {} to {} (level {})",
                child_id,
                child.path,
                child.level
            );

            let grandchildren = self.store.find_where(queries::children(&child_id)).await?;
            for grandchild in grandchildren.into_iter().rev() {
                stack.push((grandchild, child.path.clone(), level + 1));
            }
        }

        if rewritten > 0 {
            self.emit_event(TreeEvent::SubtreeRewritten {
                root_id: root_id.clone(),
                count: rewritten,
            });
        }

        Ok(rewritten)
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn is_root(&self, node: &Node) -> bool {
        node.is_root()
    }

    /// True when no stored row names `node` as its parent
    pub async fn is_leaf(&self, node: &Node) -> TreeResult<bool> {
        let id = require_id(node)?;
        let count = self
            .store
            .count_where(queries::children(id).predicate)
            .await?;
        Ok(count == 0)
    }

    /// Parent of `node`, or `None` for a root.
    ///
    /// The lookup is memoized on the node and reused until its parent
    /// reference changes.
    pub async fn find_parent<'a>(&self, node: &'a mut Node) -> TreeResult<Option<&'a Node>> {
        let Some(parent_id) = node.parent_id.clone() else {
            node.cached_parent = None;
            return Ok(None);
        };

        let stale = match &node.cached_parent {
            Some(cached) => cached.id.as_ref() != Some(&parent_id),
            None => true,
        };

        if stale {
            node.cached_parent = self.store.find_one_by_id(&parent_id).await?.map(Box::new);
            if node.cached_parent.is_none() {
                tracing::warn!(
                    "Parent {} of node {:?} is missing from the store",
                    parent_id,
                    node.id
                );
            }
        }

        Ok(node.cached_parent.as_deref())
    }

    pub async fn find_children(&self, node: &Node) -> TreeResult<Vec<Node>> {
        let id = require_id(node)?;
        Ok(self.store.find_where(queries::children(id)).await?)
    }

    /// Every proper descendant, shallowest first
    pub async fn find_descendants(&self, node: &Node) -> TreeResult<Vec<Node>> {
        Ok(self.store.find_where(queries::descendants(node)?).await?)
    }

    /// Every proper ancestor, root first
    pub async fn find_ancestors(&self, node: &Node) -> TreeResult<Vec<Node>> {
        Ok(self.store.find_where(queries::ancestors(node)?).await?)
    }

    /// Root of the tree containing `node` (the node itself when it is a root)
    pub async fn find_root(&self, node: &Node) -> TreeResult<Option<Node>> {
        if node.is_root() {
            return Ok(Some(node.clone()));
        }
        let root_id = queries::root_id_of(node)?;
        Ok(self.store.find_one_by_id(&root_id).await?)
    }

    pub async fn get_roots(&self) -> TreeResult<Vec<Node>> {
        Ok(self.store.find_where(queries::roots()).await?)
    }

    /// Flat rows of the tree rooted at `root_id`, root first, level ascending
    pub async fn fetch_tree(&self, root_id: &NodeId) -> TreeResult<Vec<Node>> {
        Ok(self.store.find_where(queries::subtree(root_id)?).await?)
    }

    // ------------------------------------------------------------------
    // Reconstruction
    // ------------------------------------------------------------------

    fn resolve_presenter(&self, name: Option<&str>) -> TreeResult<Option<Arc<dyn Presenter>>> {
        name.map(|name| self.presenters.resolve(name)).transpose()
    }

    /// Build a tree from `nodes` (root first, level ascending), applying the
    /// named presenter to every non-root node.
    ///
    /// Returns `Ok(None)` when `nodes` is empty.
    pub fn build_complete_tree(
        &self,
        nodes: Vec<Node>,
        presenter: Option<&str>,
    ) -> TreeResult<Option<Node>> {
        let presenter = self.resolve_presenter(presenter)?;
        build_from_sequence(nodes, presenter.as_deref())
    }

    /// Fetch and build the whole tree rooted at `root_id`
    ///
    /// Returns `Ok(None)` when no such tree is stored.
    pub async fn load_tree(
        &self,
        root_id: &NodeId,
        presenter: Option<&str>,
    ) -> TreeResult<Option<Node>> {
        let presenter = self.resolve_presenter(presenter)?;
        let rows = self.fetch_tree(root_id).await?;
        tracing::debug!("Loaded {} rows for tree {}", rows.len(), root_id);
        build_from_sequence(rows, presenter.as_deref())
    }

    /// Fetch the descendants of `node` and build them under it
    pub async fn load_subtree(&self, node: &Node, presenter: Option<&str>) -> TreeResult<Node> {
        let presenter = self.resolve_presenter(presenter)?;
        let descendants = self.find_descendants(node).await?;
        build_subtree(node.clone(), descendants, presenter.as_deref())
    }

    // ------------------------------------------------------------------
    // Deletion
    // ------------------------------------------------------------------

    /// Delete `node` together with every descendant
    ///
    /// Returns the number of deleted rows.
    pub async fn delete_subtree(&self, node: &Node) -> TreeResult<u64> {
        let (id, path) = require_placed(node)?;
        let deleted = self
            .store
            .delete_where(Predicate::PathPrefix {
                prefix: path.to_string(),
            })
            .await?;

        tracing::info!("Deleted subtree {} ({} rows)", id, deleted);

        self.emit_event(TreeEvent::SubtreeDeleted {
            root_id: id.clone(),
            count: deleted,
        });

        Ok(deleted)
    }
}

// Comprehensive tests in separate module
#[cfg(test)]
#[path = "tree_service_test.rs"]
mod tree_service_test;

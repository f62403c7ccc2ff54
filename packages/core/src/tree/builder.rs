//! In-memory tree reconstruction.
//!
//! Turns a flat, level-ordered sequence of nodes (as returned by a subtree
//! fetch) into an owned parent→children graph in one linear pass.
//!
//! # Algorithm
//!
//! 1. **Attach pass**: every node is given an arena slot; its parent is
//!    looked up by id among the slots seen so far and the slot index is
//!    appended to that parent's child list. A parent that has not been seen
//!    yet means the input is not level-ordered and the build fails.
//! 2. **Assemble pass**: slots are visited in reverse. A child always sits
//!    after its parent, so by the time a node is assembled all of its
//!    children are complete and can be moved into it.
//!
//! Children keep input order. The graph is owned top-down; a child refers to
//! its parent only through `parent_id`.

use crate::models::{Node, NodeId};
use crate::tree::error::{TreeError, TreeResult};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Transformation applied to every non-root node before it is attached
pub trait Presenter: Send + Sync {
    fn present(&self, node: Node) -> Node;
}

impl<F> Presenter for F
where
    F: Fn(Node) -> Node + Send + Sync,
{
    fn present(&self, node: Node) -> Node {
        self(node)
    }
}

/// Named presenters, resolved when a caller asks for one by name
#[derive(Clone, Default)]
pub struct PresenterRegistry {
    presenters: HashMap<String, Arc<dyn Presenter>>,
}

impl PresenterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `presenter` under `name`, replacing any previous entry
    pub fn register(&mut self, name: impl Into<String>, presenter: impl Presenter + 'static) {
        self.presenters.insert(name.into(), Arc::new(presenter));
    }

    pub fn with(mut self, name: impl Into<String>, presenter: impl Presenter + 'static) -> Self {
        self.register(name, presenter);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.presenters.contains_key(name)
    }

    /// Look up a presenter, failing with `UnknownTransform` if none is registered
    pub fn resolve(&self, name: &str) -> TreeResult<Arc<dyn Presenter>> {
        self.presenters
            .get(name)
            .cloned()
            .ok_or_else(|| TreeError::unknown_transform(name))
    }
}

impl fmt::Debug for PresenterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.presenters.keys().collect();
        names.sort();
        f.debug_struct("PresenterRegistry")
            .field("presenters", &names)
            .finish()
    }
}

fn label(id: Option<&NodeId>, missing: &str) -> String {
    id.map(ToString::to_string)
        .unwrap_or_else(|| missing.to_string())
}

/// Build the tree rooted at `root` from `rest`.
///
/// `rest` must be ordered so that every node comes after its parent
/// (level-ascending order satisfies this). The root is never presented.
///
/// # Errors
///
/// `OrphanNode` if an element's parent is neither `root` nor an earlier
/// element. No partial tree is returned.
pub fn build_complete_tree<I>(
    mut root: Node,
    rest: I,
    presenter: Option<&dyn Presenter>,
) -> TreeResult<Node>
where
    I: IntoIterator<Item = Node>,
{
    const ROOT: usize = usize::MAX;

    let rest = rest.into_iter();
    let mut slots: Vec<Option<Node>> = Vec::with_capacity(rest.size_hint().0);
    let mut child_slots: Vec<Vec<usize>> = Vec::with_capacity(slots.capacity());
    let mut root_children: Vec<usize> = Vec::new();
    let mut index: HashMap<NodeId, usize> = HashMap::new();

    root.children.clear();
    if let Some(id) = &root.id {
        index.insert(id.clone(), ROOT);
    }

    for mut node in rest {
        let parent_slot = match node.parent_id.as_ref().and_then(|p| index.get(p)) {
            Some(&slot) => slot,
            None => {
                return Err(TreeError::orphan_node(
                    label(node.id.as_ref(), "<unsaved>"),
                    label(node.parent_id.as_ref(), "<none>"),
                ))
            }
        };

        let id = node.id.clone();
        node.children.clear();
        let node = match presenter {
            Some(presenter) => presenter.present(node),
            None => node,
        };

        let slot = slots.len();
        slots.push(Some(node));
        child_slots.push(Vec::new());
        if let Some(id) = id {
            index.insert(id, slot);
        }

        if parent_slot == ROOT {
            root_children.push(slot);
        } else {
            child_slots[parent_slot].push(slot);
        }
    }

    for slot in (0..slots.len()).rev() {
        let children: Vec<Node> = std::mem::take(&mut child_slots[slot])
            .into_iter()
            .filter_map(|child| slots[child].take())
            .collect();
        if let Some(node) = slots[slot].as_mut() {
            node.children.extend(children);
        }
    }

    root.children = root_children
        .into_iter()
        .filter_map(|child| slots[child].take())
        .collect();

    tracing::debug!(
        "Rebuilt tree under {} ({} nodes)",
        label(root.id.as_ref(), "<unsaved>"),
        slots.len() + 1
    );

    Ok(root)
}

/// Build a tree whose root is the first element of `nodes`.
///
/// Returns `Ok(None)` for an empty sequence.
pub fn build_from_sequence<I>(nodes: I, presenter: Option<&dyn Presenter>) -> TreeResult<Option<Node>>
where
    I: IntoIterator<Item = Node>,
{
    let mut nodes = nodes.into_iter();
    match nodes.next() {
        Some(root) => build_complete_tree(root, nodes, presenter).map(Some),
        None => Ok(None),
    }
}

/// Rebuild the subtree under `root` from its level-ordered descendants.
///
/// `descendants` is what a descendants query returns: `root` itself must not
/// be part of it.
pub fn build_subtree(
    root: Node,
    descendants: Vec<Node>,
    presenter: Option<&dyn Presenter>,
) -> TreeResult<Node> {
    build_complete_tree(root, descendants, presenter)
}

impl Node {
    pub fn build_tree(
        self,
        descendants: Vec<Node>,
        presenter: Option<&dyn Presenter>,
    ) -> TreeResult<Node> {
        build_subtree(self, descendants, presenter)
    }
}

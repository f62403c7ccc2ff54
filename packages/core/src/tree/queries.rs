//! Ancestry and descendant query builders.
//!
//! These functions only derive [`NodeQuery`] values; executing them is the
//! job of a [`NodeStore`](crate::db::NodeStore). Every relation is answered
//! from the materialized columns alone, with no recursive traversal:
//!
//! - children: `parent = id`
//! - descendants: `path` prefixed by the node's path, minus the node itself
//! - ancestors: `id` in the decoded path chain, minus the node itself

use crate::models::{Node, NodeId, NodeQuery, OrderBy, Predicate};
use crate::tree::error::{TreeError, TreeResult};
use crate::tree::path_codec::{decode_ancestor_chain, encode_root_path, validate_path};

/// Identifier of a persisted node, or `NodeNotPersisted`
pub fn require_id(node: &Node) -> TreeResult<&NodeId> {
    node.id
        .as_ref()
        .ok_or_else(|| TreeError::node_not_persisted("node has no id"))
}

/// Identifier and path of a placed node, or `NodeNotPersisted`
pub fn require_placed(node: &Node) -> TreeResult<(&NodeId, &str)> {
    let id = require_id(node)?;
    if node.path.is_empty() {
        return Err(TreeError::node_not_persisted(format!(
            "node {} has no path",
            id
        )));
    }
    validate_path(&node.path)?;
    Ok((id, node.path.as_str()))
}

/// Single row by id
pub fn by_id(id: &NodeId) -> NodeQuery {
    NodeQuery::new(Predicate::IdEq { id: id.clone() })
}

/// Direct children of the node with `id`
pub fn children(id: &NodeId) -> NodeQuery {
    NodeQuery::new(Predicate::ParentEq { id: id.clone() }).with_order_by(OrderBy::LevelAsc)
}

/// Every proper descendant of `node`, shallowest first
pub fn descendants(node: &Node) -> TreeResult<NodeQuery> {
    let (id, path) = require_placed(node)?;
    let predicate = Predicate::PathPrefix {
        prefix: path.to_string(),
    }
    .and(Predicate::IdNe { id: id.clone() });
    Ok(NodeQuery::new(predicate).with_order_by(OrderBy::LevelAsc))
}

/// Every proper ancestor of `node`, root first
pub fn ancestors(node: &Node) -> TreeResult<NodeQuery> {
    let (id, path) = require_placed(node)?;
    let ids: Vec<NodeId> = decode_ancestor_chain(path)?
        .into_iter()
        .filter(|ancestor| ancestor != id)
        .collect();
    Ok(NodeQuery::new(Predicate::IdIn { ids }).with_order_by(OrderBy::LevelAsc))
}

/// Every root in the store
pub fn roots() -> NodeQuery {
    NodeQuery::new(Predicate::ParentIsNull).with_order_by(OrderBy::LevelAsc)
}

/// The whole tree under (and including) the root with `root_id`, shallowest
/// first. This is the canonical input for tree reconstruction.
pub fn subtree(root_id: &NodeId) -> TreeResult<NodeQuery> {
    Ok(NodeQuery::new(Predicate::PathPrefix {
        prefix: encode_root_path(root_id)?,
    })
    .with_order_by(OrderBy::LevelAsc))
}

/// Id of the root of the tree containing `node`
pub fn root_id_of(node: &Node) -> TreeResult<NodeId> {
    let (_, path) = require_placed(node)?;
    decode_ancestor_chain(path)?
        .into_iter()
        .next()
        .ok_or_else(|| TreeError::invalid_path(path, "path has no segments"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn placed(id: i64, path: &str, parent: Option<i64>, level: u32) -> Node {
        let mut node = Node::with_id(NodeId::from(id), String::new(), json!({}));
        node.path = path.to_string();
        node.parent_id = parent.map(NodeId::from);
        node.level = level;
        node
    }

    #[test]
    fn test_descendants_query() {
        let node = placed(5, "3/5/", Some(3), 1);
        let query = descendants(&node).unwrap();
        assert_eq!(query.order_by, OrderBy::LevelAsc);
        assert_eq!(
            query.predicate,
            Predicate::And {
                all: vec![
                    Predicate::PathPrefix {
                        prefix: "3/5/".to_string()
                    },
                    Predicate::IdNe {
                        id: NodeId::from(5)
                    },
                ]
            }
        );
    }

    #[test]
    fn test_ancestors_query_excludes_self() {
        let node = placed(9, "3/5/9/", Some(5), 2);
        let query = ancestors(&node).unwrap();
        assert_eq!(
            query.predicate,
            Predicate::IdIn {
                ids: vec![NodeId::from(3), NodeId::from(5)]
            }
        );
    }

    #[test]
    fn test_ancestors_of_root_is_empty_set() {
        let node = placed(3, "3/", None, 0);
        assert_eq!(
            ancestors(&node).unwrap().predicate,
            Predicate::IdIn { ids: vec![] }
        );
    }

    #[test]
    fn test_subtree_query_includes_root_prefix() {
        let query = subtree(&NodeId::from(12)).unwrap();
        assert_eq!(
            query.predicate,
            Predicate::PathPrefix {
                prefix: "12/".to_string()
            }
        );
    }

    #[test]
    fn test_unplaced_node_is_rejected() {
        let draft = Node::new("draft".to_string(), json!({}));
        assert!(matches!(
            descendants(&draft),
            Err(TreeError::NodeNotPersisted { .. })
        ));

        let saved_unplaced = Node::with_id(NodeId::from(1), String::new(), json!({}));
        assert!(matches!(
            ancestors(&saved_unplaced),
            Err(TreeError::NodeNotPersisted { .. })
        ));
    }

    #[test]
    fn test_root_id_of() {
        assert_eq!(
            root_id_of(&placed(9, "3/5/9/", Some(5), 2)).unwrap(),
            NodeId::from(3)
        );
    }
}

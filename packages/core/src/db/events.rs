//! Tree Events
//!
//! Events emitted by `TreeService` after a structural change has been
//! persisted. They follow the observer pattern, so callers can react to
//! placements and deletes (cache invalidation, audit, sync) without the tree
//! layer knowing about them.
//!
//! # Architecture
//!
//! Events are sent on a tokio broadcast channel. Sending never fails the
//! operation that produced the event; with no subscribers the event is dropped.
//!
//! # Event Flow
//!
//! 1. `TreeService` places, cascades or deletes
//! 2. Once every store call succeeded, a `TreeEvent` is broadcast
//! 3. All subscribers receive the event asynchronously

use crate::models::{Node, NodeId};
use serde::{Deserialize, Serialize};

/// Structural change notifications
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TreeEvent {
    /// A node received a new position (root, child or sibling placement)
    #[serde(rename_all = "camelCase")]
    NodePlaced {
        node: Node,
        /// Path before the placement; `None` for a node that was never placed
        old_path: Option<String>,
    },

    /// Descendants of a moved node had their path and level rewritten
    #[serde(rename_all = "camelCase")]
    SubtreeRewritten { root_id: NodeId, count: usize },

    /// A node and all of its descendants were deleted
    #[serde(rename_all = "camelCase")]
    SubtreeDeleted { root_id: NodeId, count: u64 },
}

impl TreeEvent {
    /// Get a string representation of the event type
    pub fn event_type(&self) -> &str {
        match self {
            TreeEvent::NodePlaced { .. } => "node:placed",
            TreeEvent::SubtreeRewritten { .. } => "subtree:rewritten",
            TreeEvent::SubtreeDeleted { .. } => "subtree:deleted",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// Subscribers forwarding events as JSON rely on this flat, tagged shape
    #[test]
    fn test_tree_event_serialization_contract() {
        let event = TreeEvent::SubtreeRewritten {
            root_id: NodeId::from(3),
            count: 4,
        };

        let parsed = serde_json::to_value(&event).unwrap();

        assert_eq!(
            parsed,
            json!({"type": "subtreeRewritten", "rootId": "3", "count": 4})
        );
        assert_eq!(event.event_type(), "subtree:rewritten");
    }

    #[test]
    fn test_node_placed_carries_old_path() {
        let mut node = Node::with_id(NodeId::from(9), "x".to_string(), json!({}));
        node.path = "9/".to_string();
        let event = TreeEvent::NodePlaced {
            node,
            old_path: Some("3/5/9/".to_string()),
        };

        let parsed = serde_json::to_value(&event).unwrap();
        assert_eq!(parsed.get("type").unwrap(), "nodePlaced");
        assert_eq!(parsed.get("oldPath").unwrap(), "3/5/9/");
        assert_eq!(parsed["node"]["path"], "9/");
    }
}

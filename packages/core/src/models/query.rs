//! Store Predicates
//!
//! Logical predicates and orderings a `NodeStore` must be able to evaluate.
//! They describe *what* to select; each store decides how (in-memory
//! evaluation, parameterized SQL, ...).

use super::node::{Node, NodeId};
use serde::{Deserialize, Serialize};

/// Row selection predicate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum Predicate {
    /// Every row
    All,
    /// `id = ?`
    IdEq { id: NodeId },
    /// `id != ?`
    IdNe { id: NodeId },
    /// `id IN (...)`; an empty set matches nothing
    IdIn { ids: Vec<NodeId> },
    /// `parent = ?`
    ParentEq { id: NodeId },
    /// `parent IS NULL`
    ParentIsNull,
    /// `path` starts with the given prefix (exact, no wildcards)
    PathPrefix { prefix: String },
    /// Conjunction of all inner predicates
    And { all: Vec<Predicate> },
}

impl Predicate {
    /// Evaluate the predicate against a single row
    pub fn matches(&self, node: &Node) -> bool {
        match self {
            Predicate::All => true,
            Predicate::IdEq { id } => node.id.as_ref() == Some(id),
            Predicate::IdNe { id } => node.id.as_ref() != Some(id),
            Predicate::IdIn { ids } => node.id.as_ref().is_some_and(|own| ids.contains(own)),
            Predicate::ParentEq { id } => node.parent_id.as_ref() == Some(id),
            Predicate::ParentIsNull => node.parent_id.is_none(),
            Predicate::PathPrefix { prefix } => node.path.starts_with(prefix.as_str()),
            Predicate::And { all } => all.iter().all(|p| p.matches(node)),
        }
    }

    pub fn and(self, other: Predicate) -> Predicate {
        match self {
            Predicate::And { mut all } => {
                all.push(other);
                Predicate::And { all }
            }
            first => Predicate::And {
                all: vec![first, other],
            },
        }
    }
}

/// Sort order specification for query results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderBy {
    /// Whatever order the store keeps rows in
    #[default]
    Unordered,
    /// Shallowest first; ties broken by id so results are deterministic
    LevelAsc,
}

impl OrderBy {
    /// Sort rows in place the way a SQL store would return them
    pub fn sort(self, nodes: &mut [Node]) {
        if self == OrderBy::LevelAsc {
            nodes.sort_by(|a, b| {
                a.level
                    .cmp(&b.level)
                    .then_with(|| id_key(a).cmp(&id_key(b)))
            });
        }
    }
}

/// Numeric ids order numerically, anything else after them lexically
fn id_key(node: &Node) -> (i64, &str) {
    match &node.id {
        Some(id) => (id.as_i64().unwrap_or(i64::MAX), id.as_str()),
        None => (i64::MAX, ""),
    }
}

/// A predicate plus ordering, ready to hand to a store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeQuery {
    pub predicate: Predicate,
    #[serde(default)]
    pub order_by: OrderBy,
}

impl NodeQuery {
    pub fn new(predicate: Predicate) -> Self {
        Self {
            predicate,
            order_by: OrderBy::Unordered,
        }
    }

    pub fn with_order_by(mut self, order_by: OrderBy) -> Self {
        self.order_by = order_by;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn node(id: i64, path: &str, parent: Option<i64>) -> Node {
        let mut node = Node::with_id(NodeId::from(id), String::new(), json!({}));
        node.path = path.to_string();
        node.parent_id = parent.map(NodeId::from);
        node
    }

    #[test]
    fn test_path_prefix_is_literal() {
        let pred = Predicate::PathPrefix {
            prefix: "1/".to_string(),
        };
        assert!(pred.matches(&node(1, "1/", None)));
        assert!(pred.matches(&node(2, "1/2/", Some(1))));
        // "11/" shares the character but not the segment
        assert!(!pred.matches(&node(11, "11/", None)));
    }

    #[test]
    fn test_and_flattens() {
        let pred = Predicate::ParentIsNull
            .and(Predicate::IdNe {
                id: NodeId::from(1),
            })
            .and(Predicate::All);
        match &pred {
            Predicate::And { all } => assert_eq!(all.len(), 3),
            other => panic!("expected conjunction, got {:?}", other),
        }
        assert!(pred.matches(&node(2, "2/", None)));
        assert!(!pred.matches(&node(1, "1/", None)));
    }

    #[test]
    fn test_level_order_breaks_ties_by_numeric_id() {
        let mut nodes = vec![
            {
                let mut n = node(10, "1/10/", Some(1));
                n.level = 1;
                n
            },
            node(1, "1/", None),
            {
                let mut n = node(9, "1/9/", Some(1));
                n.level = 1;
                n
            },
        ];
        OrderBy::LevelAsc.sort(&mut nodes);
        let ids: Vec<&str> = nodes.iter().map(|n| n.id.as_ref().unwrap().as_str()).collect();
        assert_eq!(ids, vec!["1", "9", "10"]);
    }

    #[test]
    fn test_empty_id_set_matches_nothing() {
        let pred = Predicate::IdIn { ids: vec![] };
        assert!(!pred.matches(&node(1, "1/", None)));
    }

    #[test]
    fn test_predicate_serialization_contract() {
        let pred = Predicate::ParentEq {
            id: NodeId::from(5),
        };
        let value = serde_json::to_value(&pred).unwrap();
        assert_eq!(value, json!({"op": "parentEq", "id": "5"}));
    }
}

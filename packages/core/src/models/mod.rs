//! Data Models
//!
//! - `Node` - The tree record stored in a flat table
//! - `NodeId` - Store-assigned identifier embedded in materialized paths
//! - `Predicate` / `NodeQuery` - Logical selections a store evaluates

mod node;
mod query;

pub use node::{Node, NodeId, ValidationError};
pub use query::{NodeQuery, OrderBy, Predicate};

//! Database Layer
//!
//! This module handles persistence of tree rows:
//!
//! - The [`NodeStore`] trait the tree service persists through
//! - [`TursoStore`], an embedded libsql backend with a configurable table
//! - [`MemoryStore`], an in-process backend for tests and snapshots
//! - [`TreeEvent`] notifications broadcast after structural changes
//!
//! # Architecture
//!
//! Stores are flat: each node is one row carrying its materialized path,
//! parent reference and level. Nothing in this layer understands the tree;
//! it only evaluates the logical predicates in [`crate::models::Predicate`].

mod database;
mod error;
pub mod events;
mod memory_store;
mod node_store;
mod turso_store;

pub use database::DatabaseService;
pub use error::DatabaseError;
pub use events::TreeEvent;
pub use memory_store::MemoryStore;
pub use node_store::NodeStore;
pub use turso_store::TursoStore;

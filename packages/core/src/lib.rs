//! PathTree Core
//!
//! Materialized-path trees on top of flat storage. Every node row carries its
//! full ancestor chain as a path (`3/5/9/`), a depth counter and a parent
//! reference; the tree is maintained as nodes are placed and moved, and
//! rebuilt in memory from level-ordered rows when needed.
//!
//! # Architecture
//!
//! - **Flat storage**: Stores only understand rows and predicates; no
//!   recursive queries are ever issued
//! - **Prefix queries**: Descendants and subtrees are path-prefix matches
//! - **Cascading moves**: Moving a node rewrites the paths of its whole subtree
//! - **libsql/Turso**: Embedded SQLite-compatible backend, plus an in-memory one
//!
//! # Modules
//!
//! - [`models`] - Node entity and store predicates
//! - [`tree`] - Path codec, query builders and tree reconstruction
//! - [`services`] - `TreeService`: placement, cascade, structural queries
//! - [`db`] - `NodeStore` trait with libsql and in-memory backends
//! - [`config`] - Store configuration (table and column mapping)
//! - [`logging`] - `tracing` subscriber setup

pub mod config;
pub mod db;
pub mod logging;
pub mod models;
pub mod services;
pub mod tree;

// Re-export commonly used types
pub use config::{StoreConfig, TreeColumns};
pub use db::{DatabaseService, MemoryStore, NodeStore, TreeEvent, TursoStore};
pub use models::*;
pub use services::*;
pub use tree::{Presenter, PresenterRegistry, TreeError, TreeResult};

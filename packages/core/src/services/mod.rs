//! Business Services
//!
//! - `TreeService` - Placement, cascade, structural queries and tree loading
//!
//! Services coordinate between the store layer and the pure tree functions
//! in [`crate::tree`].

pub mod tree_service;

pub use tree_service::TreeService;

//! Tree Core
//!
//! Store-independent pieces of the materialized-path tree:
//!
//! - [`path_codec`] - Encoding/decoding of `root/.../self/` paths
//! - [`queries`] - Predicates for children, descendants, ancestors, roots and subtrees
//! - [`builder`] - Flat, level-ordered rows → owned parent/children graph
//! - [`error`] - `TreeError` shared by all tree operations

pub mod builder;
pub mod error;
pub mod path_codec;
pub mod queries;

pub use builder::{
    build_complete_tree, build_from_sequence, build_subtree, Presenter, PresenterRegistry,
};
pub use error::{TreeError, TreeResult};
pub use path_codec::{
    decode_ancestor_chain, encode_child_path, encode_root_path, encode_sibling_path, SEPARATOR,
};

//! Materialized Path Codec
//!
//! Pure conversions between a chain of node ids and its path encoding.
//! A path is the ancestor chain from the root down to the node itself, every
//! id followed by [`SEPARATOR`]:
//!
//! ```text
//! root        3/
//! child       3/5/
//! grandchild  3/5/9/
//! ```
//!
//! No function here performs I/O.

use crate::models::NodeId;
use crate::tree::error::{TreeError, TreeResult};

/// Segment terminator for materialized paths
pub const SEPARATOR: char = '/';

/// Check that `path` is a well-formed, non-empty chain of segments.
pub fn validate_path(path: &str) -> TreeResult<()> {
    if path.is_empty() {
        return Err(TreeError::invalid_path(path, "path is empty"));
    }
    if !path.ends_with(SEPARATOR) {
        return Err(TreeError::invalid_path(
            path,
            "path does not end with the separator",
        ));
    }
    if path[..path.len() - 1].split(SEPARATOR).any(str::is_empty) {
        return Err(TreeError::invalid_path(path, "path contains an empty segment"));
    }
    Ok(())
}

fn check_id(id: &NodeId) -> TreeResult<()> {
    let raw = id.as_str();
    if raw.is_empty() || raw.contains(SEPARATOR) {
        return Err(TreeError::invalid_path(
            raw,
            "id cannot be embedded in a path",
        ));
    }
    Ok(())
}

/// Path of a root node: `id/`
pub fn encode_root_path(id: &NodeId) -> TreeResult<String> {
    check_id(id)?;
    Ok(format!("{}{}", id, SEPARATOR))
}

/// Path of a child of the node at `parent_path`: `parent_path + id/`
pub fn encode_child_path(parent_path: &str, id: &NodeId) -> TreeResult<String> {
    validate_path(parent_path)?;
    check_id(id)?;
    Ok(format!("{}{}{}", parent_path, id, SEPARATOR))
}

/// Path of a node placed next to the node at `sibling_path`.
///
/// The sibling's own trailing segment is dropped whatever its lexical form,
/// so the result shares the sibling's parent prefix.
pub fn encode_sibling_path(sibling_path: &str, id: &NodeId) -> TreeResult<String> {
    check_id(id)?;
    Ok(format!("{}{}{}", parent_prefix(sibling_path)?, id, SEPARATOR))
}

/// Everything before the last segment of `path` (empty for a root path)
pub fn parent_prefix(path: &str) -> TreeResult<&str> {
    validate_path(path)?;
    let trimmed = &path[..path.len() - 1];
    Ok(match trimmed.rfind(SEPARATOR) {
        Some(idx) => &path[..=idx],
        None => "",
    })
}

/// Ordered ancestor chain encoded in `path`, root first, self last.
pub fn decode_ancestor_chain(path: &str) -> TreeResult<Vec<NodeId>> {
    validate_path(path)?;
    path[..path.len() - 1]
        .split(SEPARATOR)
        .map(|segment| {
            NodeId::new(segment).map_err(|e| TreeError::invalid_path(path, e.to_string()))
        })
        .collect()
}

/// Number of segments in `path`; equals `level + 1` for a consistent node
pub fn depth_of(path: &str) -> TreeResult<usize> {
    validate_path(path)?;
    Ok(path.matches(SEPARATOR).count())
}

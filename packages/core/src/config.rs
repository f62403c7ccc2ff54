//! Store Configuration
//!
//! Settings for the libsql-backed store: where the database lives, which
//! table holds the nodes and which columns carry the tree encoding. Every
//! field has a default, so a partial JSON document is a valid configuration:
//!
//! ```rust
//! use pathtree_core::config::StoreConfig;
//!
//! let config: StoreConfig = serde_json::from_str(
//!     r#"{ "dbPath": "./data/tree.db", "columns": { "parent": "parent_node" } }"#,
//! ).unwrap();
//! assert_eq!(config.table, "nodes");
//! assert_eq!(config.columns.parent, "parent_node");
//! assert_eq!(config.columns.path, "path");
//! ```

use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default busy timeout applied to every connection (milliseconds)
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5000;

/// Column names holding the tree encoding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeColumns {
    /// Materialized path column
    pub path: String,

    /// Parent reference column
    pub parent: String,

    /// Depth column
    pub level: String,
}

impl Default for TreeColumns {
    fn default() -> Self {
        Self {
            path: "path".to_string(),
            parent: "parent_id".to_string(),
            level: "level".to_string(),
        }
    }
}

/// Configuration for `DatabaseService` / `TursoStore`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StoreConfig {
    /// Path to the database file
    pub db_path: PathBuf,

    /// Table holding the node rows
    pub table: String,

    /// Tree column mapping
    pub columns: TreeColumns,

    /// SQLite busy timeout in milliseconds
    pub busy_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("./data/pathtree.db"),
            table: "nodes".to_string(),
            columns: TreeColumns::default(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }
}

impl StoreConfig {
    /// Default configuration for the database at `db_path`
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            ..Self::default()
        }
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    pub fn with_columns(mut self, columns: TreeColumns) -> Self {
        self.columns = columns;
        self
    }

    /// Check that table and column names are usable as bare SQL identifiers
    /// and that no two tree columns collide with each other or with the
    /// fixed payload columns.
    pub fn validate(&self) -> Result<(), DatabaseError> {
        let names = [
            ("table", &self.table),
            ("path column", &self.columns.path),
            ("parent column", &self.columns.parent),
            ("level column", &self.columns.level),
        ];
        for (what, name) in names {
            if !is_identifier(name) {
                return Err(DatabaseError::invalid_config(format!(
                    "{} '{}' is not a valid SQL identifier",
                    what, name
                )));
            }
        }

        let mut columns = vec![
            self.columns.path.to_ascii_lowercase(),
            self.columns.parent.to_ascii_lowercase(),
            self.columns.level.to_ascii_lowercase(),
        ];
        columns.extend(RESERVED_COLUMNS.iter().map(|c| c.to_string()));
        let total = columns.len();
        columns.sort();
        columns.dedup();
        if columns.len() != total {
            return Err(DatabaseError::invalid_config(format!(
                "tree columns must be distinct and must not reuse {:?}",
                RESERVED_COLUMNS
            )));
        }

        if self.busy_timeout_ms == 0 {
            return Err(DatabaseError::invalid_config(
                "busy_timeout_ms must be greater than zero",
            ));
        }
        Ok(())
    }
}

/// Payload columns every node table carries
pub(crate) const RESERVED_COLUMNS: [&str; 5] =
    ["id", "content", "properties", "created_at", "modified_at"];

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

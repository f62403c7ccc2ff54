//! TursoStore - NodeStore Implementation for Turso/libsql Backend
//!
//! Persists nodes in a single flat table managed by [`DatabaseService`].
//! Predicates are compiled to parameterized SQL:
//!
//! | Predicate      | SQL                                   |
//! |----------------|---------------------------------------|
//! | `IdEq`         | `id = ?`                              |
//! | `IdIn`         | `id IN (?, ...)` (`1 = 0` when empty) |
//! | `ParentEq`     | `<parent> = ?`                        |
//! | `ParentIsNull` | `<parent> IS NULL`                    |
//! | `PathPrefix`   | `substr(<path>, 1, ?) = ?`            |
//!
//! Path prefixes are compared with `substr` rather than `LIKE` so ids
//! containing `%` or `_` are never treated as wildcards.
//!
//! # Examples
//!
//! ```rust,no_run
//! use pathtree_core::config::StoreConfig;
//! use pathtree_core::db::{DatabaseService, NodeStore, TursoStore};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let db = Arc::new(DatabaseService::new(StoreConfig::new("./data/tree.db")).await?);
//!     let store: Arc<dyn NodeStore> = Arc::new(TursoStore::new(db));
//!     Ok(())
//! }
//! ```

use crate::config::TreeColumns;
use crate::db::node_store::NodeStore;
use crate::db::DatabaseService;
use crate::models::{Node, NodeId, NodeQuery, OrderBy, Predicate};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use libsql::{Row, Value};
use std::sync::Arc;

/// TursoStore implements NodeStore for the libsql backend
pub struct TursoStore {
    db: Arc<DatabaseService>,
}

/// Bind an id as an integer when possible so it matches the INTEGER key
fn id_value(id: &NodeId) -> Value {
    match id.as_i64() {
        Some(numeric) => Value::Integer(numeric),
        None => Value::Text(id.as_str().to_string()),
    }
}

/// Compile `predicate` into a WHERE clause, appending its bound values
fn compile_predicate(predicate: &Predicate, cols: &TreeColumns, params: &mut Vec<Value>) -> String {
    match predicate {
        Predicate::All => "1 = 1".to_string(),
        Predicate::IdEq { id } => {
            params.push(id_value(id));
            "id = ?".to_string()
        }
        Predicate::IdNe { id } => {
            params.push(id_value(id));
            "id != ?".to_string()
        }
        Predicate::IdIn { ids } if ids.is_empty() => "1 = 0".to_string(),
        Predicate::IdIn { ids } => {
            params.extend(ids.iter().map(id_value));
            let placeholders = vec!["?"; ids.len()].join(", ");
            format!("id IN ({})", placeholders)
        }
        Predicate::ParentEq { id } => {
            params.push(id_value(id));
            format!("{} = ?", cols.parent)
        }
        Predicate::ParentIsNull => format!("{} IS NULL", cols.parent),
        Predicate::PathPrefix { prefix } => {
            params.push(Value::Integer(prefix.chars().count() as i64));
            params.push(Value::Text(prefix.clone()));
            format!("substr({}, 1, ?) = ?", cols.path)
        }
        Predicate::And { all } if all.is_empty() => "1 = 1".to_string(),
        Predicate::And { all } => all
            .iter()
            .map(|inner| format!("({})", compile_predicate(inner, cols, params)))
            .collect::<Vec<_>>()
            .join(" AND "),
    }
}

impl TursoStore {
    pub fn new(db: Arc<DatabaseService>) -> Self {
        Self { db }
    }

    fn table(&self) -> &str {
        &self.db.config.table
    }

    fn columns(&self) -> &TreeColumns {
        &self.db.config.columns
    }

    fn select_sql(&self) -> String {
        let cols = self.columns();
        format!(
            "SELECT id, {}, {}, {}, content, properties, created_at, modified_at FROM {}",
            cols.path,
            cols.parent,
            cols.level,
            self.table()
        )
    }

    /// Parse timestamp from database - handles both SQLite and RFC3339 formats
    ///
    /// SQLite CURRENT_TIMESTAMP returns: "YYYY-MM-DD HH:MM:SS"
    /// Rows written by this store use RFC3339: "YYYY-MM-DDTHH:MM:SS.sss+00:00"
    fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(dt.with_timezone(&Utc));
        }

        if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
            return Ok(naive.and_utc());
        }

        Err(anyhow::anyhow!(
            "Unable to parse timestamp '{}' as SQLite or RFC3339 format",
            s
        ))
    }

    /// Convert libsql::Row to Node model
    ///
    /// Expected columns (in order): id, path, parent, level, content,
    /// properties (JSON text), created_at, modified_at
    fn row_to_node(row: &Row) -> Result<Node> {
        let id: i64 = row.get(0).context("Failed to get id")?;
        let path: String = row.get(1).context("Failed to get path")?;
        let parent: Option<i64> = row.get(2).context("Failed to get parent")?;
        let level: i64 = row.get(3).context("Failed to get level")?;
        let content: String = row.get(4).context("Failed to get content")?;
        let properties_json: String = row.get(5).context("Failed to get properties")?;
        let created_at_str: String = row.get(6).context("Failed to get created_at")?;
        let modified_at_str: String = row.get(7).context("Failed to get modified_at")?;

        let mut node = Node::with_id(
            NodeId::from(id),
            content,
            serde_json::from_str(&properties_json).context("Failed to parse properties JSON")?,
        );
        node.path = path;
        node.parent_id = parent.map(NodeId::from);
        node.level = u32::try_from(level).context("Stored level is out of range")?;
        node.created_at =
            Self::parse_timestamp(&created_at_str).context("Failed to parse created_at")?;
        node.modified_at =
            Self::parse_timestamp(&modified_at_str).context("Failed to parse modified_at")?;
        Ok(node)
    }

    async fn query_nodes(&self, sql: &str, params: Vec<Value>) -> Result<Vec<Node>> {
        let conn = self.db.connect_with_timeout().await?;
        let mut rows = conn
            .query(sql, params)
            .await
            .with_context(|| format!("Failed to execute query: {}", sql))?;

        let mut nodes = Vec::new();
        while let Some(row) = rows.next().await.context("Failed to read row")? {
            nodes.push(Self::row_to_node(&row)?);
        }
        Ok(nodes)
    }
}

#[async_trait]
impl NodeStore for TursoStore {
    async fn save(&self, mut node: Node) -> Result<Node> {
        let conn = self.db.connect_with_timeout().await?;
        let cols = self.columns().clone();
        let table = self.table().to_string();

        let now = Utc::now();
        node.modified_at = now;
        let properties_json =
            serde_json::to_string(&node.properties).context("Failed to serialize properties")?;
        let parent = node
            .parent_id
            .as_ref()
            .map(id_value)
            .unwrap_or(Value::Null);

        match node.id.clone() {
            None => {
                node.created_at = now;
                conn.execute(
                    &format!(
                        "INSERT INTO {table} ({path}, {parent}, {level}, content, properties, created_at, modified_at)
                         VALUES (?, ?, ?, ?, ?, ?, ?)",
                        table = table,
                        path = cols.path,
                        parent = cols.parent,
                        level = cols.level,
                    ),
                    vec![
                        Value::Text(node.path.clone()),
                        parent,
                        Value::Integer(i64::from(node.level)),
                        Value::Text(node.content.clone()),
                        Value::Text(properties_json),
                        Value::Text(node.created_at.to_rfc3339()),
                        Value::Text(node.modified_at.to_rfc3339()),
                    ],
                )
                .await
                .context("Failed to insert node")?;

                let id = NodeId::from(conn.last_insert_rowid());
                tracing::debug!("Inserted node {}", id);
                node.id = Some(id);
            }
            Some(id) => {
                let numeric = id
                    .as_i64()
                    .ok_or_else(|| anyhow::anyhow!("Node id '{}' is not an integer key", id))?;

                conn.execute(
                    &format!(
                        "INSERT INTO {table} (id, {path}, {parent}, {level}, content, properties, created_at, modified_at)
                         VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                         ON CONFLICT(id) DO UPDATE SET
                            {path} = excluded.{path},
                            {parent} = excluded.{parent},
                            {level} = excluded.{level},
                            content = excluded.content,
                            properties = excluded.properties,
                            modified_at = excluded.modified_at",
                        table = table,
                        path = cols.path,
                        parent = cols.parent,
                        level = cols.level,
                    ),
                    vec![
                        Value::Integer(numeric),
                        Value::Text(node.path.clone()),
                        parent,
                        Value::Integer(i64::from(node.level)),
                        Value::Text(node.content.clone()),
                        Value::Text(properties_json),
                        Value::Text(node.created_at.to_rfc3339()),
                        Value::Text(node.modified_at.to_rfc3339()),
                    ],
                )
                .await
                .with_context(|| format!("Failed to save node {}", id))?;

                // An existing row keeps its original creation time
                let mut rows = conn
                    .query(
                        &format!("SELECT created_at FROM {} WHERE id = ?", table),
                        vec![Value::Integer(numeric)],
                    )
                    .await
                    .context("Failed to read back created_at")?;
                if let Some(row) = rows.next().await.context("Failed to read row")? {
                    let created_at: String = row.get(0).context("Failed to get created_at")?;
                    node.created_at = Self::parse_timestamp(&created_at)?;
                }
            }
        }

        Ok(node)
    }

    async fn find_one_by_id(&self, id: &NodeId) -> Result<Option<Node>> {
        let sql = format!("{} WHERE id = ?", self.select_sql());
        Ok(self.query_nodes(&sql, vec![id_value(id)]).await?.into_iter().next())
    }

    async fn find_where(&self, query: NodeQuery) -> Result<Vec<Node>> {
        let mut params = Vec::new();
        let clause = compile_predicate(&query.predicate, self.columns(), &mut params);
        let mut sql = format!("{} WHERE {}", self.select_sql(), clause);
        if query.order_by == OrderBy::LevelAsc {
            sql.push_str(&format!(" ORDER BY {} ASC, id ASC", self.columns().level));
        }
        self.query_nodes(&sql, params).await
    }

    async fn count_where(&self, predicate: Predicate) -> Result<u64> {
        let mut params = Vec::new();
        let clause = compile_predicate(&predicate, self.columns(), &mut params);
        let sql = format!("SELECT COUNT(*) FROM {} WHERE {}", self.table(), clause);

        let conn = self.db.connect_with_timeout().await?;
        let mut rows = conn
            .query(&sql, params)
            .await
            .with_context(|| format!("Failed to execute query: {}", sql))?;
        let count: i64 = match rows.next().await.context("Failed to read row")? {
            Some(row) => row.get(0).context("Failed to get count")?,
            None => 0,
        };
        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn delete_where(&self, predicate: Predicate) -> Result<u64> {
        let mut params = Vec::new();
        let clause = compile_predicate(&predicate, self.columns(), &mut params);
        let sql = format!("DELETE FROM {} WHERE {}", self.table(), clause);

        let conn = self.db.connect_with_timeout().await?;
        conn.execute(&sql, params)
            .await
            .with_context(|| format!("Failed to execute delete: {}", sql))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use serde_json::json;
    use tempfile::TempDir;

    async fn create_test_store() -> Result<(TursoStore, TempDir)> {
        let temp_dir = TempDir::new()?;
        let db_path = temp_dir.path().join("test.db");
        let db = Arc::new(DatabaseService::new(StoreConfig::new(db_path)).await?);
        Ok((TursoStore::new(db), temp_dir))
    }

    #[test]
    fn test_compile_nested_predicate() {
        let cols = TreeColumns::default();
        let mut params = Vec::new();
        let predicate = Predicate::PathPrefix {
            prefix: "3/5/".to_string(),
        }
        .and(Predicate::IdNe {
            id: NodeId::from(5),
        });

        let clause = compile_predicate(&predicate, &cols, &mut params);

        assert_eq!(clause, "(substr(path, 1, ?) = ?) AND (id != ?)");
        assert_eq!(
            params,
            vec![
                Value::Integer(4),
                Value::Text("3/5/".to_string()),
                Value::Integer(5)
            ]
        );
    }

    #[test]
    fn test_compile_empty_id_set() {
        let mut params = Vec::new();
        let clause = compile_predicate(
            &Predicate::IdIn { ids: vec![] },
            &TreeColumns::default(),
            &mut params,
        );
        assert_eq!(clause, "1 = 0");
        assert!(params.is_empty());
    }

    #[tokio::test]
    async fn test_save_assigns_id_and_round_trips_fields() -> Result<()> {
        let (store, _temp_dir) = create_test_store().await?;

        let mut node = Node::new("Chapter".to_string(), json!({"pages": 12}));
        node.path = "pending/".to_string();
        let saved = store.save(node).await?;
        let id = saved.id.clone().expect("id assigned on insert");

        let fetched = store.find_one_by_id(&id).await?.expect("row exists");
        assert_eq!(fetched.content, "Chapter");
        assert_eq!(fetched.properties, json!({"pages": 12}));
        assert_eq!(fetched.path, "pending/");
        assert_eq!(fetched.level, 0);
        assert!(fetched.parent_id.is_none());

        Ok(())
    }

    #[tokio::test]
    async fn test_save_existing_updates_in_place() -> Result<()> {
        let (store, _temp_dir) = create_test_store().await?;

        let mut saved = store.save(Node::new("a".to_string(), json!({}))).await?;
        let created_at = saved.created_at;
        let id = saved.id.clone().unwrap();

        saved.path = format!("{}/", id);
        saved.level = 0;
        store.save(saved).await?;

        let fetched = store.find_one_by_id(&id).await?.unwrap();
        assert_eq!(fetched.path, format!("{}/", id));
        assert_eq!(fetched.created_at.timestamp(), created_at.timestamp());
        assert_eq!(store.count_where(Predicate::All).await?, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_prefix_match_is_literal() -> Result<()> {
        let (store, _temp_dir) = create_test_store().await?;

        for path in ["1/", "1/2/", "11/", "1%/"] {
            let mut node = Node::new(path.to_string(), json!({}));
            node.path = path.to_string();
            store.save(node).await?;
        }

        let found = store
            .find_where(NodeQuery::new(Predicate::PathPrefix {
                prefix: "1/".to_string(),
            }))
            .await?;
        let mut paths: Vec<String> = found.into_iter().map(|n| n.path).collect();
        paths.sort();
        assert_eq!(paths, vec!["1/", "1/2/"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_where_reports_count() -> Result<()> {
        let (store, _temp_dir) = create_test_store().await?;
        for _ in 0..3 {
            store.save(Node::new("x".to_string(), json!({}))).await?;
        }

        let deleted = store
            .delete_where(Predicate::IdIn {
                ids: vec![NodeId::from(1), NodeId::from(3)],
            })
            .await?;

        assert_eq!(deleted, 2);
        assert_eq!(store.count_where(Predicate::All).await?, 1);
        Ok(())
    }
}

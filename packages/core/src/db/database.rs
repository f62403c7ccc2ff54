//! Database Connection Management
//!
//! This module provides connection handling and schema initialization for the
//! libsql-backed node table.
//!
//! # Architecture
//!
//! - **Flat table**: One row per node; the tree lives in the path, parent and
//!   level columns (names configurable through [`StoreConfig`])
//! - **WAL mode**: Write-Ahead Logging for better concurrency
//! - **Indexed prefixes**: The path column is indexed so subtree fetches and
//!   cascades stay cheap
//!
//! # Database Connection Patterns
//!
//! **ALWAYS use `connect_with_timeout()` in async functions** so concurrent
//! writers wait for the busy timeout instead of failing with `SQLITE_BUSY`.
//!
//! ```no_run
//! # use pathtree_core::config::StoreConfig;
//! # use pathtree_core::db::DatabaseService;
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let db_service = DatabaseService::new(StoreConfig::new("./data/tree.db")).await?;
//! let conn = db_service.connect_with_timeout().await?;
//! # Ok(())
//! # }
//! ```

use crate::config::StoreConfig;
use crate::db::error::DatabaseError;
use libsql::{Builder, Database};
use std::sync::Arc;

/// Database service for managing the libsql connection and schema
#[derive(Clone)]
pub struct DatabaseService {
    /// libsql database handle (wrapped in Arc for sharing)
    pub db: Arc<Database>,

    /// Validated store configuration
    pub config: StoreConfig,
}

impl std::fmt::Debug for DatabaseService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseService")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl DatabaseService {
    /// Open (or create) the database described by `config`
    ///
    /// This will:
    /// 1. Validate table and column names
    /// 2. Ensure the parent directory exists (create if needed)
    /// 3. Open/create the database file
    /// 4. Initialize the schema (CREATE TABLE IF NOT EXISTS)
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if:
    /// - The configuration is invalid
    /// - Parent directory cannot be created
    /// - Database connection fails
    /// - Schema initialization fails
    pub async fn new(config: StoreConfig) -> Result<Self, DatabaseError> {
        config.validate()?;

        let db_path = config.db_path.clone();
        let is_new_database = !db_path.exists();

        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    if e.kind() == std::io::ErrorKind::PermissionDenied {
                        DatabaseError::permission_denied(db_path.clone())
                    } else {
                        DatabaseError::DirectoryCreationFailed(e)
                    }
                })?;
            }
        }

        let db = Builder::new_local(&db_path)
            .build()
            .await
            .map_err(|e| DatabaseError::connection_failed(db_path.clone(), e))?;

        let service = Self {
            db: Arc::new(db),
            config,
        };

        service.initialize_schema(is_new_database).await?;

        tracing::info!(
            "Opened node store at {:?} (table '{}')",
            service.config.db_path,
            service.config.table
        );

        Ok(service)
    }

    /// Execute a PRAGMA statement
    ///
    /// PRAGMA statements return rows, so we must use query() instead of execute().
    async fn execute_pragma(
        &self,
        conn: &libsql::Connection,
        pragma: &str,
    ) -> Result<(), DatabaseError> {
        let mut stmt = conn.prepare(pragma).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute '{}': {}", pragma, e))
        })?;
        let _ = stmt.query(()).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute '{}': {}", pragma, e))
        })?;
        Ok(())
    }

    /// Create the node table and its indexes (idempotent)
    async fn initialize_schema(&self, is_new_database: bool) -> Result<(), DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        self.execute_pragma(&conn, "PRAGMA journal_mode = WAL")
            .await?;

        let table = &self.config.table;
        let cols = &self.config.columns;

        conn.execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS {table} (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    {path} TEXT NOT NULL DEFAULT '',
                    {parent} INTEGER,
                    {level} INTEGER NOT NULL DEFAULT 0,
                    content TEXT NOT NULL DEFAULT '',
                    properties JSON NOT NULL DEFAULT '{{}}',
                    created_at TEXT NOT NULL,
                    modified_at TEXT NOT NULL
                )",
                table = table,
                path = cols.path,
                parent = cols.parent,
                level = cols.level,
            ),
            (),
        )
        .await
        .map_err(|e| {
            DatabaseError::initialization_failed(format!("Failed to create {} table: {}", table, e))
        })?;

        for column in [&cols.path, &cols.parent, &cols.level] {
            conn.execute(
                &format!(
                    "CREATE INDEX IF NOT EXISTS idx_{table}_{column} ON {table}({column})",
                    table = table,
                    column = column
                ),
                (),
            )
            .await
            .map_err(|e| {
                DatabaseError::initialization_failed(format!(
                    "Failed to create index on {}.{}: {}",
                    table, column, e
                ))
            })?;
        }

        // Flush the fresh schema out of the WAL so the file is complete on disk
        if is_new_database {
            self.execute_pragma(&conn, "PRAGMA wal_checkpoint(TRUNCATE)")
                .await?;
        }

        Ok(())
    }

    /// Get a connection with the configured busy timeout applied
    ///
    /// Use this in every async function that touches the database.
    pub async fn connect_with_timeout(&self) -> Result<libsql::Connection, DatabaseError> {
        let conn = self.db.connect().map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to connect to database: {}", e))
        })?;

        self.execute_pragma(
            &conn,
            &format!("PRAGMA busy_timeout = {}", self.config.busy_timeout_ms),
        )
        .await?;

        Ok(conn)
    }
}

//! Database Connection Management
//!
//! This module provides database connection and schema initialization using
//! embedded libsql for the `tree_nodes` table.
//!
//! # Architecture
//!
//! - **Path-agnostic**: Accepts any file path; parent directories are created
//! - **WAL mode**: Write-Ahead Logging so concurrent subtree reads don't block
//! - **Idempotent schema**: `CREATE ... IF NOT EXISTS`, safe on every start
//! - **No parent foreign key**: deleting a parent may leave orphans, so
//!   `parent_id` is a plain indexed column
//!
//! # Connections in async code
//!
//! Use `connect_with_timeout()` in async functions. It sets a busy timeout so
//! concurrent writers wait instead of failing with `SQLITE_BUSY`.
//!
//! ```no_run
//! # use treenode_core::db::DatabaseService;
//! # use std::path::PathBuf;
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let db_service = DatabaseService::new(PathBuf::from("./data/tree_nodes.db")).await?;
//! let conn = db_service.connect_with_timeout().await?;
//! # Ok(())
//! # }
//! ```

use crate::db::error::DatabaseError;
use libsql::{Builder, Database};
use std::path::PathBuf;
use std::sync::Arc;

/// Busy timeout applied to every async connection (milliseconds)
const BUSY_TIMEOUT_MS: u32 = 5000;

/// Database service for managing the libsql connection and schema
#[derive(Debug, Clone)]
pub struct DatabaseService {
    /// libsql database handle (wrapped in Arc for sharing)
    pub db: Arc<Database>,

    /// Path to the database file
    pub db_path: PathBuf,
}

impl DatabaseService {
    /// Create a new DatabaseService with the specified database path
    ///
    /// This will:
    /// 1. Ensure the parent directory exists (create if needed)
    /// 2. Open/create the database file
    /// 3. Enable WAL mode and the busy timeout
    /// 4. Create the `tree_nodes` table and its parent index
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the directory cannot be created, the
    /// database cannot be opened, or schema initialization fails.
    pub async fn new(db_path: PathBuf) -> Result<Self, DatabaseError> {
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
            db_path,
        };

        service.initialize_schema().await?;
        tracing::debug!("Database ready at {}", service.db_path.display());

        Ok(service)
    }

    /// Execute a PRAGMA statement
    ///
    /// PRAGMA statements return rows, so they go through query() rather
    /// than execute().
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

    /// Initialize database schema and configuration
    ///
    /// # Schema
    ///
    /// - `tree_nodes`: one row per node; `is_root` is derived from `parent_id`
    ///   and not stored
    /// - `idx_tree_nodes_parent`: secondary index for child lookups
    async fn initialize_schema(&self) -> Result<(), DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        self.execute_pragma(&conn, "PRAGMA journal_mode = WAL")
            .await?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS tree_nodes (
                node_id INTEGER PRIMARY KEY AUTOINCREMENT,
                node_name TEXT NOT NULL,
                description TEXT,
                creation_date TEXT NOT NULL,
                parent_id INTEGER,
                node_level INTEGER NOT NULL DEFAULT 0
            )",
            (),
        )
        .await
        .map_err(|e| {
            DatabaseError::initialization_failed(format!(
                "Failed to create tree_nodes table: {}",
                e
            ))
        })?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_tree_nodes_parent ON tree_nodes(parent_id)",
            (),
        )
        .await
        .map_err(|e| {
            DatabaseError::initialization_failed(format!(
                "Failed to create index 'idx_tree_nodes_parent': {}",
                e
            ))
        })?;

        Ok(())
    }

    /// Get a connection to the database
    ///
    /// Only for synchronous, single-threaded contexts. Async code should use
    /// `connect_with_timeout()`.
    pub fn connect(&self) -> Result<libsql::Connection, DatabaseError> {
        self.db.connect().map_err(DatabaseError::LibsqlError)
    }

    /// Get an async connection with busy timeout configured
    pub async fn connect_with_timeout(&self) -> Result<libsql::Connection, DatabaseError> {
        let conn = self.connect()?;

        self.execute_pragma(&conn, &format!("PRAGMA busy_timeout = {}", BUSY_TIMEOUT_MS))
            .await?;

        Ok(conn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn single_string(conn: &libsql::Connection, sql: &str) -> String {
        let mut rows = conn.query(sql, ()).await.unwrap();
        let row = rows.next().await.unwrap().unwrap();
        row.get(0).unwrap()
    }

    #[tokio::test]
    async fn test_database_creation() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");

        let db_service = DatabaseService::new(db_path.clone()).await.unwrap();

        assert_eq!(db_service.db_path, db_path);
        assert!(db_path.exists());
    }

    #[tokio::test]
    async fn test_schema_initialization() {
        let temp_dir = TempDir::new().unwrap();
        let db_service = DatabaseService::new(temp_dir.path().join("test.db"))
            .await
            .unwrap();
        let conn = db_service.connect().unwrap();

        let table = single_string(
            &conn,
            "SELECT name FROM sqlite_master WHERE type='table' AND name='tree_nodes'",
        )
        .await;
        assert_eq!(table, "tree_nodes");

        let index = single_string(
            &conn,
            "SELECT name FROM sqlite_master WHERE type='index' AND name='idx_tree_nodes_parent'",
        )
        .await;
        assert_eq!(index, "idx_tree_nodes_parent");
    }

    #[tokio::test]
    async fn test_wal_mode_enabled() {
        let temp_dir = TempDir::new().unwrap();
        let db_service = DatabaseService::new(temp_dir.path().join("test.db"))
            .await
            .unwrap();
        let conn = db_service.connect().unwrap();

        let mode = single_string(&conn, "PRAGMA journal_mode").await;
        assert_eq!(mode.to_lowercase(), "wal");
    }

    #[tokio::test]
    async fn test_parent_directory_creation() {
        let temp_dir = TempDir::new().unwrap();
        let nested_path = temp_dir.path().join("nested").join("dirs").join("test.db");

        let _db_service = DatabaseService::new(nested_path.clone()).await.unwrap();

        assert!(nested_path.exists());
    }

    #[tokio::test]
    async fn test_idempotent_initialization() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");

        let _first = DatabaseService::new(db_path.clone()).await.unwrap();
        let second = DatabaseService::new(db_path).await.unwrap();

        let conn = second.connect().unwrap();
        let mut rows = conn
            .query(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='tree_nodes'",
                (),
            )
            .await
            .unwrap();
        let count: i64 = rows.next().await.unwrap().unwrap().get(0).unwrap();
        assert_eq!(count, 1);
    }
}

//! LibsqlStore - NodeStore Implementation for the libsql Backend
//!
//! Wraps `DatabaseService` and owns every SQL statement that touches
//! `tree_nodes`. Row conversion happens in one place (`row_to_node`).
//!
//! # Row Format
//!
//! Every node query selects the same columns, in order:
//! - node_id (INTEGER)
//! - node_name (TEXT)
//! - description (TEXT, nullable)
//! - creation_date (TEXT, RFC3339)
//! - parent_id (INTEGER, nullable)
//! - node_level (INTEGER)

use crate::db::node_store::{LeafDelete, NodeStore, SubtreeRow};
use crate::db::{DatabaseError, DatabaseService};
use crate::models::{NewNode, Node, NodeId};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use libsql::{Connection, Row, Rows, TransactionBehavior};

const NODE_COLUMNS: &str = "node_id, node_name, description, creation_date, parent_id, node_level";

/// NodeStore backed by an embedded libsql database
#[derive(Debug, Clone)]
pub struct LibsqlStore {
    db: DatabaseService,
}

impl LibsqlStore {
    pub fn new(db: DatabaseService) -> Self {
        Self { db }
    }

    /// Underlying database service (used by maintenance code and tests)
    pub fn database(&self) -> &DatabaseService {
        &self.db
    }

    /// Parse timestamp from database - handles both SQLite and RFC3339 formats
    ///
    /// Rows written by this store use RFC3339. Rows inserted by hand with
    /// CURRENT_TIMESTAMP use "YYYY-MM-DD HH:MM:SS".
    fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, DatabaseError> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(dt.with_timezone(&Utc));
        }

        if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
            return Ok(naive.and_utc());
        }

        Err(DatabaseError::row_decode(format!(
            "Unable to parse timestamp '{}' as RFC3339 or SQLite format",
            s
        )))
    }

    fn format_timestamp(ts: &DateTime<Utc>) -> String {
        ts.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    /// Convert libsql::Row to Node model
    fn row_to_node(row: &Row) -> Result<Node, DatabaseError> {
        let decode = |column: &str, e: libsql::Error| {
            DatabaseError::row_decode(format!("Failed to get {}: {}", column, e))
        };

        let node_id: i64 = row.get(0).map_err(|e| decode("node_id", e))?;
        let node_name: String = row.get(1).map_err(|e| decode("node_name", e))?;
        let description: Option<String> = row.get(2).map_err(|e| decode("description", e))?;
        let creation_date_str: String = row.get(3).map_err(|e| decode("creation_date", e))?;
        let parent_id: Option<i64> = row.get(4).map_err(|e| decode("parent_id", e))?;
        let node_level: i64 = row.get(5).map_err(|e| decode("node_level", e))?;

        Ok(Node {
            node_id,
            node_name,
            description,
            creation_date: Self::parse_timestamp(&creation_date_str)?,
            parent_id,
            node_level,
        })
    }

    async fn collect_nodes(mut rows: Rows) -> Result<Vec<Node>, DatabaseError> {
        let mut nodes = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::sql_execution(format!("Failed to fetch row: {}", e)))?
        {
            nodes.push(Self::row_to_node(&row)?);
        }
        Ok(nodes)
    }

    async fn count_children_on(
        conn: &Connection,
        parent_id: NodeId,
    ) -> Result<u64, DatabaseError> {
        let mut rows = conn
            .query(
                "SELECT COUNT(*) FROM tree_nodes WHERE parent_id = ?",
                [parent_id],
            )
            .await
            .map_err(|e| {
                DatabaseError::sql_execution(format!("Failed to count children: {}", e))
            })?;

        let count: i64 = match rows
            .next()
            .await
            .map_err(|e| DatabaseError::sql_execution(e.to_string()))?
        {
            Some(row) => row
                .get(0)
                .map_err(|e| DatabaseError::row_decode(format!("Failed to get count: {}", e)))?,
            None => 0,
        };

        Ok(count.max(0) as u64)
    }
}

#[async_trait]
impl NodeStore for LibsqlStore {
    async fn list_all(&self) -> Result<Vec<Node>, DatabaseError> {
        let conn = self.db.connect_with_timeout().await?;

        let rows = conn
            .query(
                &format!("SELECT {} FROM tree_nodes ORDER BY node_id", NODE_COLUMNS),
                (),
            )
            .await
            .map_err(|e| DatabaseError::sql_execution(format!("Failed to list nodes: {}", e)))?;

        Self::collect_nodes(rows).await
    }

    async fn get_by_id(&self, id: NodeId) -> Result<Option<Node>, DatabaseError> {
        let conn = self.db.connect_with_timeout().await?;

        let mut rows = conn
            .query(
                &format!("SELECT {} FROM tree_nodes WHERE node_id = ?", NODE_COLUMNS),
                [id],
            )
            .await
            .map_err(|e| DatabaseError::sql_execution(format!("Failed to get node: {}", e)))?;

        match rows
            .next()
            .await
            .map_err(|e| DatabaseError::sql_execution(e.to_string()))?
        {
            Some(row) => Ok(Some(Self::row_to_node(&row)?)),
            None => Ok(None),
        }
    }

    async fn list_roots(&self) -> Result<Vec<Node>, DatabaseError> {
        let conn = self.db.connect_with_timeout().await?;

        let rows = conn
            .query(
                &format!(
                    "SELECT {} FROM tree_nodes WHERE parent_id IS NULL ORDER BY node_id",
                    NODE_COLUMNS
                ),
                (),
            )
            .await
            .map_err(|e| DatabaseError::sql_execution(format!("Failed to list roots: {}", e)))?;

        Self::collect_nodes(rows).await
    }

    async fn list_children(&self, parent_id: NodeId) -> Result<Vec<Node>, DatabaseError> {
        let conn = self.db.connect_with_timeout().await?;

        let rows = conn
            .query(
                &format!(
                    "SELECT {} FROM tree_nodes WHERE parent_id = ? ORDER BY node_id",
                    NODE_COLUMNS
                ),
                [parent_id],
            )
            .await
            .map_err(|e| {
                DatabaseError::sql_execution(format!("Failed to list children: {}", e))
            })?;

        Self::collect_nodes(rows).await
    }

    async fn count_children(&self, parent_id: NodeId) -> Result<u64, DatabaseError> {
        let conn = self.db.connect_with_timeout().await?;
        Self::count_children_on(&conn, parent_id).await
    }

    async fn insert(&self, node: NewNode) -> Result<NodeId, DatabaseError> {
        let conn = self.db.connect_with_timeout().await?;

        // Parent check and insert share one write transaction so a concurrent
        // delete cannot slip in between them.
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .await
            .map_err(|e| {
                DatabaseError::sql_execution(format!("Failed to begin transaction: {}", e))
            })?;

        if let Some(parent_id) = node.parent_id {
            let mut rows = tx
                .query("SELECT 1 FROM tree_nodes WHERE node_id = ?", [parent_id])
                .await
                .map_err(|e| {
                    DatabaseError::sql_execution(format!("Failed to look up parent: {}", e))
                })?;
            let parent_exists = rows
                .next()
                .await
                .map_err(|e| DatabaseError::sql_execution(e.to_string()))?
                .is_some();
            drop(rows);

            if !parent_exists {
                tx.rollback().await?;
                return Err(DatabaseError::ParentNotFound { parent_id });
            }
        }

        tx.execute(
            "INSERT INTO tree_nodes (node_name, description, creation_date, parent_id, node_level)
             VALUES (?, ?, ?, ?, ?)",
            (
                node.node_name.as_str(),
                node.description.as_deref(),
                Self::format_timestamp(&node.creation_date),
                node.parent_id,
                node.node_level,
            ),
        )
        .await
        .map_err(|e| DatabaseError::sql_execution(format!("Failed to insert node: {}", e)))?;

        let node_id = tx.last_insert_rowid();

        tx.commit().await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to commit insert: {}", e))
        })?;

        Ok(node_id)
    }

    async fn update(
        &self,
        id: NodeId,
        node_name: &str,
        description: Option<&str>,
    ) -> Result<bool, DatabaseError> {
        let conn = self.db.connect_with_timeout().await?;

        let rows_affected = conn
            .execute(
                "UPDATE tree_nodes SET node_name = ?, description = ? WHERE node_id = ?",
                (node_name, description, id),
            )
            .await
            .map_err(|e| DatabaseError::sql_execution(format!("Failed to update node: {}", e)))?;

        Ok(rows_affected > 0)
    }

    async fn delete(&self, id: NodeId) -> Result<bool, DatabaseError> {
        let conn = self.db.connect_with_timeout().await?;

        let rows_affected = conn
            .execute("DELETE FROM tree_nodes WHERE node_id = ?", [id])
            .await
            .map_err(|e| DatabaseError::sql_execution(format!("Failed to delete node: {}", e)))?;

        Ok(rows_affected > 0)
    }

    async fn delete_leaf(&self, id: NodeId) -> Result<LeafDelete, DatabaseError> {
        let conn = self.db.connect_with_timeout().await?;

        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .await
            .map_err(|e| {
                DatabaseError::sql_execution(format!("Failed to begin transaction: {}", e))
            })?;

        let children = Self::count_children_on(&tx, id).await?;
        if children > 0 {
            tx.rollback().await?;
            return Ok(LeafDelete::HasChildren(children));
        }

        let rows_affected = tx
            .execute("DELETE FROM tree_nodes WHERE node_id = ?", [id])
            .await
            .map_err(|e| DatabaseError::sql_execution(format!("Failed to delete node: {}", e)))?;

        tx.commit().await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to commit delete: {}", e))
        })?;

        Ok(if rows_affected > 0 {
            LeafDelete::Deleted
        } else {
            LeafDelete::NotFound
        })
    }

    async fn delete_subtree(&self, id: NodeId) -> Result<u64, DatabaseError> {
        let conn = self.db.connect_with_timeout().await?;

        // UNION stops at nodes already visited, so cyclic rows terminate
        let rows_affected = conn
            .execute(
                "WITH RECURSIVE subtree(node_id) AS (
                    SELECT node_id FROM tree_nodes WHERE node_id = ?1
                    UNION
                    SELECT t.node_id FROM tree_nodes t JOIN subtree s ON t.parent_id = s.node_id
                 )
                 DELETE FROM tree_nodes WHERE node_id IN (SELECT node_id FROM subtree)",
                [id],
            )
            .await
            .map_err(|e| {
                DatabaseError::sql_execution(format!("Failed to delete subtree: {}", e))
            })?;

        Ok(rows_affected)
    }

    async fn list_subtree(
        &self,
        root_id: NodeId,
        max_depth: usize,
    ) -> Result<Vec<SubtreeRow>, DatabaseError> {
        let depth_limit = i64::try_from(max_depth).map_err(|_| {
            DatabaseError::sql_execution(format!("Subtree depth limit {} is out of range", max_depth))
        })?;
        let conn = self.db.connect_with_timeout().await?;

        let mut rows = conn
            .query(
                "WITH RECURSIVE subtree(node_id, depth, path, revisit) AS (
                    SELECT node_id, 0, ',' || node_id || ',', 0 FROM tree_nodes WHERE node_id = ?1
                    UNION ALL
                    SELECT t.node_id, s.depth + 1, s.path || t.node_id || ',',
                           instr(s.path, ',' || t.node_id || ',') > 0
                    FROM tree_nodes t
                    JOIN subtree s ON t.parent_id = s.node_id
                    WHERE s.depth <= ?2 AND NOT s.revisit
                 )
                 SELECT n.node_id, n.node_name, n.description, n.creation_date, n.parent_id,
                        n.node_level, s.depth
                 FROM subtree s JOIN tree_nodes n ON n.node_id = s.node_id
                 ORDER BY s.depth, n.node_id",
                (root_id, depth_limit),
            )
            .await
            .map_err(|e| {
                DatabaseError::sql_execution(format!("Failed to query subtree: {}", e))
            })?;

        let mut subtree = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::sql_execution(format!("Failed to fetch row: {}", e)))?
        {
            let depth: i64 = row
                .get(6)
                .map_err(|e| DatabaseError::row_decode(format!("Failed to get depth: {}", e)))?;
            subtree.push(SubtreeRow {
                node: Self::row_to_node(&row)?,
                depth: depth.max(0) as usize,
            });
        }

        Ok(subtree)
    }
}

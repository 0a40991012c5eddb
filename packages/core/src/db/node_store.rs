//! NodeStore Trait - Storage Contract for Tree Nodes
//!
//! This module defines the `NodeStore` trait, the only way the services reach
//! persisted nodes. It covers point lookups, the parent secondary index, the
//! three mutations, and two bulk operations used by the bulk materialization
//! strategy and the cascade delete policy.
//!
//! # Design Decisions
//!
//! 1. **Async-First**: every method is async so the HTTP layer never blocks
//! 2. **Missing rows are values**: reads return `Option`/empty `Vec`, writes
//!    return whether a row existed; only real faults are errors
//! 3. **Insertion order**: every list is ordered by `node_id`
//!
//! # Examples
//!
//! ```rust,no_run
//! use treenode_core::db::{DatabaseService, LibsqlStore, NodeStore};
//! use treenode_core::models::NewNode;
//! use std::path::PathBuf;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = DatabaseService::new(PathBuf::from("./data/tree_nodes.db")).await?;
//!     let store: Arc<dyn NodeStore> = Arc::new(LibsqlStore::new(db));
//!
//!     let id = store
//!         .insert(NewNode {
//!             node_name: "Catalog".to_string(),
//!             description: None,
//!             parent_id: None,
//!             node_level: 0,
//!             creation_date: chrono::Utc::now(),
//!         })
//!         .await?;
//!     let children = store.list_children(id).await?;
//!     assert!(children.is_empty());
//!     Ok(())
//! }
//! ```

use crate::db::DatabaseError;
use crate::models::{NewNode, Node, NodeId};
use async_trait::async_trait;

/// A node returned by a subtree query, with its distance from the start node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtreeRow {
    pub node: Node,
    pub depth: usize,
}

/// Outcome of `NodeStore::delete_leaf`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeafDelete {
    Deleted,
    NotFound,
    /// The row is still there; it has this many direct children
    HasChildren(u64),
}

/// Abstraction layer for node persistence operations
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; the materializer fetches sibling
/// subtrees concurrently from the same store.
#[async_trait]
pub trait NodeStore: Send + Sync {
    /// All nodes in insertion order. An empty table yields an empty `Vec`.
    async fn list_all(&self) -> Result<Vec<Node>, DatabaseError>;

    /// The node with the given id, or `None`
    async fn get_by_id(&self, id: NodeId) -> Result<Option<Node>, DatabaseError>;

    /// All nodes without a parent reference
    async fn list_roots(&self) -> Result<Vec<Node>, DatabaseError>;

    /// Direct children of `parent_id`, in insertion order
    async fn list_children(&self, parent_id: NodeId) -> Result<Vec<Node>, DatabaseError>;

    /// Number of direct children of `parent_id`
    async fn count_children(&self, parent_id: NodeId) -> Result<u64, DatabaseError>;

    /// Insert a node and return its new id
    ///
    /// # Errors
    ///
    /// `DatabaseError::ParentNotFound` when `node.parent_id` is set and no
    /// such node exists at the time of the write.
    async fn insert(&self, node: NewNode) -> Result<NodeId, DatabaseError>;

    /// Update name and description. Returns `false` when no row had that id.
    async fn update(
        &self,
        id: NodeId,
        node_name: &str,
        description: Option<&str>,
    ) -> Result<bool, DatabaseError>;

    /// Delete one row. Descendants are left untouched.
    /// Returns `false` when no row had that id.
    async fn delete(&self, id: NodeId) -> Result<bool, DatabaseError>;

    /// Delete one row only if it has no children.
    ///
    /// The child check and the delete happen in one write transaction, so a
    /// child inserted concurrently either blocks the delete or fails its own
    /// parent check.
    async fn delete_leaf(&self, id: NodeId) -> Result<LeafDelete, DatabaseError>;

    /// Delete a node and every descendant. Returns the number of rows removed.
    async fn delete_subtree(&self, id: NodeId) -> Result<u64, DatabaseError>;

    /// The start node and all descendants down to `max_depth` levels below it,
    /// each tagged with its depth. Rows deeper than `max_depth` are cut off,
    /// except that one extra level is returned so callers can tell that the
    /// limit was hit.
    ///
    /// A node already on the path from the start node is returned once more
    /// and not descended into, so cyclic data yields a finite result with a
    /// repeated id.
    async fn list_subtree(
        &self,
        root_id: NodeId,
        max_depth: usize,
    ) -> Result<Vec<SubtreeRow>, DatabaseError>;
}

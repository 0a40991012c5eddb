//! Node Service - Hierarchy Rules over the Node Store
//!
//! This module is the one canonical implementation of the tree operations.
//! Every HTTP generation is a thin adapter over it.
//!
//! - Reads: list all, get by id, roots, children, materialized branch
//! - Creates: roots (level 0) and children (parent level + 1, parent must exist)
//! - Updates: name and description only; there is no re-parenting
//! - Deletes: governed by `DeletePolicy`
//!
//! # Levels
//!
//! `node_level` is computed once, from the parent's level at creation time,
//! and never recomputed afterwards.

use crate::db::{DatabaseError, DatabaseService, LeafDelete, LibsqlStore, NodeStore};
use crate::models::{NewNode, Node, NodeId, NodeInput, NodeTree};
use crate::services::branch::{BranchConfig, BranchMaterializer};
use crate::services::error::NodeServiceError;
use chrono::{SubsecRound, Utc};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

/// What happens to the children of a deleted node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeletePolicy {
    /// Delete only the node; children keep a dangling `parent_id`
    #[default]
    Orphan,
    /// Delete the node and every descendant
    Cascade,
    /// Refuse to delete a node that has children
    Reject,
}

impl FromStr for DeletePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "orphan" => Ok(Self::Orphan),
            "cascade" => Ok(Self::Cascade),
            "reject" => Ok(Self::Reject),
            other => Err(format!(
                "unknown delete policy '{}' (expected 'orphan', 'cascade' or 'reject')",
                other
            )),
        }
    }
}

/// Behavior switches for `NodeService`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeServiceConfig {
    pub delete_policy: DeletePolicy,
    pub branch: BranchConfig,
}

/// Core service for tree node operations
#[derive(Clone)]
pub struct NodeService {
    store: Arc<dyn NodeStore>,
    materializer: BranchMaterializer,
    delete_policy: DeletePolicy,
}

impl NodeService {
    /// Create a NodeService over any store implementation
    pub fn new(store: Arc<dyn NodeStore>, config: NodeServiceConfig) -> Self {
        let materializer = BranchMaterializer::new(store.clone(), config.branch);
        Self {
            store,
            materializer,
            delete_policy: config.delete_policy,
        }
    }

    /// Open (or create) a libsql database file and build a service on it
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use treenode_core::services::{NodeService, NodeServiceConfig};
    /// # use std::path::PathBuf;
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let service = NodeService::open(
    ///     PathBuf::from("./data/tree_nodes.db"),
    ///     NodeServiceConfig::default(),
    /// )
    /// .await?;
    /// let roots = service.list_roots().await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn open(db_path: PathBuf, config: NodeServiceConfig) -> Result<Self, NodeServiceError> {
        let db = DatabaseService::new(db_path).await?;
        Ok(Self::new(Arc::new(LibsqlStore::new(db)), config))
    }

    pub fn store(&self) -> &Arc<dyn NodeStore> {
        &self.store
    }

    pub fn delete_policy(&self) -> DeletePolicy {
        self.delete_policy
    }

    pub fn branch_config(&self) -> &BranchConfig {
        self.materializer.config()
    }

    /// All nodes in insertion order
    pub async fn list_nodes(&self) -> Result<Vec<Node>, NodeServiceError> {
        Ok(self.store.list_all().await?)
    }

    /// One node by id
    ///
    /// # Errors
    ///
    /// `NodeNotFound` if no node has that id.
    pub async fn get_node(&self, id: NodeId) -> Result<Node, NodeServiceError> {
        self.store
            .get_by_id(id)
            .await?
            .ok_or_else(|| NodeServiceError::node_not_found(id))
    }

    /// All root nodes in insertion order
    pub async fn list_roots(&self) -> Result<Vec<Node>, NodeServiceError> {
        Ok(self.store.list_roots().await?)
    }

    /// Direct children of `parent_id` in insertion order
    ///
    /// An unknown parent simply has no children; orphans of a deleted parent
    /// are still returned for its id.
    pub async fn list_children(&self, parent_id: NodeId) -> Result<Vec<Node>, NodeServiceError> {
        Ok(self.store.list_children(parent_id).await?)
    }

    /// Create a root node (no parent, level 0)
    pub async fn create_root(&self, input: NodeInput) -> Result<Node, NodeServiceError> {
        input.validate()?;
        self.insert(input, None, 0).await
    }

    /// Create a child of `parent_id` one level below it
    ///
    /// # Errors
    ///
    /// `ParentNotFound` if the parent does not exist, whether it was missing
    /// up front or deleted before the insert committed.
    pub async fn create_child(
        &self,
        parent_id: NodeId,
        input: NodeInput,
    ) -> Result<Node, NodeServiceError> {
        input.validate()?;

        let parent = self
            .store
            .get_by_id(parent_id)
            .await?
            .ok_or_else(|| NodeServiceError::parent_not_found(parent_id))?;

        self.insert(input, Some(parent.node_id), parent.child_level())
            .await
    }

    async fn insert(
        &self,
        input: NodeInput,
        parent_id: Option<NodeId>,
        node_level: i64,
    ) -> Result<Node, NodeServiceError> {
        // Stored timestamps keep millisecond precision
        let creation_date = Utc::now().trunc_subsecs(3);
        let new_node = NewNode {
            node_name: input.node_name,
            description: input.description,
            parent_id,
            node_level,
            creation_date,
        };

        let node_id = self
            .store
            .insert(new_node.clone())
            .await
            .map_err(|e| match e {
                DatabaseError::ParentNotFound { parent_id } => {
                    NodeServiceError::parent_not_found(parent_id)
                }
                other => NodeServiceError::from(other),
            })?;

        tracing::debug!(
            "Created node {} (parent {:?}, level {})",
            node_id,
            parent_id,
            node_level
        );

        Ok(Node {
            node_id,
            node_name: new_node.node_name,
            description: new_node.description,
            creation_date: new_node.creation_date,
            parent_id: new_node.parent_id,
            node_level: new_node.node_level,
        })
    }

    /// Rename and redescribe a node
    ///
    /// # Errors
    ///
    /// `NodeNotFound` if no node has that id.
    pub async fn update_node(&self, id: NodeId, input: NodeInput) -> Result<(), NodeServiceError> {
        input.validate()?;

        let existed = self
            .store
            .update(id, &input.node_name, input.description.as_deref())
            .await?;

        if !existed {
            return Err(NodeServiceError::node_not_found(id));
        }

        tracing::debug!("Updated node {}", id);
        Ok(())
    }

    /// Delete a node according to the configured `DeletePolicy`
    ///
    /// Returns the number of rows removed (always 1 unless cascading).
    ///
    /// # Errors
    ///
    /// - `NodeNotFound` if no node has that id
    /// - `HasChildren` under `DeletePolicy::Reject` when children exist
    pub async fn delete_node(&self, id: NodeId) -> Result<u64, NodeServiceError> {
        let removed = match self.delete_policy {
            DeletePolicy::Orphan => u64::from(self.store.delete(id).await?),
            DeletePolicy::Cascade => self.store.delete_subtree(id).await?,
            DeletePolicy::Reject => match self.store.delete_leaf(id).await? {
                LeafDelete::Deleted => 1,
                LeafDelete::NotFound => 0,
                LeafDelete::HasChildren(children) => {
                    return Err(NodeServiceError::HasChildren { id, children });
                }
            },
        };

        if removed == 0 {
            return Err(NodeServiceError::node_not_found(id));
        }

        tracing::debug!(
            "Deleted node {} ({} row(s), policy {:?})",
            id,
            removed,
            self.delete_policy
        );
        Ok(removed)
    }

    /// The node and all of its descendants, nested
    ///
    /// # Errors
    ///
    /// `NodeNotFound` if the start node does not exist; see
    /// `BranchMaterializer::materialize` for the rest.
    pub async fn get_branch(&self, id: NodeId) -> Result<NodeTree, NodeServiceError> {
        let root = self.get_node(id).await?;
        self.materializer.materialize(root).await
    }
}

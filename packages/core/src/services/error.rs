//! Service Layer Error Types
//!
//! This module defines error types for service-layer operations. Callers at
//! the request boundary split these into "row missing" (404), "refused"
//! (400/409) and everything else (500).

use crate::db::DatabaseError;
use crate::models::{NodeId, ValidationError};
use thiserror::Error;

/// Service operation errors
#[derive(Error, Debug)]
pub enum NodeServiceError {
    /// Node not found by ID
    #[error("Node not found: {id}")]
    NodeNotFound { id: NodeId },

    /// Child creation referenced a parent that does not exist
    #[error("Parent node not found: {parent_id}")]
    ParentNotFound { parent_id: NodeId },

    /// Delete refused because the node still has children
    #[error("Node {id} has {children} child node(s)")]
    HasChildren { id: NodeId, children: u64 },

    /// Validation failed for node input
    #[error("Node validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),

    /// Stored parent references loop back onto the subtree being materialized
    #[error("Circular parent reference detected at node {node_id}")]
    CycleDetected { node_id: NodeId },

    /// Subtree is deeper than the configured bound
    #[error("Subtree exceeds maximum depth of {limit}")]
    DepthLimitExceeded { limit: usize },

    /// Materialization did not finish in time
    #[error("Materializing subtree of node {node_id} exceeded {timeout_ms}ms")]
    BranchTimeout { node_id: NodeId, timeout_ms: u128 },

    /// Database operation failed
    #[error("Database operation failed: {0}")]
    DatabaseError(#[from] DatabaseError),
}

impl NodeServiceError {
    /// Create a node not found error
    pub fn node_not_found(id: NodeId) -> Self {
        Self::NodeNotFound { id }
    }

    /// Create a parent not found error
    pub fn parent_not_found(parent_id: NodeId) -> Self {
        Self::ParentNotFound { parent_id }
    }

    /// True for errors caused by stored data that breaks the forest shape
    pub fn is_data_integrity(&self) -> bool {
        matches!(
            self,
            Self::CycleDetected { .. } | Self::DepthLimitExceeded { .. }
        )
    }
}

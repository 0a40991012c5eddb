//! Tree Node Data Structures
//!
//! This module defines the `Node` record stored in the `tree_nodes` table and
//! the nested `NodeTree` produced by subtree materialization.
//!
//! # Root Detection
//!
//! Root-ness is derived from `parent_id` and never stored. The serialized form
//! still carries an `is_root` field so clients see the same shape as before:
//!
//! ```rust
//! use treenode_core::models::Node;
//! use chrono::Utc;
//!
//! let root = Node {
//!     node_id: 1,
//!     node_name: "Catalog".to_string(),
//!     description: None,
//!     creation_date: Utc::now(),
//!     parent_id: None,
//!     node_level: 0,
//! };
//! assert!(root.is_root());
//!
//! let json = serde_json::to_value(&root).unwrap();
//! assert_eq!(json["is_root"], true);
//! ```

use chrono::{DateTime, Utc};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

/// Identifier type for nodes (SQLite rowid)
pub type NodeId = i64;

/// Validation errors for node input
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid node name: {0}")]
    InvalidName(String),
}

/// A single row of the node hierarchy.
///
/// # Fields
///
/// - `node_id`: Unique identifier, assigned by the store on insert, immutable
/// - `node_name`: Display label, mutable
/// - `description`: Free text, mutable, may be absent
/// - `creation_date`: Set once at insert
/// - `parent_id`: Parent reference; `None` means this node is a root
/// - `node_level`: Depth from the nearest root, fixed at creation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub node_id: NodeId,
    pub node_name: String,
    pub description: Option<String>,
    pub creation_date: DateTime<Utc>,
    pub parent_id: Option<NodeId>,
    pub node_level: i64,
}

impl Node {
    /// A node is a root when it has no parent reference
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Level a direct child of this node receives at creation time
    pub fn child_level(&self) -> i64 {
        self.node_level + 1
    }
}

impl Serialize for Node {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("Node", 7)?;
        state.serialize_field("node_id", &self.node_id)?;
        state.serialize_field("node_name", &self.node_name)?;
        state.serialize_field("description", &self.description)?;
        state.serialize_field("creation_date", &self.creation_date)?;
        state.serialize_field("parent_id", &self.parent_id)?;
        state.serialize_field("is_root", &self.is_root())?;
        state.serialize_field("node_level", &self.node_level)?;
        state.end()
    }
}

/// Mutable fields of a node, as accepted on create and update
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NodeInput {
    pub node_name: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl NodeInput {
    pub fn new(node_name: impl Into<String>, description: Option<String>) -> Self {
        Self {
            node_name: node_name.into(),
            description,
        }
    }

    /// Reject blank names before anything reaches the store
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.node_name.trim().is_empty() {
            return Err(ValidationError::InvalidName(
                "node_name must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Parameters for a store insert
///
/// The caller resolves `parent_id` and `node_level`; the store only checks that
/// the parent still exists when the row is written.
#[derive(Debug, Clone)]
pub struct NewNode {
    pub node_name: String,
    pub description: Option<String>,
    pub parent_id: Option<NodeId>,
    pub node_level: i64,
    pub creation_date: DateTime<Utc>,
}

/// A node together with all of its descendants, nested by parent/child.
///
/// Serializes as the node's own fields plus a `children` array, which is
/// always present and empty for leaves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeTree {
    #[serde(flatten)]
    pub node: Node,
    pub children: Vec<NodeTree>,
}

impl NodeTree {
    pub fn leaf(node: Node) -> Self {
        Self {
            node,
            children: Vec::new(),
        }
    }

    /// Total number of nodes in this tree, including the root
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(NodeTree::size).sum::<usize>()
    }

    /// Number of levels below this node (0 for a leaf)
    pub fn height(&self) -> usize {
        self.children
            .iter()
            .map(|child| child.height() + 1)
            .max()
            .unwrap_or(0)
    }
}

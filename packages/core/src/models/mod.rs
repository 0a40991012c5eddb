//! Data Models
//!
//! This module contains the data structures shared by the store, the services
//! and the HTTP layer:
//!
//! - `Node` - One row of the `tree_nodes` table
//! - `NodeInput` - Mutable fields accepted on create and update
//! - `NodeTree` - A node with its materialized descendants

mod node;

pub use node::{NewNode, Node, NodeId, NodeInput, NodeTree, ValidationError};

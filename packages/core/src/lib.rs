//! Tree Nodes Core Business Logic Layer
//!
//! This crate provides storage, hierarchy rules and subtree materialization
//! for a single hierarchical `tree_nodes` table.
//!
//! # Architecture
//!
//! - **One canonical core**: every HTTP surface calls `NodeService`
//! - **libsql**: embedded SQLite-compatible storage behind the `NodeStore` trait
//! - **Derived root-ness**: only `parent_id` is stored; `is_root` is computed
//! - **Bounded materialization**: depth limit, cycle detection and timeout
//!
//! # Modules
//!
//! - [`models`] - Data structures (Node, NodeInput, NodeTree)
//! - [`db`] - Database layer with libsql integration
//! - [`services`] - NodeService and the branch materializer

pub mod db;
pub mod models;
pub mod services;

// Re-export commonly used types
pub use db::{DatabaseError, DatabaseService, LeafDelete, LibsqlStore, NodeStore};
pub use models::*;
pub use services::*;

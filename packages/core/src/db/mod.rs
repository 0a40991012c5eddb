//! Database Layer
//!
//! This module handles all database interactions using embedded libsql:
//!
//! - Database initialization and connection management (`DatabaseService`)
//! - The storage contract the services depend on (`NodeStore`)
//! - The libsql implementation of that contract (`LibsqlStore`)

mod database;
mod error;
mod libsql_store;
mod node_store;

pub use database::DatabaseService;
pub use error::DatabaseError;
pub use libsql_store::LibsqlStore;
pub use node_store::{LeafDelete, NodeStore, SubtreeRow};

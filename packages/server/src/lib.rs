//! HTTP server for the tree node service
//!
//! Wraps `treenode_core::NodeService` in an axum router. `config` reads the
//! runtime settings from the environment, `api` holds the endpoints.

pub mod api;
pub mod config;

pub use api::{create_router, start_server, AppState};
pub use config::{ConfigError, EmptyResultPolicy, ServerConfig};

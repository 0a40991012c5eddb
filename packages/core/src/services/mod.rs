//! Business Services
//!
//! - `NodeService` - CRUD operations and hierarchy rules
//! - `BranchMaterializer` - Recursive subtree assembly behind `get_branch`
//!
//! Services coordinate between the storage layer and the HTTP adapters,
//! enforcing hierarchy rules the store itself does not know about.

pub mod branch;
pub mod error;
pub mod node_service;

pub use branch::{BranchConfig, BranchMaterializer, BranchStrategy, MAX_DEPTH_CEILING};
pub use error::NodeServiceError;
pub use node_service::{DeletePolicy, NodeService, NodeServiceConfig};

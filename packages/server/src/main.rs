//! Tree node HTTP server binary
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin treenode-server
//!
//! SERVER_PORT=8080 DATABASE_PATH=/var/lib/tree/nodes.db cargo run --bin treenode-server
//! ```
//!
//! # Environment Variables
//!
//! - `SERVER_HOST` / `SERVER_PORT`: bind address (default 127.0.0.1:3000)
//! - `DATABASE_PATH`: libsql file (default ./data/tree_nodes.db)
//! - `BRANCH_STRATEGY`: `per-node` or `bulk`
//! - `BRANCH_MAX_DEPTH` / `BRANCH_TIMEOUT_MS`: branch limits
//! - `DELETE_POLICY`: `orphan`, `cascade` or `reject`
//! - `EMPTY_RESULT_POLICY`: `not-found` or `empty-success`
//! - `LEGACY_ROUTES`: mount `/tree_nodes` routes
//! - `CORS_ALLOW_ORIGIN`: single allowed origin
//! - `RUST_LOG`: logging level (e.g., "info", "debug")

use treenode_core::NodeService;
use treenode_server::{start_server, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::from_env()?;

    tracing::info!("Tree node server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Database: {}", config.database_path.display());

    let node_service =
        NodeService::open(config.database_path.clone(), config.service.clone()).await?;
    tracing::info!("Database ready");

    let branch = node_service.branch_config();
    tracing::info!(
        "Branch strategy: {:?} (max depth {}, timeout {:?})",
        branch.strategy,
        branch.max_depth,
        branch.timeout
    );
    tracing::info!("Delete policy: {:?}", node_service.delete_policy());

    start_server(config, node_service).await
}

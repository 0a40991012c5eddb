//! HTTP surface for the tree node service
//!
//! The API is organized into endpoint modules merged into one router:
//! - `admin_endpoints`: the `/api/v1/nodes` surface with the JSON envelope
//! - `legacy_endpoints`: the flat `/tree_nodes` surface (opt-in)
//!
//! # Usage
//!
//! ```bash
//! SERVER_PORT=3000 LEGACY_ROUTES=true cargo run --bin treenode-server
//! ```

use axum::{
    http::{HeaderValue, Method},
    response::Json,
    routing::get,
    Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use treenode_core::NodeService;

use crate::config::{EmptyResultPolicy, ServerConfig};

mod admin_endpoints;
pub mod envelope;
mod http_error;
mod legacy_endpoints;

pub use http_error::HttpError;

/// Application state shared across all endpoints
#[derive(Clone)]
pub struct AppState {
    pub node_service: Arc<NodeService>,
    pub empty_result_policy: EmptyResultPolicy,
}

impl AppState {
    pub fn new(node_service: NodeService, config: &ServerConfig) -> Self {
        Self {
            node_service: Arc::new(node_service),
            empty_result_policy: config.empty_result_policy,
        }
    }
}

/// Create the application router
///
/// Legacy routes are merged only when `legacy_routes` is set.
pub fn create_router(state: AppState, config: &ServerConfig) -> Router {
    let mut router = Router::new()
        .route("/api/health", get(health_check))
        .merge(admin_endpoints::routes(state.clone()));

    if config.legacy_routes {
        router = router.merge(legacy_endpoints::routes(state));
    }

    router
        .layer(cors_layer(config.cors_allow_origin.as_deref()))
        .layer(TraceLayer::new_for_http())
}

/// CORS for browser front ends
///
/// Any origin unless `CORS_ALLOW_ORIGIN` names one.
fn cors_layer(origin: Option<&str>) -> CorsLayer {
    let allow_origin = match origin.and_then(|o| o.parse::<HeaderValue>().ok()) {
        Some(value) => AllowOrigin::exact(value),
        None => AllowOrigin::from(Any),
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any)
}

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
}

/// Health check
///
/// ```bash
/// curl http://localhost:3000/api/health
/// ```
async fn health_check() -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Bind and serve until Ctrl-C
///
/// # Errors
///
/// Returns error if the listener cannot bind or the server fails.
pub async fn start_server(config: ServerConfig, node_service: NodeService) -> anyhow::Result<()> {
    let state = AppState::new(node_service, &config);
    let app = create_router(state, &config);

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("HTTP server listening on http://{}", addr);
    if config.legacy_routes {
        tracing::info!("Legacy /tree_nodes routes enabled");
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("HTTP server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, draining connections");
}

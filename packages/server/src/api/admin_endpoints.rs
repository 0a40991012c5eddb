//! Admin `v1` Node Endpoints
//!
//! The canonical HTTP surface over `NodeService`.
//!
//! # Endpoints
//!
//! - `GET /api/v1/nodes/list` - All nodes
//! - `GET /api/v1/nodes/single/:id` - One node (as a one-element array)
//! - `GET /api/v1/nodes/roots` - Root nodes
//! - `GET /api/v1/nodes/children/:id` - Direct children
//! - `GET /api/v1/nodes/branch/:id` - Materialized subtree
//! - `POST /api/v1/nodes/add` - Create a root node
//! - `POST /api/v1/nodes/add/:id` - Create a child of `:id`
//! - `PUT /api/v1/nodes/update/:id` - Rename/redescribe
//! - `DELETE /api/v1/nodes/delete/:id` - Delete (per delete policy)

use axum::{
    extract::{rejection::JsonRejection, rejection::PathRejection, Path, State},
    response::Json,
    routing::{delete, get, post, put},
    Router,
};
use treenode_core::{Node, NodeId, NodeInput, NodeTree};

use crate::api::envelope::ApiResponse;
use crate::api::{AppState, HttpError};
use crate::config::EmptyResultPolicy;

const ERR_RETRIEVE_NODES: &str = "Error retrieving tree_nodes";
const ERR_RETRIEVE_NODE: &str = "Error retrieving a node";
const ERR_RETRIEVE_BRANCH: &str = "Error retrieving nodes";
const ERR_CREATE: &str = "Error creating a node";
const ERR_UPDATE: &str = "Error updating a node";
const ERR_DELETE: &str = "Error deleting a node";

type ApiResult<T> = Result<Json<ApiResponse<T>>, HttpError>;

/// Create router for the admin node endpoints
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/nodes/list", get(list_nodes))
        .route("/api/v1/nodes/single/:id", get(get_node))
        .route("/api/v1/nodes/roots", get(list_roots))
        .route("/api/v1/nodes/children/:id", get(list_children))
        .route("/api/v1/nodes/branch/:id", get(get_branch))
        .route("/api/v1/nodes/add", post(create_root_node))
        .route("/api/v1/nodes/add/:id", post(create_child_node))
        .route("/api/v1/nodes/update/:id", put(update_node))
        .route("/api/v1/nodes/delete/:id", delete(delete_node))
        .with_state(state)
}

/// Apply the configured policy to a list result
fn list_response(nodes: Vec<Node>, policy: EmptyResultPolicy) -> ApiResult<Vec<Node>> {
    if nodes.is_empty() && policy == EmptyResultPolicy::NotFound {
        return Err(HttpError::not_found("Nodes not found"));
    }
    Ok(Json(ApiResponse::data(nodes)))
}

/// Get all nodes
///
/// ```bash
/// curl http://localhost:3000/api/v1/nodes/list
/// ```
async fn list_nodes(State(state): State<AppState>) -> ApiResult<Vec<Node>> {
    let nodes = state
        .node_service
        .list_nodes()
        .await
        .map_err(|e| HttpError::from_service(e, ERR_RETRIEVE_NODES))?;

    list_response(nodes, state.empty_result_policy)
}

/// Get a single node by ID
///
/// The node is wrapped in a one-element array.
async fn get_node(
    State(state): State<AppState>,
    id: Result<Path<NodeId>, PathRejection>,
) -> ApiResult<Vec<Node>> {
    let Path(id) = id?;

    let node = state
        .node_service
        .get_node(id)
        .await
        .map_err(|e| HttpError::from_service(e, ERR_RETRIEVE_NODE))?;

    Ok(Json(ApiResponse::data(vec![node])))
}

/// Get all root nodes
async fn list_roots(State(state): State<AppState>) -> ApiResult<Vec<Node>> {
    let nodes = state
        .node_service
        .list_roots()
        .await
        .map_err(|e| HttpError::from_service(e, ERR_RETRIEVE_NODES))?;

    list_response(nodes, state.empty_result_policy)
}

/// Get the direct children of a node
async fn list_children(
    State(state): State<AppState>,
    id: Result<Path<NodeId>, PathRejection>,
) -> ApiResult<Vec<Node>> {
    let Path(id) = id?;

    let nodes = state
        .node_service
        .list_children(id)
        .await
        .map_err(|e| HttpError::from_service(e, ERR_RETRIEVE_NODE))?;

    list_response(nodes, state.empty_result_policy)
}

/// Get the whole subtree below a node, nested under `children`
///
/// ```bash
/// curl http://localhost:3000/api/v1/nodes/branch/1
/// ```
async fn get_branch(
    State(state): State<AppState>,
    id: Result<Path<NodeId>, PathRejection>,
) -> ApiResult<NodeTree> {
    let Path(id) = id?;

    let tree = state.node_service.get_branch(id).await.map_err(|e| {
        HttpError::from_service(e, ERR_RETRIEVE_BRANCH)
            .with_not_found_message("Selected node not found")
    })?;

    Ok(Json(ApiResponse::data(tree)))
}

/// Create a new root node
///
/// ```bash
/// curl -X POST http://localhost:3000/api/v1/nodes/add \
///   -H "Content-Type: application/json" \
///   -d '{"node_name": "Catalog", "description": "Top level"}'
/// ```
async fn create_root_node(
    State(state): State<AppState>,
    body: Result<Json<NodeInput>, JsonRejection>,
) -> ApiResult<()> {
    let Json(input) = body?;

    let node = state
        .node_service
        .create_root(input)
        .await
        .map_err(|e| HttpError::from_service(e, ERR_CREATE))?;

    tracing::info!("Created root node {}", node.node_id);
    Ok(Json(ApiResponse::created(node.node_id)))
}

/// Create a new child of `:id`
async fn create_child_node(
    State(state): State<AppState>,
    id: Result<Path<NodeId>, PathRejection>,
    body: Result<Json<NodeInput>, JsonRejection>,
) -> ApiResult<()> {
    let Path(parent_id) = id?;
    let Json(input) = body?;

    let node = state
        .node_service
        .create_child(parent_id, input)
        .await
        .map_err(|e| HttpError::from_service(e, ERR_CREATE))?;

    tracing::info!(
        "Created node {} under {} at level {}",
        node.node_id,
        parent_id,
        node.node_level
    );
    Ok(Json(ApiResponse::created(node.node_id)))
}

/// Update the name and description of a node
async fn update_node(
    State(state): State<AppState>,
    id: Result<Path<NodeId>, PathRejection>,
    body: Result<Json<NodeInput>, JsonRejection>,
) -> ApiResult<()> {
    let Path(id) = id?;
    let Json(input) = body?;

    state
        .node_service
        .update_node(id, input)
        .await
        .map_err(|e| HttpError::from_service(e, ERR_UPDATE))?;

    Ok(Json(ApiResponse::message("Node successfully updated")))
}

/// Delete a node
async fn delete_node(
    State(state): State<AppState>,
    id: Result<Path<NodeId>, PathRejection>,
) -> ApiResult<()> {
    let Path(id) = id?;

    let removed = state
        .node_service
        .delete_node(id)
        .await
        .map_err(|e| HttpError::from_service(e, ERR_DELETE))?;

    tracing::info!("Deleted node {} ({} row(s))", id, removed);
    Ok(Json(ApiResponse::message("Node successfully deleted")))
}

//! Flat `/tree_nodes` routes kept for older clients
//!
//! Reads of all nodes and roots return bare JSON arrays; everything else
//! uses the same envelope as the `v1` surface. Parent selection travels in
//! the body instead of the path.

use axum::{
    extract::{rejection::JsonRejection, rejection::PathRejection, Path, State},
    response::Json,
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use treenode_core::{Node, NodeId, NodeInput};

use crate::api::envelope::ApiResponse;
use crate::api::{AppState, HttpError};

/// Body accepted by create and update
#[derive(Debug, Deserialize)]
pub struct LegacyNodeBody {
    pub node_name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Missing, `null` or `0` means "no parent"
    #[serde(default)]
    pub parent_id: Option<NodeId>,
}

impl LegacyNodeBody {
    fn parent(&self) -> Option<NodeId> {
        self.parent_id.filter(|id| *id != 0)
    }

    fn into_input(self) -> NodeInput {
        NodeInput::new(self.node_name, self.description)
    }
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/tree_nodes", post(create_node))
        .route("/tree_nodes/all", get(list_all))
        .route("/tree_nodes/roots", get(list_roots))
        .route("/tree_nodes/childs/:id", get(list_children))
        .route("/tree_nodes/:id", put(update_node).delete(delete_node))
        .with_state(state)
}

async fn list_all(State(state): State<AppState>) -> Result<Json<Vec<Node>>, HttpError> {
    let nodes = state
        .node_service
        .list_nodes()
        .await
        .map_err(|e| HttpError::from_service(e, "Error retrieving tree_nodes"))?;
    Ok(Json(nodes))
}

async fn list_roots(State(state): State<AppState>) -> Result<Json<Vec<Node>>, HttpError> {
    let nodes = state
        .node_service
        .list_roots()
        .await
        .map_err(|e| HttpError::from_service(e, "Error retrieving tree_nodes"))?;
    Ok(Json(nodes))
}

async fn list_children(
    State(state): State<AppState>,
    id: Result<Path<NodeId>, PathRejection>,
) -> Result<Json<ApiResponse<Vec<Node>>>, HttpError> {
    let Path(id) = id?;

    let nodes = state
        .node_service
        .list_children(id)
        .await
        .map_err(|e| HttpError::from_service(e, "Error retrieving a node"))?;

    if nodes.is_empty() {
        return Err(HttpError::not_found("Node not found"));
    }
    Ok(Json(ApiResponse::data(nodes)))
}

/// Create a root, or a child when `parent_id` is set
async fn create_node(
    State(state): State<AppState>,
    body: Result<Json<LegacyNodeBody>, JsonRejection>,
) -> Result<Json<ApiResponse<()>>, HttpError> {
    let Json(body) = body?;

    let created = match body.parent() {
        Some(parent_id) => {
            state
                .node_service
                .create_child(parent_id, body.into_input())
                .await
        }
        None => state.node_service.create_root(body.into_input()).await,
    };
    let node = created.map_err(|e| HttpError::from_service(e, "Error creating a node"))?;

    Ok(Json(ApiResponse::created(node.node_id)))
}

/// Update name and description; moving a node is refused
async fn update_node(
    State(state): State<AppState>,
    id: Result<Path<NodeId>, PathRejection>,
    body: Result<Json<LegacyNodeBody>, JsonRejection>,
) -> Result<Json<ApiResponse<()>>, HttpError> {
    let Path(id) = id?;
    let Json(body) = body?;

    if let Some(requested) = body.parent() {
        let current = state
            .node_service
            .get_node(id)
            .await
            .map_err(|e| HttpError::from_service(e, "Error updating a node"))?;
        if current.parent_id != Some(requested) {
            return Err(HttpError::bad_request("Changing parent_id is not supported"));
        }
    }

    state
        .node_service
        .update_node(id, body.into_input())
        .await
        .map_err(|e| HttpError::from_service(e, "Error updating a node"))?;

    Ok(Json(ApiResponse::message("Node successfully updated")))
}

async fn delete_node(
    State(state): State<AppState>,
    id: Result<Path<NodeId>, PathRejection>,
) -> Result<Json<ApiResponse<()>>, HttpError> {
    let Path(id) = id?;

    state
        .node_service
        .delete_node(id)
        .await
        .map_err(|e| HttpError::from_service(e, "Error deleting a node"))?;

    Ok(Json(ApiResponse::message("Node successfully deleted")))
}

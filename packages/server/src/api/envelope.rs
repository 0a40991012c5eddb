//! JSON response envelope shared by every `/api/v1` endpoint
//!
//! `{ success, message?, data?, nodeId? }`; absent fields are omitted.

use serde::Serialize;
use treenode_core::NodeId;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(rename = "nodeId", skip_serializing_if = "Option::is_none")]
    pub node_id: Option<NodeId>,
}

impl<T> ApiResponse<T> {
    /// Successful read carrying a payload
    pub fn data(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
            node_id: None,
        }
    }
}

impl ApiResponse<()> {
    /// Successful write with a confirmation message
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: None,
            node_id: None,
        }
    }

    /// Successful create, echoing the new id
    pub fn created(node_id: NodeId) -> Self {
        Self {
            success: true,
            message: Some("Node successfully created".to_string()),
            data: None,
            node_id: Some(node_id),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            data: None,
            node_id: None,
        }
    }
}

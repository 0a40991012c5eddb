//! HTTP error handling
//!
//! Every failure leaves the server as `{ success: false, message }`. The
//! status comes from a machine-readable code; storage faults keep the
//! endpoint's fixed message and their detail only reaches the log.

use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use treenode_core::NodeServiceError;

use crate::api::envelope::ApiResponse;

pub const NODE_NOT_FOUND: &str = "NODE_NOT_FOUND";
pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
pub const CONFLICT: &str = "CONFLICT";
pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";

/// HTTP error response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpError {
    /// User-facing error message
    pub message: String,
    /// Machine-readable error code, selects the status
    pub code: String,
}

impl HttpError {
    pub fn new(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: code.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(message, NODE_NOT_FOUND)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(message, VALIDATION_ERROR)
    }

    /// Convert a service error, using `fallback` as the message for anything
    /// that is not the caller's fault
    pub fn from_service(err: NodeServiceError, fallback: &str) -> Self {
        match err {
            NodeServiceError::NodeNotFound { .. } => Self::not_found("Node not found"),
            NodeServiceError::ParentNotFound { .. } => Self::not_found("Parent node not found"),
            NodeServiceError::HasChildren { children, .. } => Self::new(
                format!("Node has {} child node(s) and cannot be deleted", children),
                CONFLICT,
            ),
            NodeServiceError::ValidationFailed(e) => Self::bad_request(e.to_string()),
            other => {
                if other.is_data_integrity() {
                    tracing::error!("{}: stored hierarchy is malformed: {}", fallback, other);
                } else {
                    tracing::error!("{}: {:?}", fallback, other);
                }
                Self::new(fallback, INTERNAL_ERROR)
            }
        }
    }

    /// Replace the message of a not-found error, leaving other errors alone
    pub fn with_not_found_message(mut self, message: &str) -> Self {
        if self.code == NODE_NOT_FOUND {
            self.message = message.to_string();
        }
        self
    }

    pub fn status(&self) -> StatusCode {
        match self.code.as_str() {
            NODE_NOT_FOUND => StatusCode::NOT_FOUND,
            VALIDATION_ERROR => StatusCode::BAD_REQUEST,
            CONFLICT => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        (self.status(), Json(ApiResponse::failure(self.message))).into_response()
    }
}

impl From<JsonRejection> for HttpError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::warn!("Rejected request body: {}", rejection.body_text());
        Self::bad_request(format!("Invalid request body: {}", rejection.body_text()))
    }
}

impl From<PathRejection> for HttpError {
    fn from(rejection: PathRejection) -> Self {
        tracing::warn!("Rejected path parameter: {}", rejection.body_text());
        Self::bad_request("Node id must be an integer")
    }
}

//! Unified error handling for admin.
//!
//! Errors render as JSON: `{"statusCode": 404, "error": "Not Found",
//! "message": "Document not found."}`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::db::StoreError;
use crate::services::{LinkError, RecordKind};

const DOCUMENT_NOT_FOUND: &str = "Document not found.";
const INTERNAL_MESSAGE: &str = "An internal server error occurred";

/// Application-level error type for the admin API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Store operation failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Link or unlink failed.
    #[error("Link error: {0}")]
    Link(#[from] LinkError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Request conflicts with the current state of a record.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// JSON error body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    status_code: u16,
    error: &'static str,
    message: String,
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Store(StoreError::NotFound)
            | Self::Link(LinkError::NotFound(_))
            | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Store(StoreError::Conflict(_) | StoreError::VersionConflict { .. })
            | Self::Link(LinkError::Conflict(_))
            | Self::Conflict(_) => StatusCode::CONFLICT,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Store(_) | Self::Link(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message safe to show to clients.
    fn public_message(&self) -> String {
        match self {
            Self::Store(StoreError::NotFound)
            | Self::Link(LinkError::NotFound(RecordKind::Admin)) => DOCUMENT_NOT_FOUND.to_owned(),
            Self::Link(LinkError::NotFound(RecordKind::User)) => {
                "User document not found.".to_owned()
            }
            Self::Store(StoreError::Conflict(msg))
            | Self::NotFound(msg)
            | Self::Conflict(msg)
            | Self::BadRequest(msg) => msg.clone(),
            Self::Store(StoreError::VersionConflict { .. }) => {
                "Document was modified concurrently.".to_owned()
            }
            Self::Link(LinkError::Conflict(reason)) => reason.to_string(),
            Self::Store(_) | Self::Link(_) | Self::Internal(_) => INTERNAL_MESSAGE.to_owned(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Log server errors with Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Admin request error"
            );
        }

        if let Self::Link(LinkError::WriteFailure(failure)) = &self
            && failure.is_partial()
        {
            tracing::warn!(
                admin_id = %failure.admin_id,
                user_id = %failure.user_id,
                admin_written = failure.admin.is_none(),
                user_written = failure.user.is_none(),
                "Link left half-applied; records need repair"
            );
        }

        let body = ErrorBody {
            status_code: status.as_u16(),
            error: status.canonical_reason().unwrap_or("Unknown"),
            message: self.public_message(),
        };

        (status, Json(body)).into_response()
    }
}

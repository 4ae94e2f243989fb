//! Error types for vigil-curator
//!
//! `CurationError` is what the store and action processor return;
//! `ApiError` maps it onto HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::path::PathBuf;
use thiserror::Error;

/// Curation store / action processor errors
#[derive(Debug, Error)]
pub enum CurationError {
    /// Filesystem failure (locked file, permission, disk full).
    /// The alert keeps its previous state and the caller may retry.
    #[error("I/O error on {}: {source}", path.display())]
    TransientIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Alert id or artifact name that cannot name a triple-set
    #[error("Malformed artifact name: {0}")]
    MalformedArtifactName(String),

    /// No display artifact carries this id
    #[error("Alert not found: {0}")]
    AlertNotFound(String),

    /// Decision arguments are inconsistent (wrong directory, id mismatch)
    #[error("Invalid decision: {0}")]
    InvalidDecision(String),

    /// Annotation artifact exists but cannot be parsed
    #[error("Malformed annotation for {alert_id}: {reason}")]
    MalformedAnnotation { alert_id: String, reason: String },
}

impl CurationError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CurationError::TransientIo {
            path: path.into(),
            source,
        }
    }
}

/// Result type for store operations
pub type CurationResult<T> = Result<T, CurationError>;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Store or action processor error
    #[error(transparent)]
    Curation(#[from] CurationError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Curation(err) => {
                let (status, code) = match &err {
                    CurationError::TransientIo { .. } => {
                        (StatusCode::INTERNAL_SERVER_ERROR, "IO_ERROR")
                    }
                    CurationError::MalformedArtifactName(_) => {
                        (StatusCode::BAD_REQUEST, "MALFORMED_ARTIFACT_NAME")
                    }
                    CurationError::AlertNotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
                    CurationError::InvalidDecision(_) => {
                        (StatusCode::BAD_REQUEST, "INVALID_DECISION")
                    }
                    CurationError::MalformedAnnotation { .. } => {
                        (StatusCode::UNPROCESSABLE_ENTITY, "MALFORMED_ANNOTATION")
                    }
                };
                (status, code, err.to_string())
            }
        };

        if status.is_server_error() {
            tracing::error!(code = error_code, "{}", message);
        }

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

//! Error types for vigil-guard

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::path::PathBuf;
use thiserror::Error;

/// Detection producer errors
#[derive(Debug, Error)]
pub enum ProducerError {
    /// Detector capability failed on a frame
    #[error("Detector failed: {0}")]
    Detector(String),

    /// Artifact could not be written; no alert was emitted
    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Frame payload or reported detections are unusable
    #[error("Invalid frame: {0}")]
    InvalidFrame(String),
}

impl ProducerError {
    pub fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ProducerError::Write {
            path: path.into(),
            source,
        }
    }
}

pub type ProducerResult<T> = Result<T, ProducerError>;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Producer(#[from] ProducerError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Producer(err) => {
                let (status, code) = match &err {
                    ProducerError::InvalidFrame(_) => (StatusCode::BAD_REQUEST, "INVALID_FRAME"),
                    ProducerError::Detector(_) => (StatusCode::BAD_GATEWAY, "DETECTOR_ERROR"),
                    ProducerError::Write { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "IO_ERROR"),
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

pub type ApiResult<T> = Result<T, ApiError>;

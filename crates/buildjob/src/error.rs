//! Errors surfaced by the HTTP API.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use tracing::error;

use crate::manifest::ManifestError;
use crate::server::types::ErrorResponse;

/// API errors, each mapped to one HTTP status.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or malformed request fields (400)
    #[error("{0}")]
    Validation(String),

    /// No log history for the job (404)
    #[error("Job not found")]
    NotFound,

    /// The manifest could not be rendered or written (500)
    #[error("Failed to create job manifest: {0}")]
    Manifest(#[from] ManifestError),

    /// Route exists but not for this method (405)
    #[error("Only {0} method is allowed")]
    MethodNotAllowed(&'static str),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Manifest(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }

        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

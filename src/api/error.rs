//! Translation of domain errors into HTTP responses.
//!
//! Only four classes of error are translated: not found (404), validation
//! (422), unsupported representation (406) and authentication (401).
//! Everything else is an unexpected failure: it is logged and answered with
//! a generic 500 without being reclassified.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use uuid::Uuid;

use crate::error::{LandableError, Result};

impl LandableError {
    /// Status for errors the API deliberately translates, `None` otherwise.
    pub fn translated_status(&self) -> Option<StatusCode> {
        match self {
            Self::NotFound { .. } => Some(StatusCode::NOT_FOUND),
            Self::Validation(_) => Some(StatusCode::UNPROCESSABLE_ENTITY),
            Self::UnsupportedRepresentation(_) => Some(StatusCode::NOT_ACCEPTABLE),
            Self::Authentication => Some(StatusCode::UNAUTHORIZED),
            Self::Storage(_) | Self::Serialization(_) => None,
        }
    }
}

impl IntoResponse for LandableError {
    fn into_response(self) -> Response {
        match self {
            Self::Validation(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({ "errors": errors })),
            )
                .into_response(),
            other => match other.translated_status() {
                Some(status) => {
                    tracing::debug!(%status, error = %other, "request failed");
                    status.into_response()
                }
                None => {
                    tracing::error!(error = %other, "unhandled error");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        Json(json!({ "error": "internal server error" })),
                    )
                        .into_response()
                }
            },
        }
    }
}

/// Parse a path identifier. A malformed id cannot name anything, so it is
/// reported as not found rather than as a bad request.
pub fn parse_id(raw: &str, entity: &'static str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|_| LandableError::not_found(entity, raw))
}

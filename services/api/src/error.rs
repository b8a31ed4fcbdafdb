//! Error type for the API service and its HTTP mapping

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;
use tracker::TrackerError;

/// Custom error type for the API service
#[derive(Error, Debug)]
pub enum ApiError {
    /// Missing, malformed or expired access token
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// Details are logged, never returned
    #[error("Internal server error")]
    InternalServerError,
}

impl From<TrackerError> for ApiError {
    fn from(err: TrackerError) -> Self {
        match err {
            TrackerError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            TrackerError::Forbidden(msg) => ApiError::Forbidden(msg),
            TrackerError::Validation(msg) => ApiError::BadRequest(msg),
            TrackerError::Conflict(msg) => ApiError::Conflict(msg),
            TrackerError::Storage(msg) => {
                error!(error = %msg, "Storage failure");
                ApiError::InternalServerError
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let message = match self {
            ApiError::NotFound(msg)
            | ApiError::Forbidden(msg)
            | ApiError::BadRequest(msg)
            | ApiError::Conflict(msg) => msg,
            other => other.to_string(),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Type alias for API results
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn tracker_errors_map_to_statuses() {
        let cases = [
            (TrackerError::not_found("habit", Uuid::nil()), StatusCode::NOT_FOUND),
            (TrackerError::forbidden("no"), StatusCode::FORBIDDEN),
            (TrackerError::validation("bad"), StatusCode::BAD_REQUEST),
            (TrackerError::conflict("full"), StatusCode::CONFLICT),
            (TrackerError::storage("down"), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, status) in cases {
            let response = ApiError::from(err).into_response();
            assert_eq!(response.status(), status);
        }
    }
}

//! Error type for the authentication service

use axum::{
    Json,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::repositories::UserRepositoryError;

#[derive(Error, Debug)]
pub enum AuthError {
    /// Bad credentials or an invalid, expired or revoked token
    #[error("Unauthorized")]
    Unauthorized,

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Conflict(String),

    /// The identifier is locked out for this many more seconds
    #[error("Too many failed attempts, retry in {0} seconds")]
    TooManyRequests(u64),

    #[error("Not found")]
    NotFound,

    /// Details are logged where the failure happens
    #[error("Internal server error")]
    InternalServerError,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = match self {
            AuthError::Unauthorized => StatusCode::UNAUTHORIZED,
            AuthError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AuthError::Conflict(_) => StatusCode::CONFLICT,
            AuthError::TooManyRequests(_) => StatusCode::TOO_MANY_REQUESTS,
            AuthError::NotFound => StatusCode::NOT_FOUND,
            AuthError::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({ "error": self.to_string() }));

        match self {
            AuthError::TooManyRequests(retry_after) => (
                status,
                [(header::RETRY_AFTER, retry_after.to_string())],
                body,
            )
                .into_response(),
            _ => (status, body).into_response(),
        }
    }
}

impl From<UserRepositoryError> for AuthError {
    fn from(err: UserRepositoryError) -> Self {
        match err {
            UserRepositoryError::Duplicate(field) => {
                AuthError::Conflict(format!("{} is already registered", field))
            }
            other => {
                error!(error = %other, "User repository failure");
                AuthError::InternalServerError
            }
        }
    }
}

pub type AuthResult<T> = Result<T, AuthError>;

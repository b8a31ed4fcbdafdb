//! Middleware for JWT token validation and authentication

use axum::{body::Body, extract::State, http::Request, middleware::Next, response::Response};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use tracing::info;

use crate::{AppState, error::AuthError, jwt::TokenType};

/// Require a valid access token and expose its claims to the handler
pub async fn auth_middleware(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AuthError> {
    let TypedHeader(Authorization(bearer)) = bearer.ok_or(AuthError::Unauthorized)?;

    let claims = state
        .sessions
        .jwt()
        .validate_token(bearer.token())
        .map_err(|e| {
            info!(error = %e, "Rejected bearer token");
            AuthError::Unauthorized
        })?;

    if claims.token_type != TokenType::Access {
        return Err(AuthError::Unauthorized);
    }

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

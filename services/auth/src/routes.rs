//! Authentication service routes

use axum::{
    Extension, Json, Router,
    extract::{Query, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Redirect},
    routing::{get, post},
};
use rand::Rng;
use serde_json::json;
use tracing::{error, info, warn};
use tracker::User;

use crate::{
    AppState,
    error::{AuthError, AuthResult},
    jwt::Claims,
    middleware::auth_middleware,
    models::{GoogleCallbackQuery, LoginRequest, RefreshTokenRequest, RegisterRequest, TokenResponse},
    oauth::{GoogleOAuth, GoogleProfile, OAUTH_SESSION_TTL, OAuthSession},
    validation,
};

/// Create the router for the authentication service
pub fn create_router(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/auth/me", get(me))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh_token))
        .route("/auth/logout", post(logout))
        .route("/auth/google", get(google_login))
        .route("/auth/google/callback", get(google_callback))
        .merge(protected_routes)
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "auth-service"
    }))
}

async fn issue_tokens(state: &AppState, user: &User) -> AuthResult<TokenResponse> {
    state.sessions.issue(user).await.map_err(|e| {
        error!(user_id = %user.id, error = %e, "Failed to issue tokens");
        AuthError::InternalServerError
    })
}

/// Local sign-up
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> AuthResult<impl IntoResponse> {
    let username = payload.username.trim();
    let email = payload.email.trim().to_lowercase();

    validation::validate_username(username).map_err(AuthError::BadRequest)?;
    validation::validate_email(&email).map_err(AuthError::BadRequest)?;
    validation::validate_password(&payload.password).map_err(AuthError::BadRequest)?;

    let user = state
        .user_repository
        .create_local(username, &email, &payload.password)
        .await?;
    info!(user_id = %user.id, "User registered");

    let tokens = issue_tokens(&state, &user).await?;
    Ok((StatusCode::CREATED, Json(tokens)))
}

/// User login endpoint
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AuthResult<Json<TokenResponse>> {
    let identifier = payload.username_or_email.trim();
    let key = identifier.to_lowercase();

    state
        .rate_limiter
        .check(&key)
        .await
        .map_err(AuthError::TooManyRequests)?;

    let lookup = if identifier.contains('@') {
        key.as_str()
    } else {
        identifier
    };
    let user = state.user_repository.find_by_login(lookup).await?;

    let user = match user {
        Some(user) if crate::repositories::verify_password(&user, &payload.password) => user,
        _ => {
            warn!(identifier, "Failed login attempt");
            state.rate_limiter.record_failure(&key).await;
            return Err(AuthError::Unauthorized);
        }
    };

    state.rate_limiter.reset(&key).await;
    info!(user_id = %user.id, "User logged in");

    Ok(Json(issue_tokens(&state, &user).await?))
}

/// Trade a refresh token for a new token pair
pub async fn refresh_token(
    State(state): State<AppState>,
    Json(payload): Json<RefreshTokenRequest>,
) -> AuthResult<Json<TokenResponse>> {
    let claims = state.sessions.redeem(&payload.refresh_token).await?;

    let user = state
        .user_repository
        .find_by_id(claims.sub)
        .await?
        .ok_or(AuthError::Unauthorized)?;

    Ok(Json(issue_tokens(&state, &user).await?))
}

/// Logout endpoint
pub async fn logout(
    State(state): State<AppState>,
    Json(payload): Json<RefreshTokenRequest>,
) -> AuthResult<impl IntoResponse> {
    let claims = state
        .sessions
        .decode_refresh(&payload.refresh_token)
        .map_err(|_| AuthError::Unauthorized)?;

    state.sessions.revoke(&claims).await.map_err(|e| {
        error!(error = %e, "Failed to revoke session");
        AuthError::InternalServerError
    })?;

    Ok(Json(json!({"message": "Logged out successfully"})))
}

/// Current user
pub async fn me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> AuthResult<Json<User>> {
    let user = state
        .user_repository
        .find_by_id(claims.sub)
        .await?
        .ok_or(AuthError::NotFound)?;
    Ok(Json(user))
}

fn google(state: &AppState) -> AuthResult<&GoogleOAuth> {
    state.google.as_ref().ok_or(AuthError::NotFound)
}

/// Start a Google sign-in
pub async fn google_login(State(state): State<AppState>) -> AuthResult<Redirect> {
    let (url, session) = google(&state)?.authorize_url();

    state
        .redis_pool
        .set_json(
            &OAuthSession::key(&session.csrf_token),
            &session,
            OAUTH_SESSION_TTL,
        )
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to store OAuth state");
            AuthError::InternalServerError
        })?;

    Ok(Redirect::to(&url))
}

/// Finish a Google sign-in and hand the tokens to the frontend
pub async fn google_callback(
    State(state): State<AppState>,
    Query(query): Query<GoogleCallbackQuery>,
) -> AuthResult<Redirect> {
    let google = google(&state)?;

    if let Some(reason) = query.error {
        warn!(reason = %reason, "Google sign-in refused");
        return Err(AuthError::BadRequest(format!("Google sign-in failed: {}", reason)));
    }
    let (Some(code), Some(csrf)) = (query.code, query.state) else {
        return Err(AuthError::BadRequest("Missing code or state".to_string()));
    };

    let session: OAuthSession = state
        .redis_pool
        .take_json(&OAuthSession::key(&csrf))
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to load OAuth state");
            AuthError::InternalServerError
        })?
        .ok_or_else(|| AuthError::BadRequest("Unknown or expired sign-in state".to_string()))?;

    let profile = async {
        let access_token = google.exchange_code(code, session).await?;
        google.fetch_profile(&access_token).await
    }
    .await
    .map_err(|e| {
        warn!(error = %e, "Google sign-in failed");
        AuthError::BadRequest("Google sign-in failed".to_string())
    })?;

    if !profile.verified_email {
        return Err(AuthError::BadRequest(
            "Google account email is not verified".to_string(),
        ));
    }

    let user = google_user(&state, &profile).await?;
    let tokens = issue_tokens(&state, &user).await?;

    Ok(Redirect::to(&state.settings.callback_redirect(
        &tokens.access_token,
        &tokens.refresh_token,
    )))
}

/// Find the account for a Google profile, linking by email or creating one
async fn google_user(state: &AppState, profile: &GoogleProfile) -> AuthResult<User> {
    let users = &state.user_repository;

    if let Some(user) = users.find_by_google_id(&profile.id).await? {
        return Ok(user);
    }

    let email = profile.email.trim().to_lowercase();
    if let Some(user) = users.find_by_email(&email).await? {
        return Ok(users.link_google_id(user.id, &profile.id).await?);
    }

    let username = free_username(state, &email).await?;
    let user = users.create_google(&username, &email, &profile.id).await?;
    info!(user_id = %user.id, "User registered through Google");
    Ok(user)
}

async fn free_username(state: &AppState, email: &str) -> AuthResult<String> {
    let base = validation::username_from_email(email);
    if !state.user_repository.username_taken(&base).await? {
        return Ok(base);
    }

    for _ in 0..5 {
        let suffix: u32 = rand::thread_rng().gen_range(1000..10000);
        let candidate = format!("{}{}", base, suffix);
        if !state.user_repository.username_taken(&candidate).await? {
            return Ok(candidate);
        }
    }
    Err(AuthError::Conflict("Could not derive a free username".to_string()))
}

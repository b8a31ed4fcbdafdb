//! Token payloads

use serde::{Deserialize, Serialize};

/// Access and refresh token pair
#[derive(Debug, Clone, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    /// Access token lifetime in seconds
    pub expires_in: u64,
}

/// Body of refresh and logout requests
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

//! Google sign-in over OAuth2 authorization code flow with PKCE

use anyhow::Result;
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, PkceCodeChallenge,
    PkceCodeVerifier, RedirectUrl, Scope, TokenResponse, TokenUrl, basic::BasicClient,
    reqwest::async_http_client,
};
use serde::{Deserialize, Serialize};
use std::env;
use tracing::info;

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";

/// Seconds a pending sign-in may take before its state expires
pub const OAUTH_SESSION_TTL: u64 = 600;

/// OAuth2 configuration for Google
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_url: String,
    pub auth_url: String,
    pub token_url: String,
    pub userinfo_url: String,
}

impl OAuthConfig {
    /// `None` unless `GOOGLE_CLIENT_ID`, `GOOGLE_CLIENT_SECRET` and
    /// `GOOGLE_REDIRECT_URL` are all set
    pub fn from_env() -> Option<Self> {
        Some(Self {
            client_id: env::var("GOOGLE_CLIENT_ID").ok()?,
            client_secret: env::var("GOOGLE_CLIENT_SECRET").ok()?,
            redirect_url: env::var("GOOGLE_REDIRECT_URL").ok()?,
            auth_url: GOOGLE_AUTH_URL.to_string(),
            token_url: GOOGLE_TOKEN_URL.to_string(),
            userinfo_url: GOOGLE_USERINFO_URL.to_string(),
        })
    }
}

/// State kept in Redis between the redirect and the callback
#[derive(Debug, Serialize, Deserialize)]
pub struct OAuthSession {
    pub csrf_token: String,
    pub pkce_verifier: String,
}

impl OAuthSession {
    pub fn key(csrf_token: &str) -> String {
        format!("oauth_state:{}", csrf_token)
    }
}

/// Profile returned by Google's userinfo endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleProfile {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub verified_email: bool,
    pub name: Option<String>,
}

/// Google OAuth2 client
#[derive(Clone)]
pub struct GoogleOAuth {
    client: BasicClient,
    http: reqwest::Client,
    userinfo_url: String,
}

impl GoogleOAuth {
    pub fn new(config: OAuthConfig) -> Result<Self> {
        let client = BasicClient::new(
            ClientId::new(config.client_id),
            Some(ClientSecret::new(config.client_secret)),
            AuthUrl::new(config.auth_url)?,
            Some(TokenUrl::new(config.token_url)?),
        )
        .set_redirect_uri(RedirectUrl::new(config.redirect_url)?);

        Ok(Self {
            client,
            http: reqwest::Client::new(),
            userinfo_url: config.userinfo_url,
        })
    }

    /// Consent screen URL plus the state to park until the callback
    pub fn authorize_url(&self) -> (String, OAuthSession) {
        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

        let (auth_url, csrf_token) = self
            .client
            .authorize_url(CsrfToken::new_random)
            .add_scope(Scope::new("openid".to_string()))
            .add_scope(Scope::new("email".to_string()))
            .add_scope(Scope::new("profile".to_string()))
            .set_pkce_challenge(pkce_challenge)
            .url();

        let session = OAuthSession {
            csrf_token: csrf_token.secret().clone(),
            pkce_verifier: pkce_verifier.secret().clone(),
        };
        (auth_url.to_string(), session)
    }

    /// Exchange the authorization code for Google's access token
    pub async fn exchange_code(&self, code: String, session: OAuthSession) -> Result<String> {
        info!("Exchanging Google authorization code");

        let token = self
            .client
            .exchange_code(AuthorizationCode::new(code))
            .set_pkce_verifier(PkceCodeVerifier::new(session.pkce_verifier))
            .request_async(async_http_client)
            .await
            .map_err(|e| anyhow::anyhow!("Google token exchange failed: {}", e))?;

        Ok(token.access_token().secret().clone())
    }

    pub async fn fetch_profile(&self, access_token: &str) -> Result<GoogleProfile> {
        let response = self
            .http
            .get(&self.userinfo_url)
            .bearer_auth(access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            anyhow::bail!("Failed to get Google user profile: {}", response.status());
        }
        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn config() -> OAuthConfig {
        OAuthConfig {
            client_id: "client-123".to_string(),
            client_secret: "secret".to_string(),
            redirect_url: "http://localhost:3000/auth/google/callback".to_string(),
            auth_url: GOOGLE_AUTH_URL.to_string(),
            token_url: GOOGLE_TOKEN_URL.to_string(),
            userinfo_url: GOOGLE_USERINFO_URL.to_string(),
        }
    }

    #[test]
    fn authorize_url_carries_state_and_pkce() {
        let google = GoogleOAuth::new(config()).unwrap();
        let (url, session) = google.authorize_url();

        assert!(url.starts_with(GOOGLE_AUTH_URL));
        assert!(url.contains("client_id=client-123"));
        assert!(url.contains("code_challenge_method=S256"));
        assert!(url.contains(&format!("state={}", session.csrf_token)));
        assert!(!session.pkce_verifier.is_empty());

        let (_, other) = google.authorize_url();
        assert_ne!(other.csrf_token, session.csrf_token);
    }

    #[test]
    #[serial]
    fn disabled_without_full_configuration() {
        unsafe {
            std::env::set_var("GOOGLE_CLIENT_ID", "id");
            std::env::set_var("GOOGLE_CLIENT_SECRET", "secret");
            std::env::remove_var("GOOGLE_REDIRECT_URL");
        }
        assert!(OAuthConfig::from_env().is_none());

        unsafe {
            std::env::set_var("GOOGLE_REDIRECT_URL", "http://localhost/cb");
        }
        assert!(OAuthConfig::from_env().is_some());

        unsafe {
            std::env::remove_var("GOOGLE_CLIENT_ID");
            std::env::remove_var("GOOGLE_CLIENT_SECRET");
            std::env::remove_var("GOOGLE_REDIRECT_URL");
        }
    }

    #[test]
    fn profile_defaults_unverified() {
        let profile: GoogleProfile =
            serde_json::from_str(r#"{"id":"1","email":"ada@example.com"}"#).unwrap();
        assert!(!profile.verified_email);
        assert!(profile.name.is_none());
    }
}

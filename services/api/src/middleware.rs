//! Bearer token validation for protected routes

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use std::env;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{error::ApiError, state::AppState};

/// JWT claims issued by the auth service
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub iat: u64,
    pub exp: u64,
    pub jti: Uuid,
    pub token_type: TokenType,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub enum TokenType {
    Access,
    Refresh,
}

/// Caller identity, available to handlers as an `Extension`
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub username: String,
}

/// Verifies access tokens with the auth service's public key
#[derive(Clone)]
pub struct JwtVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    /// # Environment Variables
    /// - `JWT_PUBLIC_KEY`: RS256 public key, PEM text or a path to a PEM file
    /// - `JWT_SECRET`: HS256 shared secret, used when no public key is set
    pub fn from_env() -> anyhow::Result<Self> {
        if let Ok(public_key) = env::var("JWT_PUBLIC_KEY") {
            let pem = read_pem(&public_key)?;
            return Ok(Self::from_rsa_pem(&pem)?);
        }
        if let Ok(secret) = env::var("JWT_SECRET") {
            warn!("JWT_PUBLIC_KEY not set, verifying tokens with the HS256 shared secret");
            return Ok(Self::from_secret(secret.as_bytes()));
        }
        anyhow::bail!("either JWT_PUBLIC_KEY or JWT_SECRET must be set")
    }

    pub fn from_rsa_pem(pem: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        Ok(Self {
            decoding_key: DecodingKey::from_rsa_pem(pem.as_bytes())?,
            validation: Validation::new(Algorithm::RS256),
        })
    }

    pub fn from_secret(secret: &[u8]) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    /// Decode an access token; refresh tokens are refused
    pub fn verify(&self, token: &str) -> Result<AuthUser, ApiError> {
        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| {
                info!(error = %e, "Rejected bearer token");
                ApiError::Unauthorized
            })?
            .claims;

        if claims.token_type != TokenType::Access {
            info!(user_id = %claims.sub, "Refresh token presented as bearer");
            return Err(ApiError::Unauthorized);
        }

        Ok(AuthUser {
            id: claims.sub,
            username: claims.username,
        })
    }
}

/// PEM text as is, otherwise a file path
fn read_pem(value: &str) -> anyhow::Result<String> {
    if value.starts_with("-----BEGIN") {
        return Ok(value.to_string());
    }
    let pem = std::fs::read_to_string(value)
        .map_err(|e| anyhow::anyhow!("Failed to read key file {}: {}", value, e))?;
    Ok(pem.trim().to_string())
}

/// Authentication middleware
pub async fn auth_middleware(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let TypedHeader(Authorization(bearer)) = bearer.ok_or(ApiError::Unauthorized)?;
    let user = state.verifier.verify(bearer.token())?;

    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header, encode};

    const SECRET: &[u8] = b"test-secret";

    fn token(token_type: TokenType, exp_offset: i64) -> String {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: Uuid::new_v4(),
            username: "ada".to_string(),
            iat: now as u64,
            exp: (now + exp_offset) as u64,
            jti: Uuid::new_v4(),
            token_type,
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET),
        )
        .unwrap()
    }

    #[test]
    fn accepts_access_tokens() {
        let verifier = JwtVerifier::from_secret(SECRET);
        let user = verifier.verify(&token(TokenType::Access, 900)).unwrap();
        assert_eq!(user.username, "ada");
    }

    #[test]
    fn refuses_refresh_expired_and_foreign_tokens() {
        let verifier = JwtVerifier::from_secret(SECRET);
        assert!(verifier.verify(&token(TokenType::Refresh, 900)).is_err());
        assert!(verifier.verify(&token(TokenType::Access, -3600)).is_err());

        let other = JwtVerifier::from_secret(b"another-secret");
        assert!(other.verify(&token(TokenType::Access, 900)).is_err());
        assert!(verifier.verify("not-a-jwt").is_err());
    }

    #[test]
    fn pem_values_pass_through() {
        let pem = "-----BEGIN PUBLIC KEY-----\nabc\n-----END PUBLIC KEY-----";
        assert_eq!(read_pem(pem).unwrap(), pem);
        assert!(read_pem("/nonexistent/key.pem").is_err());
    }
}

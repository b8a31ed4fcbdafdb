//! JWT service for token generation, validation, and revocation
//!
//! Tokens are signed with RS256 when a key pair is configured and with
//! HS256 when only a shared secret is available (local development).
//! Revoked refresh tokens are blacklisted in Redis by `jti` until they
//! would have expired anyway.

use anyhow::Result;
use common::cache::RedisPool;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::warn;
use tracker::User;
use uuid::Uuid;

/// Signing material
#[derive(Debug, Clone)]
pub enum KeyMaterial {
    /// RS256 key pair in PEM format
    Rsa {
        private_key: String,
        public_key: String,
    },
    /// HS256 shared secret
    Secret(String),
}

/// JWT configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub keys: KeyMaterial,
    /// Access token lifetime in seconds (default: 15 minutes)
    pub access_token_expiry: u64,
    /// Refresh token lifetime in seconds (default: 7 days)
    pub refresh_token_expiry: u64,
}

impl JwtConfig {
    /// Create a new JwtConfig from environment variables
    ///
    /// # Environment Variables
    /// - `JWT_PRIVATE_KEY` / `JWT_PUBLIC_KEY`: RS256 key pair, PEM text or file paths
    /// - `JWT_SECRET`: HS256 secret, used when no private key is set
    /// - `JWT_ACCESS_TOKEN_EXPIRY`: Access token expiry in seconds (default: 900)
    /// - `JWT_REFRESH_TOKEN_EXPIRY`: Refresh token expiry in seconds (default: 604800)
    pub fn from_env() -> Result<Self> {
        let keys = match std::env::var("JWT_PRIVATE_KEY") {
            Ok(private_key) => {
                let public_key = std::env::var("JWT_PUBLIC_KEY").map_err(|_| {
                    anyhow::anyhow!("JWT_PUBLIC_KEY must be set alongside JWT_PRIVATE_KEY")
                })?;
                KeyMaterial::Rsa {
                    private_key: read_pem(&private_key)?,
                    public_key: read_pem(&public_key)?,
                }
            }
            Err(_) => {
                let secret = std::env::var("JWT_SECRET").map_err(|_| {
                    anyhow::anyhow!("either JWT_PRIVATE_KEY or JWT_SECRET must be set")
                })?;
                warn!("JWT_PRIVATE_KEY not set, signing tokens with the HS256 shared secret");
                KeyMaterial::Secret(secret)
            }
        };

        Ok(JwtConfig {
            keys,
            access_token_expiry: expiry_var("JWT_ACCESS_TOKEN_EXPIRY", 900),
            refresh_token_expiry: expiry_var("JWT_REFRESH_TOKEN_EXPIRY", 604_800),
        })
    }
}

fn expiry_var(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .filter(|v| *v > 0)
        .unwrap_or(default)
}

/// PEM text as is, otherwise a file path
fn read_pem(value: &str) -> Result<String> {
    if value.starts_with("-----BEGIN") {
        return Ok(value.to_string());
    }
    let pem = std::fs::read_to_string(value)
        .map_err(|e| anyhow::anyhow!("Failed to read key file {}: {}", value, e))?;
    Ok(pem.trim().to_string())
}

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: Uuid,
    pub username: String,
    /// Issued at (seconds since the epoch)
    pub iat: u64,
    /// Expiration (seconds since the epoch)
    pub exp: u64,
    /// Unique token id; sessions and the blacklist are keyed by it
    pub jti: Uuid,
    pub token_type: TokenType,
}

/// Token type enum
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub enum TokenType {
    Access,
    Refresh,
}

fn unix_now() -> Result<u64> {
    Ok(SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| anyhow::anyhow!("Failed to get current time: {}", e))?
        .as_secs())
}

/// JWT service
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    algorithm: Algorithm,
    validation: Validation,
    config: JwtConfig,
}

impl JwtService {
    /// Initialize a new JWT service
    pub fn new(config: JwtConfig) -> Result<Self> {
        let (encoding_key, decoding_key, algorithm) = match &config.keys {
            KeyMaterial::Rsa {
                private_key,
                public_key,
            } => (
                EncodingKey::from_rsa_pem(private_key.as_bytes())?,
                DecodingKey::from_rsa_pem(public_key.as_bytes())?,
                Algorithm::RS256,
            ),
            KeyMaterial::Secret(secret) => (
                EncodingKey::from_secret(secret.as_bytes()),
                DecodingKey::from_secret(secret.as_bytes()),
                Algorithm::HS256,
            ),
        };

        Ok(JwtService {
            encoding_key,
            decoding_key,
            algorithm,
            validation: Validation::new(algorithm),
            config,
        })
    }

    fn sign(&self, user: &User, token_type: TokenType, lifetime: u64) -> Result<String> {
        let now = unix_now()?;
        let claims = Claims {
            sub: user.id,
            username: user.username.clone(),
            iat: now,
            exp: now + lifetime,
            jti: Uuid::new_v4(),
            token_type,
        };
        Ok(encode(&Header::new(self.algorithm), &claims, &self.encoding_key)?)
    }

    /// Generate an access token for a user
    pub fn generate_access_token(&self, user: &User) -> Result<String> {
        self.sign(user, TokenType::Access, self.config.access_token_expiry)
    }

    /// Generate a refresh token for a user
    pub fn generate_refresh_token(&self, user: &User) -> Result<String> {
        self.sign(user, TokenType::Refresh, self.config.refresh_token_expiry)
    }

    /// Validate signature and expiry and return the claims
    pub fn validate_token(&self, token: &str) -> Result<Claims> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        Ok(token_data.claims)
    }

    /// Seconds until the token expires, zero when already expired
    pub fn remaining_lifetime(&self, claims: &Claims) -> Result<u64> {
        Ok(claims.exp.saturating_sub(unix_now()?))
    }

    /// Check if a token id is blacklisted in Redis
    pub async fn is_token_blacklisted(&self, redis_pool: &RedisPool, jti: Uuid) -> Result<bool> {
        let result = redis_pool.get(&blacklist_key(jti)).await?;
        Ok(result.is_some())
    }

    /// Blacklist a token id for the rest of its lifetime
    pub async fn blacklist_token(&self, redis_pool: &RedisPool, claims: &Claims) -> Result<()> {
        let expiry = self.remaining_lifetime(claims)?;
        if expiry == 0 {
            return Ok(());
        }
        redis_pool
            .set(&blacklist_key(claims.jti), "1", Some(expiry))
            .await?;
        Ok(())
    }

    /// Get the access token expiry time
    pub fn access_token_expiry(&self) -> u64 {
        self.config.access_token_expiry
    }

    /// Get the refresh token expiry time
    pub fn refresh_token_expiry(&self) -> u64 {
        self.config.refresh_token_expiry
    }
}

fn blacklist_key(jti: Uuid) -> String {
    format!("blacklisted_token:{}", jti)
}

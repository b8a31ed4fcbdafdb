//! Refresh sessions in Redis
//!
//! Every refresh token owns a `session:{jti}` key that lives as long as the
//! token. Redeeming a token consumes its session, so a refresh token works
//! once; revoked tokens are also blacklisted.

use anyhow::Result;
use common::{cache::RedisPool, error::CacheError};
use thiserror::Error;
use tracing::{error, info, warn};
use tracker::User;
use uuid::Uuid;

use crate::{
    error::AuthError,
    jwt::{Claims, JwtService, TokenType},
    models::TokenResponse,
};

/// Why a refresh token was refused
#[derive(Debug, PartialEq)]
pub enum Rejection {
    Invalid,
    WrongType,
    Revoked,
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Refresh token rejected: {0:?}")]
    Rejected(Rejection),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Token(#[from] anyhow::Error),
}

impl From<SessionError> for AuthError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Rejected(_) => AuthError::Unauthorized,
            other => {
                error!(error = %other, "Session store failure");
                AuthError::InternalServerError
            }
        }
    }
}

/// Session manager for handling user sessions in Redis
#[derive(Clone)]
pub struct SessionManager {
    redis_pool: RedisPool,
    jwt_service: JwtService,
}

fn session_key(jti: Uuid) -> String {
    format!("session:{}", jti)
}

impl SessionManager {
    pub fn new(redis_pool: RedisPool, jwt_service: JwtService) -> Self {
        Self {
            redis_pool,
            jwt_service,
        }
    }

    pub fn jwt(&self) -> &JwtService {
        &self.jwt_service
    }

    /// Mint a token pair and open the refresh session
    pub async fn issue(&self, user: &User) -> Result<TokenResponse> {
        let access_token = self.jwt_service.generate_access_token(user)?;
        let refresh_token = self.jwt_service.generate_refresh_token(user)?;
        let claims = self.jwt_service.validate_token(&refresh_token)?;

        self.redis_pool
            .set(
                &session_key(claims.jti),
                &user.id.to_string(),
                Some(self.jwt_service.refresh_token_expiry()),
            )
            .await?;
        info!(user_id = %user.id, "Session created");

        Ok(TokenResponse {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: self.jwt_service.access_token_expiry(),
        })
    }

    /// Decode a refresh token without touching Redis
    pub fn decode_refresh(&self, token: &str) -> Result<Claims, Rejection> {
        let claims = self
            .jwt_service
            .validate_token(token)
            .map_err(|_| Rejection::Invalid)?;
        if claims.token_type != TokenType::Refresh {
            return Err(Rejection::WrongType);
        }
        Ok(claims)
    }

    /// Consume a refresh token; the caller issues the replacement pair
    pub async fn redeem(&self, token: &str) -> Result<Claims, SessionError> {
        let claims = self.decode_refresh(token).map_err(SessionError::Rejected)?;

        if self
            .jwt_service
            .is_token_blacklisted(&self.redis_pool, claims.jti)
            .await?
        {
            warn!(user_id = %claims.sub, "Blacklisted refresh token presented");
            return Err(SessionError::Rejected(Rejection::Revoked));
        }

        let owner = self.redis_pool.take(&session_key(claims.jti)).await?;
        if owner.as_deref() != Some(claims.sub.to_string().as_str()) {
            warn!(user_id = %claims.sub, "Refresh token without a live session");
            return Err(SessionError::Rejected(Rejection::Revoked));
        }

        self.jwt_service
            .blacklist_token(&self.redis_pool, &claims)
            .await?;
        Ok(claims)
    }

    /// Close the session and blacklist the token
    pub async fn revoke(&self, claims: &Claims) -> Result<()> {
        self.jwt_service
            .blacklist_token(&self.redis_pool, claims)
            .await?;
        self.redis_pool.delete(&session_key(claims.jti)).await?;
        info!(user_id = %claims.sub, "Session revoked");
        Ok(())
    }

    /// Get Redis health status
    pub async fn health_check(&self) -> Result<bool> {
        Ok(self.redis_pool.health_check().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jwt::{JwtConfig, KeyMaterial};
    use chrono::Utc;
    use common::cache::RedisConfig;

    fn manager() -> SessionManager {
        let redis = RedisPool::new(&RedisConfig {
            url: "redis://127.0.0.1:6379".to_string(),
            key_prefix: format!("habits-test-{}", Uuid::new_v4()),
        })
        .unwrap();
        let jwt = JwtService::new(JwtConfig {
            keys: KeyMaterial::Secret("session-test".into()),
            access_token_expiry: 900,
            refresh_token_expiry: 3600,
        })
        .unwrap();
        SessionManager::new(redis, jwt)
    }

    fn user() -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            username: "ada".to_string(),
            email: "ada@example.com".to_string(),
            password_hash: Some("hash".to_string()),
            google_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn access_tokens_are_not_refresh_tokens() {
        let manager = manager();
        let access = manager.jwt().generate_access_token(&user()).unwrap();
        assert_eq!(manager.decode_refresh(&access).unwrap_err(), Rejection::WrongType);
        assert_eq!(manager.decode_refresh("garbage").unwrap_err(), Rejection::Invalid);
    }

    #[tokio::test]
    #[ignore = "requires a running Redis on localhost:6379"]
    async fn refresh_tokens_redeem_once() {
        let manager = manager();
        let user = user();

        let pair = manager.issue(&user).await.unwrap();
        let claims = manager.redeem(&pair.refresh_token).await.unwrap();
        assert_eq!(claims.sub, user.id);

        let again = manager.redeem(&pair.refresh_token).await.unwrap_err();
        assert!(matches!(again, SessionError::Rejected(Rejection::Revoked)));
    }

    #[tokio::test]
    #[ignore = "requires a running Redis on localhost:6379"]
    async fn revoked_tokens_cannot_be_redeemed() {
        let manager = manager();
        let pair = manager.issue(&user()).await.unwrap();

        let claims = manager.decode_refresh(&pair.refresh_token).unwrap();
        manager.revoke(&claims).await.unwrap();

        let err = manager.redeem(&pair.refresh_token).await.unwrap_err();
        assert!(matches!(err, SessionError::Rejected(Rejection::Revoked)));
    }
}

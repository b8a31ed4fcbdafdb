//! Redis cache
//!
//! Short-lived state for the auth service lives here: refresh-token
//! sessions, the revoked-token blacklist and OAuth CSRF/PKCE state.
//! Every value is stored with a TTL so nothing needs sweeping.

use crate::error::{CacheError, CacheResult};
use redis::{AsyncCommands, Client};
use serde::{Serialize, de::DeserializeOwned};
use tracing::info;

/// Configuration for Redis connection
#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// Redis connection URL (e.g., "redis://localhost:6379")
    pub url: String,
    /// Prefix prepended to every key, so several deployments can share a server
    pub key_prefix: String,
}

impl RedisConfig {
    /// Create a new RedisConfig from environment variables
    ///
    /// # Environment Variables
    /// - `REDIS_URL`: Redis connection URL (default: "redis://localhost:6379")
    /// - `REDIS_KEY_PREFIX`: Key namespace (default: "habits")
    pub fn from_env() -> CacheResult<Self> {
        let url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());
        let key_prefix =
            std::env::var("REDIS_KEY_PREFIX").unwrap_or_else(|_| "habits".to_string());

        Ok(RedisConfig { url, key_prefix })
    }
}

/// Redis client handle
///
/// Cloning is cheap; each operation opens a multiplexed connection.
#[derive(Clone)]
pub struct RedisPool {
    client: Client,
    key_prefix: String,
}

impl RedisPool {
    /// Create the client; no connection is made until the first command
    pub fn new(config: &RedisConfig) -> CacheResult<Self> {
        let client = Client::open(config.url.clone()).map_err(CacheError::Connection)?;
        info!("Redis client initialized with URL: {}", config.url);
        Ok(RedisPool {
            client,
            key_prefix: config.key_prefix.clone(),
        })
    }

    fn key(&self, key: &str) -> String {
        format!("{}:{}", self.key_prefix, key)
    }

    async fn connection(&self) -> CacheResult<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(CacheError::Connection)
    }

    /// Set a key-value pair with optional TTL
    pub async fn set(&self, key: &str, value: &str, ttl_seconds: Option<u64>) -> CacheResult<()> {
        let mut conn = self.connection().await?;
        let key = self.key(key);

        match ttl_seconds {
            Some(ttl) => conn.set_ex::<_, _, ()>(key, value, ttl).await,
            None => conn.set::<_, _, ()>(key, value).await,
        }
        .map_err(CacheError::Command)
    }

    /// Get a value by key
    pub async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let mut conn = self.connection().await?;
        conn.get(self.key(key)).await.map_err(CacheError::Command)
    }

    /// Get a value and delete it in the same round trip
    pub async fn take(&self, key: &str) -> CacheResult<Option<String>> {
        let mut conn = self.connection().await?;
        conn.get_del(self.key(key))
            .await
            .map_err(CacheError::Command)
    }

    /// Delete a key
    pub async fn delete(&self, key: &str) -> CacheResult<()> {
        let mut conn = self.connection().await?;
        conn.del::<_, u64>(self.key(key))
            .await
            .map_err(CacheError::Command)?;
        Ok(())
    }

    /// Store a JSON-encoded value with a TTL
    pub async fn set_json<T: Serialize>(&self, key: &str, value: &T, ttl_seconds: u64) -> CacheResult<()> {
        let payload = serde_json::to_string(value)?;
        self.set(key, &payload, Some(ttl_seconds)).await
    }

    /// Take a JSON-encoded value, deleting it
    pub async fn take_json<T: DeserializeOwned>(&self, key: &str) -> CacheResult<Option<T>> {
        match self.take(key).await? {
            Some(payload) => Ok(Some(serde_json::from_str(&payload)?)),
            None => Ok(None),
        }
    }

    /// Check if Redis is reachable
    pub async fn health_check(&self) -> CacheResult<bool> {
        let mut conn = self.connection().await?;
        let pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(CacheError::Command)?;
        Ok(pong == "PONG")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    fn local_pool() -> RedisPool {
        RedisPool::new(&RedisConfig {
            url: "redis://localhost:6379".to_string(),
            key_prefix: "habits-test".to_string(),
        })
        .unwrap()
    }

    #[test]
    fn test_keys_are_namespaced() {
        let pool = local_pool();
        assert_eq!(pool.key("session:42"), "habits-test:session:42");
    }

    #[test]
    fn test_invalid_url_is_a_connection_error() {
        let result = RedisPool::new(&RedisConfig {
            url: "not a url".to_string(),
            key_prefix: "x".to_string(),
        });
        assert!(matches!(result, Err(CacheError::Connection(_))));
    }

    #[tokio::test]
    #[ignore = "requires a running Redis on localhost:6379"]
    async fn test_set_get_take() -> CacheResult<()> {
        let pool = local_pool();

        pool.set("k", "v", Some(5)).await?;
        assert_eq!(pool.get("k").await?, Some("v".to_string()));
        assert_eq!(pool.take("k").await?, Some("v".to_string()));
        assert_eq!(pool.get("k").await?, None);

        Ok(())
    }

    #[tokio::test]
    #[ignore = "requires a running Redis on localhost:6379"]
    async fn test_json_round_trip() -> CacheResult<()> {
        #[derive(Debug, Serialize, Deserialize, PartialEq)]
        struct State {
            csrf: String,
        }

        let pool = local_pool();
        let state = State {
            csrf: "abc".to_string(),
        };
        pool.set_json("oauth:abc", &state, 5).await?;
        assert_eq!(pool.take_json::<State>("oauth:abc").await?, Some(state));
        assert_eq!(pool.take_json::<State>("oauth:abc").await?, None);

        Ok(())
    }
}

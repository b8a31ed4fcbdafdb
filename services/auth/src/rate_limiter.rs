//! Login lockout after repeated failures

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::warn;

/// Rate limiter configuration
#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    /// Failures tolerated inside one window
    pub max_attempts: u32,
    /// Time window in seconds
    pub window_seconds: u64,
    /// Ban duration in seconds
    pub ban_duration_seconds: u64,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            window_seconds: 300,
            ban_duration_seconds: 900,
        }
    }
}

#[derive(Debug)]
struct RateLimiterEntry {
    failures: u32,
    window_start: Instant,
    ban_expires: Option<Instant>,
}

/// Counts failed logins per identifier
#[derive(Debug, Clone)]
pub struct RateLimiter {
    config: RateLimiterConfig,
    entries: Arc<Mutex<HashMap<String, RateLimiterEntry>>>,
}

impl RateLimiter {
    pub fn new(config: RateLimiterConfig) -> Self {
        Self {
            config,
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// `Err(seconds)` while the key is banned
    pub async fn check(&self, key: &str) -> Result<(), u64> {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();

        match entries.get(key).and_then(|e| e.ban_expires) {
            Some(expires) if now < expires => Err((expires - now).as_secs().max(1)),
            Some(_) => {
                entries.remove(key);
                Ok(())
            }
            None => Ok(()),
        }
    }

    /// Count a failure; returns true when it triggered a ban
    pub async fn record_failure(&self, key: &str) -> bool {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        let window = Duration::from_secs(self.config.window_seconds);

        // Drop identifiers whose window and ban have both run out
        entries.retain(|_, e| {
            now.duration_since(e.window_start) < window
                || e.ban_expires.is_some_and(|expires| now < expires)
        });

        let entry = entries.entry(key.to_string()).or_insert(RateLimiterEntry {
            failures: 0,
            window_start: now,
            ban_expires: None,
        });

        if now.duration_since(entry.window_start) >= window {
            entry.failures = 0;
            entry.window_start = now;
        }

        entry.failures += 1;
        if entry.failures >= self.config.max_attempts {
            entry.ban_expires = Some(now + Duration::from_secs(self.config.ban_duration_seconds));
            warn!(
                key,
                seconds = self.config.ban_duration_seconds,
                "Too many failed logins, banning"
            );
            return true;
        }
        false
    }

    /// Forget the key after a successful login
    pub async fn reset(&self, key: &str) {
        self.entries.lock().await.remove(key);
    }
}

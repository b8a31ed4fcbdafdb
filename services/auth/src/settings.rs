//! Service settings read from `AUTH_*` environment variables

use config::{Config, ConfigError, Environment};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AuthSettings {
    pub bind_addr: String,
    /// Where Google sign-ins land, with tokens in the URL fragment
    pub frontend_url: String,
    pub run_migrations: bool,
}

impl AuthSettings {
    /// # Environment Variables
    /// - `AUTH_BIND_ADDR` (default: `0.0.0.0:3000`)
    /// - `AUTH_FRONTEND_URL` (default: `http://localhost:5173`)
    /// - `AUTH_RUN_MIGRATIONS` (default: `true`)
    pub fn from_env() -> Result<Self, ConfigError> {
        Config::builder()
            .set_default("bind_addr", "0.0.0.0:3000")?
            .set_default("frontend_url", "http://localhost:5173")?
            .set_default("run_migrations", true)?
            .add_source(Environment::with_prefix("AUTH").try_parsing(true))
            .build()?
            .try_deserialize()
    }

    /// Frontend route that receives a finished Google sign-in
    pub fn callback_redirect(&self, access_token: &str, refresh_token: &str) -> String {
        format!(
            "{}/auth/callback#access_token={}&refresh_token={}",
            self.frontend_url.trim_end_matches('/'),
            access_token,
            refresh_token
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn defaults_and_overrides() {
        unsafe {
            std::env::remove_var("AUTH_BIND_ADDR");
            std::env::set_var("AUTH_FRONTEND_URL", "https://habits.example.com/");
        }

        let settings = AuthSettings::from_env().unwrap();
        assert_eq!(settings.bind_addr, "0.0.0.0:3000");
        assert_eq!(
            settings.callback_redirect("a.b.c", "d.e.f"),
            "https://habits.example.com/auth/callback#access_token=a.b.c&refresh_token=d.e.f"
        );

        unsafe {
            std::env::remove_var("AUTH_FRONTEND_URL");
        }
    }
}

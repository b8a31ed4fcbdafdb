//! Service settings read from `API_*` environment variables

use config::{Config, ConfigError, Environment};
use serde::Deserialize;

/// Settings for the API service
#[derive(Debug, Clone, Deserialize)]
pub struct ApiSettings {
    /// Address the HTTP server binds to
    pub bind_addr: String,
    /// Apply pending migrations at startup
    pub run_migrations: bool,
}

impl ApiSettings {
    /// # Environment Variables
    /// - `API_BIND_ADDR` (default: `0.0.0.0:3001`)
    /// - `API_RUN_MIGRATIONS` (default: `true`)
    pub fn from_env() -> Result<Self, ConfigError> {
        Config::builder()
            .set_default("bind_addr", "0.0.0.0:3001")?
            .set_default("run_migrations", true)?
            .add_source(Environment::with_prefix("API").try_parsing(true))
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn defaults_apply_without_environment() {
        unsafe {
            std::env::remove_var("API_BIND_ADDR");
            std::env::remove_var("API_RUN_MIGRATIONS");
        }

        let settings = ApiSettings::from_env().unwrap();
        assert_eq!(settings.bind_addr, "0.0.0.0:3001");
        assert!(settings.run_migrations);
    }

    #[test]
    #[serial]
    fn environment_overrides_defaults() {
        unsafe {
            std::env::set_var("API_BIND_ADDR", "127.0.0.1:8080");
            std::env::set_var("API_RUN_MIGRATIONS", "false");
        }

        let settings = ApiSettings::from_env().unwrap();
        assert_eq!(settings.bind_addr, "127.0.0.1:8080");
        assert!(!settings.run_migrations);

        unsafe {
            std::env::remove_var("API_BIND_ADDR");
            std::env::remove_var("API_RUN_MIGRATIONS");
        }
    }
}

//! Tracing setup shared by the services

use tracing_subscriber::{EnvFilter, fmt};

/// Install the global fmt subscriber
///
/// The filter comes from `RUST_LOG` and falls back to `info`. Calling this
/// twice is harmless; the second install is ignored.
pub fn init_tracing(service: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let installed = fmt().with_env_filter(filter).with_target(false).try_init();

    if installed.is_ok() {
        tracing::info!(service, "Tracing initialized");
    }
}

//! Logging setup

use tracing_subscriber::EnvFilter;

/// Initialise logging. `RUST_LOG` overrides `default_level`. Calling this
/// twice is harmless.
pub fn init(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

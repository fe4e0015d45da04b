use tracing_subscriber::{fmt, EnvFilter};

use crate::config::AppConfig;

/// Initializes the global tracing subscriber from the configured level.
/// `RUST_LOG` takes precedence when set. Calling this twice is a no-op
/// rather than an error, so tests can initialize freely.
pub fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone()));

    let builder = fmt().with_env_filter(filter);
    let result = if config.log_json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    if result.is_err() {
        tracing::debug!("tracing subscriber was already initialized");
    }
}

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use validator::Validate;

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_BACKEND_URL: &str = "http://localhost:8080";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_DEBOUNCE_MS: u64 = 300;
const DEFAULT_IMAGE_PROBE_TIMEOUT_SECS: u64 = 5;
const DEFAULT_MAX_IMAGE_BYTES: usize = 2 * 1024 * 1024;
const DEFAULT_ACTIVITY_FEED_CAPACITY: usize = 5;
const DEFAULT_SESSION_STATE_FILE: &str = ".cabdesk-session.json";
const CONFIG_DIR: &str = "config";

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}
fn default_environment() -> String {
    DEFAULT_ENV.to_string()
}
fn default_backend_url() -> String {
    DEFAULT_BACKEND_URL.to_string()
}
fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}
fn default_debounce_ms() -> u64 {
    DEFAULT_DEBOUNCE_MS
}
fn default_image_probe_timeout_secs() -> u64 {
    DEFAULT_IMAGE_PROBE_TIMEOUT_SECS
}
fn default_max_image_bytes() -> usize {
    DEFAULT_MAX_IMAGE_BYTES
}
fn default_activity_feed_capacity() -> usize {
    DEFAULT_ACTIVITY_FEED_CAPACITY
}
fn default_session_state_file() -> String {
    DEFAULT_SESSION_STATE_FILE.to_string()
}
fn default_default_image() -> String {
    crate::images::DEFAULT_IMAGE.to_string()
}

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// REST backend base URL
    #[serde(default = "default_backend_url")]
    #[validate(url(message = "backend_url must be a valid URL"))]
    pub backend_url: String,

    /// Per-request timeout (seconds)
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Trailing-edge search debounce window (milliseconds)
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Image URL reachability probe timeout (seconds)
    #[serde(default = "default_image_probe_timeout_secs")]
    pub image_probe_timeout_secs: u64,

    /// Maximum decoded size accepted for uploaded images
    #[serde(default = "default_max_image_bytes")]
    pub max_image_bytes: usize,

    /// Placeholder substituted for images that fail validation
    #[serde(default = "default_default_image")]
    pub default_image: String,

    /// Recent-activity feed capacity on the dashboard
    #[serde(default = "default_activity_feed_capacity")]
    pub activity_feed_capacity: usize,

    /// Where the logged-in session (token + profile) is persisted
    #[serde(default = "default_session_state_file")]
    pub session_state_file: String,

    /// Application environment
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend_url: default_backend_url(),
            request_timeout_secs: default_request_timeout_secs(),
            debounce_ms: default_debounce_ms(),
            image_probe_timeout_secs: default_image_probe_timeout_secs(),
            max_image_bytes: default_max_image_bytes(),
            default_image: default_default_image(),
            activity_feed_capacity: default_activity_feed_capacity(),
            session_state_file: default_session_state_file(),
            environment: default_environment(),
            log_level: default_log_level(),
            log_json: false,
        }
    }
}

impl AppConfig {
    /// Loads configuration by layering `config/default.toml`, an optional
    /// per-environment file, and `CABDESK__`-prefixed environment
    /// variables over the built-in defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let run_env = env::var("RUN_ENV").unwrap_or_else(|_| DEFAULT_ENV.to_string());

        let config = Config::builder()
            .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
            .add_source(
                File::with_name(&format!("{}/{}", CONFIG_DIR, run_env)).required(false),
            )
            .add_source(Environment::with_prefix("CABDESK").separator("__"))
            .build()?;

        let loaded: AppConfig = config.try_deserialize()?;
        loaded
            .validate()
            .map_err(|e| ConfigError::Message(e.to_string()))?;
        Ok(loaded)
    }

    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_timeout_secs)
    }

    pub fn debounce_window(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.debounce_ms)
    }

    pub fn image_probe_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.image_probe_timeout_secs)
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }
}

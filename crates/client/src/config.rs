//! Client configuration.
//!
//! Mobile hosts construct [`ClientConfig`] programmatically with the URLs
//! baked into the app bundle. [`ClientConfig::from_env`] exists for
//! development tooling and tests.
//!
//! # Environment Variables
//!
//! ## Required
//! - `SCANCART_API_URL` - Base URL of the backend API (e.g. `https://api.example.com/api/`)
//! - `SCANCART_RECOGNITION_URL` - Full URL of the image recognition endpoint
//!
//! ## Optional
//! - `SCANCART_REQUEST_TIMEOUT_SECS` - Per-request timeout (default: 15)

use std::time::Duration;

use thiserror::Error;
use url::Url;

/// Default per-request timeout in seconds.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL all API paths are joined onto. Always ends with `/` so
    /// joining a relative path appends rather than replaces.
    pub api_base_url: Url,
    /// Full URL of the image recognition endpoint.
    pub recognition_url: Url,
    /// Per-request timeout.
    pub request_timeout: Duration,
    /// User-Agent header sent with every request.
    pub user_agent: String,
}

impl ClientConfig {
    /// Create a configuration with default timeout and user agent.
    #[must_use]
    pub fn new(api_base_url: Url, recognition_url: Url) -> Self {
        Self {
            api_base_url: ensure_trailing_slash(api_base_url),
            recognition_url,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            user_agent: default_user_agent(),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api_base_url = get_url("SCANCART_API_URL")?;
        let recognition_url = get_url("SCANCART_RECOGNITION_URL")?;
        let timeout_secs = get_env_or_default(
            "SCANCART_REQUEST_TIMEOUT_SECS",
            &DEFAULT_REQUEST_TIMEOUT_SECS.to_string(),
        )
        .parse::<u64>()
        .map_err(|e| {
            ConfigError::InvalidEnvVar("SCANCART_REQUEST_TIMEOUT_SECS".to_string(), e.to_string())
        })?;

        Ok(Self {
            api_base_url: ensure_trailing_slash(api_base_url),
            recognition_url,
            request_timeout: Duration::from_secs(timeout_secs),
            user_agent: default_user_agent(),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Get a required environment variable parsed as a URL.
fn get_url(key: &str) -> Result<Url, ConfigError> {
    get_required_env(key)?
        .parse::<Url>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

fn default_user_agent() -> String {
    format!("scancart/{}", env!("CARGO_PKG_VERSION"))
}

/// Append a trailing slash to the URL path if missing.
///
/// `Url::join` on a base without a trailing slash replaces the final path
/// segment instead of appending, which would silently drop the `/api/v1`
/// part of a base URL.
fn ensure_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

//! Storefront client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All variables are optional.
//!
//! - `LOOPSTORE_API_URL` - Base URL of the shop REST API (default: `http://localhost/api`)
//! - `LOOPSTORE_DATA_DIR` - Directory for client-local storage
//!   (default: `<local data dir>/loopstore`, falling back to `.loopstore`)
//! - `LOOPSTORE_HTTP_TIMEOUT_SECS` - Per-request timeout (default: 10)
//! - `LOOPSTORE_CACHE_TTL_SECS` - Product/category cache TTL, 0 disables (default: 300)
//! - `LOOPSTORE_CURRENCY` - Currency used when displaying prices (default: USD)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::path::PathBuf;
use std::time::Duration;

use loopstore_core::CurrencyCode;
use thiserror::Error;
use url::Url;

const DEFAULT_API_URL: &str = "http://localhost/api";
const DEFAULT_HTTP_TIMEOUT_SECS: &str = "10";
const DEFAULT_CACHE_TTL_SECS: &str = "300";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront client configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Shop API connection settings
    pub api: ApiConfig,
    /// Directory holding the client-local key/value files
    pub data_dir: PathBuf,
    /// Currency used to format prices
    pub currency: CurrencyCode,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "production", "staging")
    pub sentry_environment: Option<String>,
}

/// Shop REST API configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL, always ending in a slash so relative joins keep the path
    pub base_url: Url,
    /// Per-request timeout
    pub timeout: Duration,
    /// TTL for cached catalog responses (`None` disables the cache)
    pub cache_ttl: Option<Duration>,
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api = ApiConfig::from_env()?;
        let data_dir = get_optional_env("LOOPSTORE_DATA_DIR")
            .map_or_else(default_data_dir, PathBuf::from);
        let currency = get_env_or_default("LOOPSTORE_CURRENCY", "USD")
            .parse::<CurrencyCode>()
            .map_err(|e| ConfigError::InvalidEnvVar("LOOPSTORE_CURRENCY".to_string(), e))?;

        Ok(Self {
            api,
            data_dir,
            currency,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Build a configuration for an explicit API URL and data directory.
    ///
    /// Uses the default timeout and cache TTL. Intended for embedding and tests.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if `api_url` is not a valid URL.
    pub fn new(api_url: &str, data_dir: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        Ok(Self {
            api: ApiConfig {
                base_url: parse_base_url("LOOPSTORE_API_URL", api_url)?,
                timeout: Duration::from_secs(10),
                cache_ttl: Some(Duration::from_secs(300)),
            },
            data_dir: data_dir.into(),
            currency: CurrencyCode::default(),
            sentry_dsn: None,
            sentry_environment: None,
        })
    }

    /// Point the client at another API base URL, keeping the other settings.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if `api_url` is not a valid URL.
    pub fn with_api_url(mut self, api_url: &str) -> Result<Self, ConfigError> {
        self.api.base_url = parse_base_url("LOOPSTORE_API_URL", api_url)?;
        Ok(self)
    }

    /// Disable the catalog cache.
    #[must_use]
    pub fn without_cache(mut self) -> Self {
        self.api.cache_ttl = None;
        self
    }
}

impl ApiConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let base_url = parse_base_url(
            "LOOPSTORE_API_URL",
            &get_env_or_default("LOOPSTORE_API_URL", DEFAULT_API_URL),
        )?;
        let timeout_secs = parse_secs(
            "LOOPSTORE_HTTP_TIMEOUT_SECS",
            &get_env_or_default("LOOPSTORE_HTTP_TIMEOUT_SECS", DEFAULT_HTTP_TIMEOUT_SECS),
        )?;
        let cache_ttl_secs = parse_secs(
            "LOOPSTORE_CACHE_TTL_SECS",
            &get_env_or_default("LOOPSTORE_CACHE_TTL_SECS", DEFAULT_CACHE_TTL_SECS),
        )?;

        Ok(Self {
            base_url,
            timeout: Duration::from_secs(timeout_secs),
            cache_ttl: (cache_ttl_secs > 0).then(|| Duration::from_secs(cache_ttl_secs)),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get an optional environment variable, treating blank values as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Platform data directory for the client-local store.
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir().map_or_else(|| PathBuf::from(".loopstore"), |d| d.join("loopstore"))
}

/// Parse a base URL and force a trailing slash.
///
/// `Url::join` drops the last path segment unless the base ends in `/`, so
/// `http://host/api` must become `http://host/api/` before joining `products/`.
fn parse_base_url(key: &str, value: &str) -> Result<Url, ConfigError> {
    let mut url = Url::parse(value.trim())
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;

    if url.cannot_be_a_base() {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must be an absolute http(s) URL".to_string(),
        ));
    }

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }

    Ok(url)
}

fn parse_secs(key: &str, value: &str) -> Result<u64, ConfigError> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

//! Application configuration management.
//!
//! Loads configuration from environment variables with sensible defaults.
//! The upstream location and the fetch policies are fixed constants carried
//! in [`Config`] so that every component receives them at construction.

use std::sync::OnceLock;
use std::time::Duration;

use crate::upstream::RetryPolicy;

/// Global configuration instance.
static CONFIG: OnceLock<Config> = OnceLock::new();

/// Base URL of the unofficial JioSaavn API.
pub const UPSTREAM_BASE_URL: &str = "https://jiosaavnapi-bok7.onrender.com";

/// Timeout for the playlist, album and lyrics routes.
pub const SINGLE_SHOT_TIMEOUT: Duration = Duration::from_secs(10);

/// How often the upstream is pinged to keep it awake.
pub const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// Requests each client IP may make per [`RATE_LIMIT_WINDOW`].
pub const RATE_LIMIT_MAX_REQUESTS: u32 = 100;

/// Window over which [`RATE_LIMIT_MAX_REQUESTS`] refills.
pub const RATE_LIMIT_WINDOW: Duration = Duration::from_secs(15 * 60);

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
    /// Log format (json or pretty).
    pub log_format: LogFormat,
    /// Allowed CORS origins (comma-separated, or * for all).
    pub cors_origins: Vec<String>,
    /// Upstream API base URL, without a trailing slash.
    pub upstream_base_url: String,
    /// Policy for the search and song routes.
    pub retry_policy: RetryPolicy,
    /// Timeout for the non-retrying routes.
    pub single_shot_timeout: Duration,
    /// Interval between keep-alive pings.
    pub keep_alive_interval: Duration,
    /// Per-IP request quota; zero disables rate limiting.
    pub rate_limit_max_requests: u32,
    /// Window over which the quota refills.
    pub rate_limit_window: Duration,
}

/// Log output format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable colored output.
    Pretty,
    /// JSON structured logging for production.
    Json,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    /// Returns an error if `PORT` is set but is not a valid port number.
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        let port_raw = std::env::var("PORT").unwrap_or_else(|_| "5000".to_string());
        let port = port_raw
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort(port_raw.clone()))?;

        let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let log_format = match std::env::var("LOG_FORMAT")
            .unwrap_or_else(|_| "pretty".to_string())
            .to_lowercase()
            .as_str()
        {
            "json" => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        let rate_limit_max_requests = match std::env::var("RATE_LIMIT_MAX") {
            Ok(raw) => raw
                .parse::<u32>()
                .map_err(|_| ConfigError::InvalidRateLimit(raw))?,
            Err(_) => RATE_LIMIT_MAX_REQUESTS,
        };

        let cors_origins = parse_origins(
            &std::env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string()),
        );

        Ok(Self {
            host,
            port,
            log_level,
            log_format,
            cors_origins,
            upstream_base_url: UPSTREAM_BASE_URL.to_string(),
            retry_policy: RetryPolicy::default(),
            single_shot_timeout: SINGLE_SHOT_TIMEOUT,
            keep_alive_interval: KEEP_ALIVE_INTERVAL,
            rate_limit_max_requests,
            rate_limit_window: RATE_LIMIT_WINDOW,
        })
    }

    /// Validate the configuration.
    ///
    /// # Errors
    /// Returns an error if validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::InvalidPort(self.port.to_string()));
        }

        let url = reqwest::Url::parse(&self.upstream_base_url).map_err(|e| {
            ConfigError::InvalidUpstreamUrl(self.upstream_base_url.clone(), e.to_string())
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidUpstreamUrl(
                self.upstream_base_url.clone(),
                format!("unsupported scheme '{}'", url.scheme()),
            ));
        }

        if self.keep_alive_interval.is_zero() {
            tracing::warn!("Keep-alive interval is zero, pings will run back to back");
        }

        Ok(())
    }

    /// Get the server bind address.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid port: {0}")]
    InvalidPort(String),

    #[error("Invalid upstream URL '{0}': {1}")]
    InvalidUpstreamUrl(String, String),

    #[error("Invalid RATE_LIMIT_MAX: {0}")]
    InvalidRateLimit(String),
}

/// Initialize the global configuration.
///
/// Should be called once at application startup. The returned reference is
/// handed to the components that need it.
///
/// # Errors
/// Returns an error if the environment holds an invalid value.
pub fn init() -> Result<&'static Config, ConfigError> {
    if let Some(config) = CONFIG.get() {
        return Ok(config);
    }

    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    Ok(CONFIG.get_or_init(|| config))
}

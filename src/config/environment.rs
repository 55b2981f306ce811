// ABOUTME: Environment configuration management for deployment-specific settings
// ABOUTME: Handles environment variables for the HTTP server, Redis store, remote API and run polling
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Environment-based configuration management

use crate::constants::{http, rate_limit, redis, remote_api, run_polling};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use tracing::{info, warn};

/// Environment type for logging and other deployment-dependent behavior
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Local development
    #[default]
    Development,
    /// Production deployment
    Production,
    /// Test runs
    Testing,
}

impl Environment {
    /// Parse from string with fallback
    #[must_use]
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "testing" | "test" => Self::Testing,
            _ => Self::Development,
        }
    }

    /// Check if this is a production environment
    #[must_use]
    pub const fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
            Self::Testing => write!(f, "testing"),
        }
    }
}

/// Which key/value store backend to use
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Redis server (production)
    #[default]
    Redis,
    /// Process-local map (development and tests)
    Memory,
}

impl StoreBackend {
    /// Parse from string with validation
    ///
    /// # Errors
    ///
    /// Returns an error for unknown backend names
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "redis" => Ok(Self::Redis),
            "memory" | "in-memory" | "inmemory" => Ok(Self::Memory),
            other => bail!("Invalid STORE_BACKEND value '{other}' (expected 'redis' or 'memory')"),
        }
    }
}

impl std::fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Redis => write!(f, "redis"),
            Self::Memory => write!(f, "memory"),
        }
    }
}

/// Redis connection and retry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConnectionConfig {
    /// Connection timeout in seconds
    pub connection_timeout_secs: u64,
    /// Response/command timeout in seconds
    pub response_timeout_secs: u64,
    /// Number of reconnection retries after connection drop
    pub reconnection_retries: usize,
    /// Exponential backoff base for retry delays
    pub retry_exponent_base: u64,
    /// Maximum retry delay in milliseconds
    pub max_retry_delay_ms: u64,
    /// Number of retries for initial connection at startup
    pub initial_connection_retries: u32,
    /// Initial retry delay in milliseconds (doubles with exponential backoff)
    pub initial_retry_delay_ms: u64,
}

impl Default for RedisConnectionConfig {
    fn default() -> Self {
        Self {
            connection_timeout_secs: redis::CONNECTION_TIMEOUT_SECS,
            response_timeout_secs: redis::RESPONSE_TIMEOUT_SECS,
            reconnection_retries: redis::RECONNECTION_RETRIES,
            retry_exponent_base: redis::RETRY_EXPONENT_BASE,
            max_retry_delay_ms: redis::MAX_RETRY_DELAY_MS,
            initial_connection_retries: redis::INITIAL_CONNECTION_RETRIES,
            initial_retry_delay_ms: redis::INITIAL_RETRY_DELAY_MS,
        }
    }
}

impl RedisConnectionConfig {
    /// Load Redis connection configuration from environment
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set but not a valid number
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            connection_timeout_secs: parse_env_or(
                "REDIS_CONNECTION_TIMEOUT_SECS",
                redis::CONNECTION_TIMEOUT_SECS,
            )?,
            response_timeout_secs: parse_env_or(
                "REDIS_RESPONSE_TIMEOUT_SECS",
                redis::RESPONSE_TIMEOUT_SECS,
            )?,
            reconnection_retries: parse_env_or(
                "REDIS_RECONNECTION_RETRIES",
                redis::RECONNECTION_RETRIES,
            )?,
            retry_exponent_base: parse_env_or(
                "REDIS_RETRY_EXPONENT_BASE",
                redis::RETRY_EXPONENT_BASE,
            )?,
            max_retry_delay_ms: parse_env_or("REDIS_MAX_RETRY_DELAY_MS", redis::MAX_RETRY_DELAY_MS)?,
            initial_connection_retries: parse_env_or(
                "REDIS_INITIAL_CONNECTION_RETRIES",
                redis::INITIAL_CONNECTION_RETRIES,
            )?,
            initial_retry_delay_ms: parse_env_or(
                "REDIS_INITIAL_RETRY_DELAY_MS",
                redis::INITIAL_RETRY_DELAY_MS,
            )?,
        })
    }
}

/// Key/value store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Selected backend
    pub backend: StoreBackend,
    /// Full Redis URL; takes precedence over host/port/password
    pub redis_url: Option<String>,
    /// Redis host
    pub redis_host: String,
    /// Redis port
    pub redis_port: u16,
    /// Redis password (`None` when empty)
    #[serde(skip_serializing)]
    pub redis_password: Option<String>,
    /// Connection and retry settings
    pub connection: RedisConnectionConfig,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            redis_url: None,
            redis_host: redis::DEFAULT_HOST.to_owned(),
            redis_port: redis::DEFAULT_PORT,
            redis_password: None,
            connection: RedisConnectionConfig::default(),
        }
    }
}

impl StoreConfig {
    /// In-memory store configuration, used by tests and local runs
    #[must_use]
    pub fn memory() -> Self {
        Self {
            backend: StoreBackend::Memory,
            ..Self::default()
        }
    }

    /// Human-readable target, never includes the password
    #[must_use]
    pub fn describe_target(&self) -> String {
        match (self.backend, &self.redis_url) {
            (StoreBackend::Memory, _) => "in-memory".to_owned(),
            (StoreBackend::Redis, Some(_)) => "redis (REDIS_URL)".to_owned(),
            (StoreBackend::Redis, None) => {
                format!("redis://{}:{}", self.redis_host, self.redis_port)
            }
        }
    }
}

/// Remote assistants API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteApiConfig {
    /// API key; an empty key is allowed and rejected by the remote side
    #[serde(skip_serializing)]
    pub api_key: String,
    /// Base URL, e.g. `https://api.openai.com/v1`
    pub base_url: String,
    /// Optional organization header
    pub organization: Option<String>,
    /// Legacy pre-provisioned assistant key; recorded but unused by the core
    #[serde(skip_serializing)]
    pub assistant_key: Option<String>,
    /// Connection timeout in seconds
    pub connect_timeout_secs: u64,
    /// Request timeout in seconds
    pub request_timeout_secs: u64,
}

impl Default for RemoteApiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: remote_api::DEFAULT_BASE_URL.to_owned(),
            organization: None,
            assistant_key: None,
            connect_timeout_secs: remote_api::CONNECT_TIMEOUT_SECS,
            request_timeout_secs: remote_api::REQUEST_TIMEOUT_SECS,
        }
    }
}

/// Run polling configuration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunPollConfig {
    /// Delay before each status poll, in milliseconds
    pub interval_ms: u64,
    /// Maximum number of polls
    pub max_attempts: u32,
}

impl Default for RunPollConfig {
    fn default() -> Self {
        Self {
            interval_ms: run_polling::POLL_INTERVAL_MS,
            max_attempts: run_polling::MAX_ATTEMPTS,
        }
    }
}

impl RunPollConfig {
    /// Delay before each status poll
    #[must_use]
    pub const fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Listen address
    pub host: String,
    /// Listen port
    pub port: u16,
    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
    /// Maximum request body size in bytes
    pub max_body_bytes: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: http::DEFAULT_HOST.to_owned(),
            port: http::DEFAULT_PORT,
            request_timeout_secs: http::DEFAULT_REQUEST_TIMEOUT_SECS,
            max_body_bytes: http::DEFAULT_MAX_BODY_BYTES,
        }
    }
}

/// Per-IP request rate limiting
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Enable rate limiting
    pub enabled: bool,
    /// Requests allowed per window and IP
    pub max_requests: u32,
    /// Window duration in seconds
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_requests: rate_limit::DEFAULT_MAX_REQUESTS,
            window_secs: rate_limit::DEFAULT_WINDOW_SECS,
        }
    }
}

impl RateLimitConfig {
    /// Window duration
    #[must_use]
    pub const fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    fn from_env() -> Result<Self> {
        Ok(Self {
            enabled: parse_env_or("RATE_LIMIT_ENABLED", true)?,
            max_requests: parse_env_or("RATE_LIMIT_MAX_REQUESTS", rate_limit::DEFAULT_MAX_REQUESTS)?,
            window_secs: parse_env_or("RATE_LIMIT_WINDOW_SECS", rate_limit::DEFAULT_WINDOW_SECS)?,
        })
    }
}

/// Top-level server configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Deployment environment
    pub environment: Environment,
    /// HTTP listener settings
    pub http: HttpConfig,
    /// Key/value store settings
    pub store: StoreConfig,
    /// Remote assistants API settings
    pub remote_api: RemoteApiConfig,
    /// Run polling settings
    pub run_poll: RunPollConfig,
    /// Per-IP rate limiting
    pub rate_limit: RateLimitConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if a variable holds an unparsable or invalid value
    pub fn from_env() -> Result<Self> {
        info!("Loading configuration from environment variables");

        // Load .env file if it exists
        if let Err(e) = dotenvy::dotenv() {
            warn!("No .env file found or failed to load: {}", e);
        }

        let config = Self {
            environment: Environment::from_str_or_default(&env_var_or(
                "ENVIRONMENT",
                "development",
            )),
            http: HttpConfig {
                host: env_var_or("HTTP_HOST", http::DEFAULT_HOST),
                port: parse_env_or("HTTP_PORT", http::DEFAULT_PORT)?,
                request_timeout_secs: parse_env_or(
                    "REQUEST_TIMEOUT_SECS",
                    http::DEFAULT_REQUEST_TIMEOUT_SECS,
                )?,
                max_body_bytes: parse_env_or("MAX_BODY_BYTES", http::DEFAULT_MAX_BODY_BYTES)?,
            },
            store: StoreConfig {
                backend: StoreBackend::parse(&env_var_or("STORE_BACKEND", "redis"))?,
                redis_url: non_empty_env("REDIS_URL"),
                redis_host: env_var_or("REDIS_HOST", redis::DEFAULT_HOST),
                redis_port: parse_env_or("REDIS_PORT", redis::DEFAULT_PORT)?,
                redis_password: non_empty_env("REDIS_PASSWORD"),
                connection: RedisConnectionConfig::from_env()?,
            },
            remote_api: RemoteApiConfig {
                api_key: env_var_or("OPENAI_API_KEY", ""),
                base_url: env_var_or("OPENAI_BASE_URL", remote_api::DEFAULT_BASE_URL),
                organization: non_empty_env("OPENAI_ORGANIZATION"),
                assistant_key: non_empty_env("OPENAI_ASSISTANT_KEY"),
                connect_timeout_secs: parse_env_or(
                    "OPENAI_CONNECT_TIMEOUT_SECS",
                    remote_api::CONNECT_TIMEOUT_SECS,
                )?,
                request_timeout_secs: parse_env_or(
                    "OPENAI_REQUEST_TIMEOUT_SECS",
                    remote_api::REQUEST_TIMEOUT_SECS,
                )?,
            },
            run_poll: RunPollConfig {
                interval_ms: parse_env_or("RUN_POLL_INTERVAL_MS", run_polling::POLL_INTERVAL_MS)?,
                max_attempts: parse_env_or("RUN_MAX_ATTEMPTS", run_polling::MAX_ATTEMPTS)?,
            },
            rate_limit: RateLimitConfig::from_env()?,
        };

        config.validate()?;

        if config.remote_api.api_key.is_empty() {
            warn!("OPENAI_API_KEY is not set; remote assistant calls will be rejected");
        }

        Ok(config)
    }

    /// Validate cross-field constraints
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot work
    pub fn validate(&self) -> Result<()> {
        if self.run_poll.max_attempts == 0 {
            bail!("RUN_MAX_ATTEMPTS must be at least 1");
        }
        if self.rate_limit.enabled
            && (self.rate_limit.max_requests == 0 || self.rate_limit.window_secs == 0)
        {
            bail!("RATE_LIMIT_MAX_REQUESTS and RATE_LIMIT_WINDOW_SECS must be at least 1");
        }
        if self.http.max_body_bytes == 0 {
            bail!("MAX_BODY_BYTES must be greater than 0");
        }
        if !self.remote_api.base_url.starts_with("http://")
            && !self.remote_api.base_url.starts_with("https://")
        {
            bail!(
                "OPENAI_BASE_URL must be an http(s) URL, got '{}'",
                self.remote_api.base_url
            );
        }
        Ok(())
    }

    /// Get a summary of the configuration for logging (without secrets)
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "Assistant Hub Configuration:\n\
             - Environment: {}\n\
             - HTTP: {}:{}\n\
             - Store: {}\n\
             - Remote API: {} (key {})\n\
             - Run polling: {}ms x {}\n\
             - Rate limit: {}",
            self.environment,
            self.http.host,
            self.http.port,
            self.store.describe_target(),
            self.remote_api.base_url,
            if self.remote_api.api_key.is_empty() {
                "missing"
            } else {
                "set"
            },
            self.run_poll.interval_ms,
            self.run_poll.max_attempts,
            if self.rate_limit.enabled {
                format!(
                    "{} requests per {}s per IP",
                    self.rate_limit.max_requests, self.rate_limit.window_secs
                )
            } else {
                "disabled".to_owned()
            },
        )
    }
}

/// Get environment variable or default value
fn env_var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_owned())
}

/// Get environment variable, treating empty values as unset
fn non_empty_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Parse environment variable, falling back to `default` when unset
fn parse_env_or<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid {key} value '{raw}'")),
        _ => Ok(default),
    }
}

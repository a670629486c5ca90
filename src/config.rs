//! # Service Configuration
//!
//! All settings live in one TOML file. Every field has a default, so an
//! empty file (or no file at all at the default path) is a valid config.
//!
//! ```toml
//! [server]
//! bind = "127.0.0.1:5000"
//!
//! [storage]
//! users_path = "users.json"
//! tokens_path = "tokens.json"
//! autosave_secs = 300
//!
//! [token]
//! ttl_secs = 604800
//! secret_length = 64
//!
//! [rate_limit]
//! enabled = true
//! max_requests = 120
//! window_secs = 60
//!
//! [protected]
//! delay_ms = 2000
//! cache_ttl_secs = 10
//! ```
//!
//! `TOKENGATE_BIND` and `TOKENGATE_TOKEN_TTL` override the file values.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_CONFIG_PATH: &str = "tokengate.toml";

/// Longest accepted token lifetime (100 years).
pub const MAX_TOKEN_TTL_SECS: i64 = 100 * 365 * 24 * 60 * 60;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub token: TokenConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub protected: ProtectedConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind: default_bind() }
    }
}

/// Where the two store snapshots live and how often they are written.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default = "default_users_path")]
    pub users_path: PathBuf,
    #[serde(default = "default_tokens_path")]
    pub tokens_path: PathBuf,
    /// Periodic snapshot interval; 0 saves only at shutdown.
    #[serde(default)]
    pub autosave_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            users_path: default_users_path(),
            tokens_path: default_tokens_path(),
            autosave_secs: 0,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TokenConfig {
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: i64,
    #[serde(default = "default_secret_length")]
    pub secret_length: usize,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
            secret_length: default_secret_length(),
        }
    }
}

impl TokenConfig {
    /// Saturates at `TimeDelta::MAX` for values outside chrono's range.
    pub fn ttl(&self) -> chrono::TimeDelta {
        chrono::TimeDelta::try_seconds(self.ttl_secs).unwrap_or(chrono::TimeDelta::MAX)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_requests: default_max_requests(),
            window_secs: default_window_secs(),
        }
    }
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

/// Settings for the slow protected resource.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProtectedConfig {
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
    /// Response cache TTL; 0 disables caching.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
}

impl Default for ProtectedConfig {
    fn default() -> Self {
        Self {
            delay_ms: default_delay_ms(),
            cache_ttl_secs: default_cache_ttl_secs(),
        }
    }
}

impl ProtectedConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    pub fn cache_ttl(&self) -> Option<Duration> {
        (self.cache_ttl_secs > 0).then(|| Duration::from_secs(self.cache_ttl_secs))
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.token.ttl_secs <= 0 || self.token.ttl_secs > MAX_TOKEN_TTL_SECS {
            return Err(ConfigError::Invalid(format!(
                "token.ttl_secs must be between 1 and {}",
                MAX_TOKEN_TTL_SECS
            )));
        }
        if self.token.secret_length < 16 {
            return Err(ConfigError::Invalid(
                "token.secret_length must be at least 16".to_string(),
            ));
        }
        if self.rate_limit.enabled
            && (self.rate_limit.max_requests == 0 || self.rate_limit.window_secs == 0)
        {
            return Err(ConfigError::Invalid(
                "rate_limit.max_requests and rate_limit.window_secs must be > 0".to_string(),
            ));
        }
        if self.server.bind.trim().is_empty() {
            return Err(ConfigError::Invalid("server.bind must not be empty".to_string()));
        }
        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(bind) = lookup("TOKENGATE_BIND") {
            self.server.bind = bind;
        }
        if let Some(raw) = lookup("TOKENGATE_TOKEN_TTL") {
            match raw.trim().parse() {
                Ok(ttl) => self.token.ttl_secs = ttl,
                Err(e) => tracing::warn!(
                    "Ignoring TOKENGATE_TOKEN_TTL={:?}: {}; keeping {}s",
                    raw,
                    e,
                    self.token.ttl_secs
                ),
            }
        }
    }
}

// Default value functions
fn default_bind() -> String { "127.0.0.1:5000".to_string() }
fn default_users_path() -> PathBuf { PathBuf::from("users.json") }
fn default_tokens_path() -> PathBuf { PathBuf::from("tokens.json") }
fn default_ttl_secs() -> i64 { 7 * 24 * 60 * 60 }
fn default_secret_length() -> usize { 64 }
fn default_true() -> bool { true }
fn default_max_requests() -> u32 { 120 }
fn default_window_secs() -> u64 { 60 }
fn default_delay_ms() -> u64 { 2000 }
fn default_cache_ttl_secs() -> u64 { 10 }

/// Parse a TOML config file at the given path.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(contents) => match toml::from_str(&contents) {
            Ok(config) => Ok(config),
            Err(e) => {
                tracing::error!("Failed to parse config TOML: {}", e);
                Err(ConfigError::Toml(e))
            }
        },
        Err(e) => {
            tracing::error!("Failed to read config file '{}': {}", path.display(), e);
            Err(ConfigError::Io(e))
        }
    }
}

/// Resolve the effective configuration.
///
/// An explicitly supplied path must exist. Without one, the default path is
/// tried and defaults are used if it is absent.
pub fn resolve_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(path) => load_config(path)?,
        None => {
            let default = Path::new(DEFAULT_CONFIG_PATH);
            if default.exists() {
                load_config(default)?
            } else {
                tracing::info!("No {} found, using defaults", DEFAULT_CONFIG_PATH);
                Config::default()
            }
        }
    };
    config.apply_env_overrides();
    config.validate()?;
    Ok(config)
}

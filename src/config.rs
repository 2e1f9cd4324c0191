//! Configuration module for gator.
//!
//! Application settings live in an optional TOML file. The per-user session
//! (store address and current user) is kept separately, see [`crate::session`].

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::{GatorError, Result};

/// Environment variable naming the config file.
pub const CONFIG_PATH_ENV: &str = "GATOR_CONFIG";

/// Environment variable overriding the session's database URL.
pub const DB_URL_ENV: &str = "GATOR_DB_URL";

/// Default config file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "gator.toml";

/// Session file configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Path to the JSON session file. A leading `~/` expands to the home directory.
    #[serde(default = "default_session_path")]
    pub path: String,
}

fn default_session_path() -> String {
    "~/.gatorconfig.json".to_string()
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            path: default_session_path(),
        }
    }
}

impl SessionConfig {
    /// Resolve the session path, expanding `~/`.
    pub fn resolved_path(&self) -> PathBuf {
        expand_home(&self.path)
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Optional log file. Empty means stderr only.
    #[serde(default)]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: String::new(),
        }
    }
}

/// HTTP fetcher configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct FetcherConfig {
    /// Connection timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Total request timeout in seconds.
    #[serde(default = "default_total_timeout")]
    pub total_timeout_secs: u64,
    /// Maximum number of redirects.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
    /// Maximum feed size in bytes.
    #[serde(default = "default_max_feed_size")]
    pub max_feed_size_bytes: u64,
    /// User agent sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_total_timeout() -> u64 {
    30
}

fn default_max_redirects() -> usize {
    5
}

fn default_max_feed_size() -> u64 {
    5 * 1024 * 1024 // 5MB
}

fn default_user_agent() -> String {
    concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string()
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout(),
            total_timeout_secs: default_total_timeout(),
            max_redirects: default_max_redirects(),
            max_feed_size_bytes: default_max_feed_size(),
            user_agent: default_user_agent(),
        }
    }
}

/// Aggregator loop configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AggregatorConfig {
    /// Maximum items ingested per fetch. 0 means unlimited.
    #[serde(default)]
    pub max_items_per_fetch: usize,
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Session file configuration.
    #[serde(default)]
    pub session: SessionConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// HTTP fetcher configuration.
    #[serde(default)]
    pub fetcher: FetcherConfig,
    /// Aggregator configuration.
    #[serde(default)]
    pub aggregator: AggregatorConfig,
    /// Database URL override, taken from the environment.
    #[serde(skip)]
    pub db_url_override: Option<String>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(GatorError::Io)?;
        Self::parse(&content)
    }

    /// Load the configuration file named by `GATOR_CONFIG` (or `gator.toml`)
    /// and apply environment overrides. A missing file yields the defaults.
    pub fn load_from_env() -> Result<Self> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.into());
        let mut config = if Path::new(&path).exists() {
            Self::load(&path)?
        } else {
            Self::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| GatorError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `GATOR_DB_URL`: Override the database URL stored in the session
    pub fn apply_env_overrides(&mut self) {
        if let Ok(db_url) = std::env::var(DB_URL_ENV) {
            if !db_url.is_empty() {
                self.db_url_override = Some(db_url);
            }
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.fetcher.total_timeout_secs == 0 {
            return Err(GatorError::Config(
                "fetcher.total_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.fetcher.max_feed_size_bytes == 0 {
            return Err(GatorError::Config(
                "fetcher.max_feed_size_bytes must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Expand a leading `~/` to the user's home directory.
fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(rest),
        None => PathBuf::from(path),
    }
}

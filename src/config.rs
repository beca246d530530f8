//! Configuration management for Nozomi Fetcher
//!
//! Settings come from built-in defaults, an optional TOML file and finally
//! command-line overrides, in that order of precedence.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::app::{ClientConfig, DatasetLayout};
use crate::constants::{config as paths, http, limits};
use crate::errors::{AppError, ConfigError, Result};

/// Unified application configuration for TOML serialization
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP client settings
    pub client: ClientConfigToml,
    /// Fetch and download settings
    pub fetch: FetchConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// TOML-friendly client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfigToml {
    /// Proxy URL applied to every request
    pub proxy: Option<String>,
    /// Request timeout in seconds
    pub request_timeout_secs: u64,
    /// Connect timeout in seconds
    pub connect_timeout_secs: u64,
    /// Maximum idle connections per host
    pub pool_max_per_host: usize,
    /// TCP nodelay setting
    pub tcp_nodelay: bool,
    /// User agent for index and metadata requests
    pub user_agent: String,
}

impl Default for ClientConfigToml {
    fn default() -> Self {
        Self {
            proxy: None,
            request_timeout_secs: http::DEFAULT_TIMEOUT.as_secs(),
            connect_timeout_secs: http::CONNECT_TIMEOUT.as_secs(),
            pool_max_per_host: http::POOL_MAX_PER_HOST,
            tcp_nodelay: true,
            user_agent: http::USER_AGENT.to_string(),
        }
    }
}

/// Pipeline settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Maximum number of requests in flight
    pub concurrency: usize,
    /// Slice size used when writing media bodies
    pub chunk_size: usize,
    /// Placement of downloaded files
    pub layout: DatasetLayout,
    /// Show progress bars
    pub progress: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            concurrency: limits::DEFAULT_CONCURRENCY,
            chunk_size: limits::MEDIA_CHUNK_SIZE,
            layout: DatasetLayout::default(),
            progress: true,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default log level for the application
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Command-line values that take precedence over the file
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub concurrency: Option<usize>,
    pub proxy: Option<String>,
    pub layout: Option<DatasetLayout>,
}

const LOG_LEVELS: &[&str] = &["error", "warn", "info", "debug", "trace"];

impl AppConfig {
    /// Load configuration from an explicit file or the standard locations
    ///
    /// With no file anywhere the defaults are returned.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NotFound` if `config_file_override` does not
    /// exist, `InvalidFormat` for unparsable TOML and `InvalidValue` if the
    /// loaded values fail validation.
    pub async fn load(config_file_override: Option<PathBuf>) -> Result<Self> {
        let config_path = match config_file_override {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::NotFound { path }.into());
                }
                Some(path)
            }
            None => Self::find_config_file(),
        };

        let config = match config_path {
            Some(path) => Self::load_from_file(&path).await?,
            None => {
                debug!("No config file found, using defaults");
                Self::default()
            }
        };

        config.validate()?;
        Ok(config)
    }

    /// Apply command-line overrides, then validate again
    pub fn apply_overrides(mut self, overrides: ConfigOverrides) -> Result<Self> {
        if let Some(concurrency) = overrides.concurrency {
            self.fetch.concurrency = concurrency;
        }
        if let Some(proxy) = overrides.proxy {
            self.client.proxy = Some(proxy);
        }
        if let Some(layout) = overrides.layout {
            self.fetch.layout = layout;
        }
        self.validate()?;
        Ok(self)
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if self.fetch.concurrency == 0 {
            return Err(invalid_value(
                "fetch.concurrency",
                self.fetch.concurrency,
                "At least one concurrent request is required",
            ));
        }
        if self.fetch.chunk_size == 0 {
            return Err(invalid_value(
                "fetch.chunk_size",
                self.fetch.chunk_size,
                "Chunk size must be at least one byte",
            ));
        }
        if self.client.request_timeout_secs == 0 {
            return Err(invalid_value(
                "client.request_timeout_secs",
                self.client.request_timeout_secs,
                "Timeout must be positive",
            ));
        }
        if !LOG_LEVELS.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(invalid_value(
                "logging.level",
                &self.logging.level,
                "Expected one of error, warn, info, debug, trace",
            ));
        }
        Ok(())
    }

    /// Runtime HTTP client settings
    pub fn to_client_config(&self) -> ClientConfig {
        ClientConfig {
            proxy: self.client.proxy.clone().filter(|p| !p.is_empty()),
            tcp_nodelay: self.client.tcp_nodelay,
            pool_max_per_host: self.client.pool_max_per_host,
            request_timeout: Duration::from_secs(self.client.request_timeout_secs),
            connect_timeout: Duration::from_secs(self.client.connect_timeout_secs),
            user_agent: self.client.user_agent.clone(),
            ..ClientConfig::default()
        }
    }

    /// Find configuration file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        let mut search_paths = vec![PathBuf::from(".").join(paths::LOCAL_FILE)];
        if let Some(user) = Self::default_config_path() {
            search_paths.push(user);
        }

        let found = search_paths.into_iter().find(|path| path.exists());
        if let Some(path) = &found {
            debug!("Found config file: {}", path.display());
        }
        found
    }

    /// The per-user config file path, if a config dir exists
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(paths::APP_DIR).join(paths::USER_FILE))
    }

    async fn load_from_file(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(ConfigError::Io)?;
        let config: AppConfig = toml::from_str(&content).map_err(|e| {
            tracing::error!("Failed to parse config file {}: {}", path.display(), e);
            ConfigError::InvalidFormat(e)
        })?;

        debug!("Loaded configuration from: {}", path.display());
        Ok(config)
    }
}

fn invalid_value(field: &str, value: impl ToString, reason: &str) -> AppError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
    .into()
}

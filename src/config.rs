//! Configuration module for tempshare.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::{Result, ShareError};

/// Smallest chunk used when streaming file bodies.
pub const MIN_STREAM_CHUNK: usize = 8 * 1024;

/// Largest chunk used when streaming file bodies.
pub const MAX_STREAM_CHUNK: usize = 16 * 1024;

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port number to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Allowed CORS origins (empty allows any origin).
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: Vec::new(),
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String {
    "data/tempshare.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Content store configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Root directory for uploaded content.
    #[serde(default = "default_content_root")]
    pub content_root: String,
    /// Chunk size in bytes for streaming reads.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Maximum request body size for uploads, in megabytes.
    #[serde(default = "default_max_upload_size")]
    pub max_upload_size_mb: u64,
}

fn default_content_root() -> String {
    "uploads".to_string()
}

fn default_chunk_size() -> usize {
    MAX_STREAM_CHUNK
}

fn default_max_upload_size() -> u64 {
    2000
}

impl StorageConfig {
    /// Chunk size clamped to the supported streaming window.
    pub fn stream_chunk_size(&self) -> usize {
        self.chunk_size.clamp(MIN_STREAM_CHUNK, MAX_STREAM_CHUNK)
    }

    /// Maximum upload size in bytes.
    pub fn max_upload_bytes(&self) -> usize {
        let bytes = self.max_upload_size_mb.saturating_mul(1024 * 1024);
        usize::try_from(bytes).unwrap_or(usize::MAX)
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            content_root: default_content_root(),
            chunk_size: default_chunk_size(),
            max_upload_size_mb: default_max_upload_size(),
        }
    }
}

/// Retention configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RetentionConfig {
    /// Age in hours after which files and chat messages expire.
    #[serde(default = "default_max_age_hours")]
    pub max_age_hours: u64,
    /// Interval between retention sweeps, in seconds.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

fn default_max_age_hours() -> u64 {
    24
}

fn default_sweep_interval() -> u64 {
    3600
}

impl RetentionConfig {
    /// Retention window as a duration.
    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_hours.saturating_mul(3600))
    }

    /// Sweep interval as a duration.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            max_age_hours: default_max_age_hours(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

/// Chat configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatConfig {
    /// Maximum message length in characters.
    #[serde(default = "default_max_message_length")]
    pub max_message_length: usize,
    /// Maximum sender label length in characters.
    #[serde(default = "default_max_sender_length")]
    pub max_sender_length: usize,
}

fn default_max_message_length() -> usize {
    1000
}

fn default_max_sender_length() -> usize {
    64
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            max_message_length: default_max_message_length(),
            max_sender_length: default_max_sender_length(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/tempshare.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Content store configuration.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Retention configuration.
    #[serde(default)]
    pub retention: RetentionConfig,
    /// Chat configuration.
    #[serde(default)]
    pub chat: ChatConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ShareError::Io)?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| ShareError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `TEMPSHARE_CONTENT_ROOT`: content store root directory
    /// - `TEMPSHARE_DATABASE_PATH`: SQLite database path
    /// - `TEMPSHARE_PORT`: listen port
    pub fn apply_env_overrides(&mut self) {
        if let Ok(root) = std::env::var("TEMPSHARE_CONTENT_ROOT") {
            if !root.is_empty() {
                self.storage.content_root = root;
            }
        }
        if let Ok(path) = std::env::var("TEMPSHARE_DATABASE_PATH") {
            if !path.is_empty() {
                self.database.path = path;
            }
        }
        if let Ok(port) = std::env::var("TEMPSHARE_PORT") {
            match port.parse() {
                Ok(port) => self.server.port = port,
                Err(_) => tracing::warn!(value = %port, "Ignoring invalid TEMPSHARE_PORT"),
            }
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.storage.content_root.trim().is_empty() {
            return Err(ShareError::Config("storage.content_root must not be empty".into()));
        }
        if self.storage.chunk_size == 0 {
            return Err(ShareError::Config("storage.chunk_size must be positive".into()));
        }
        if self.retention.max_age_hours == 0 {
            return Err(ShareError::Config("retention.max_age_hours must be positive".into()));
        }
        if self.retention.sweep_interval_secs == 0 {
            return Err(ShareError::Config(
                "retention.sweep_interval_secs must be positive".into(),
            ));
        }
        Ok(())
    }
}

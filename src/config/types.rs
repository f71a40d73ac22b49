//! Core configuration types and loading.

use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;
use thiserror::Error;

use super::defaults::*;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Service configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// HTTP listener and node identity.
    pub server: ServerConfig,
    /// Relational storage.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Second-level cache. When absent, an in-process backend is used.
    pub redis: Option<RedisConfig>,
    /// Multi-level cache tuning.
    #[serde(default)]
    pub cache: CacheConfig,
    /// Redirect cache warm-up.
    #[serde(default)]
    pub initializer: InitializerConfig,
    /// Batched click and geo reporting.
    #[serde(default)]
    pub report: ReportSettings,
    /// Prometheus exporter.
    #[serde(default)]
    pub metrics: MetricsConfig,
    /// Logging output.
    #[serde(default)]
    pub log: LogConfig,
    /// Link defaults.
    #[serde(default)]
    pub links: LinksConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML text.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address to bind to (e.g., "0.0.0.0:8029").
    pub address: SocketAddr,
    /// Identity published as the source of cache messages ("host:port").
    /// Discovered from the local interfaces when not set.
    pub advertise: Option<String>,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to SQLite database file, or ":memory:".
    #[serde(default = "default_database_path")]
    pub path: String,
    /// Pool size for file-backed databases.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            max_connections: default_max_connections(),
        }
    }
}

/// Redis connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    /// Connection URL (e.g., "redis://127.0.0.1:6379/0").
    pub url: String,
}

/// Multi-level cache configuration.
///
/// Durations are in milliseconds; zero disables the corresponding expiry.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Cache "not found" results as null entries.
    #[serde(default = "default_true")]
    pub allow_null: bool,
    /// Initial capacity of the in-process cache.
    #[serde(default = "default_init_capacity")]
    pub init_capacity: usize,
    /// Maximum number of in-process entries.
    #[serde(default = "default_max_capacity")]
    pub max_capacity: u64,
    /// In-process time-to-live.
    #[serde(default)]
    pub expire_after_write_ms: u64,
    /// In-process time-to-idle.
    #[serde(default)]
    pub expire_after_access_ms: u64,
    /// TTL applied to second-level entries.
    #[serde(default)]
    pub redis_expires_ms: u64,
    /// Batch hint for SCAN during `clear`.
    #[serde(default = "default_redis_scan_count")]
    pub redis_scan_count: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            allow_null: true,
            init_capacity: default_init_capacity(),
            max_capacity: default_max_capacity(),
            expire_after_write_ms: 0,
            expire_after_access_ms: 0,
            redis_expires_ms: 0,
            redis_scan_count: default_redis_scan_count(),
        }
    }
}

/// Redirect cache warm-up configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InitializerConfig {
    /// Load every link into the redirect cache at startup (once per cluster).
    #[serde(default)]
    pub enabled: bool,
}

/// Reporting configuration for both report streams.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportSettings {
    #[serde(default)]
    pub statistics: ReportConfig,
    #[serde(default)]
    pub geo: ReportConfig,
}

/// Flush policy of a batch reporter.
#[derive(Debug, Clone, Deserialize)]
pub struct ReportConfig {
    /// Delay before the first flush check.
    #[serde(default = "default_scheduled_delay")]
    pub scheduled_delay_ms: u64,
    /// Flush when this long has passed since the last flush.
    #[serde(default = "default_report_timeout")]
    pub report_timeout_ms: u64,
    /// Sleep between flush checks.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    /// Flush when more than this many records are buffered.
    #[serde(default = "default_report_size")]
    pub report_size: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            scheduled_delay_ms: default_scheduled_delay(),
            report_timeout_ms: default_report_timeout(),
            poll_interval_ms: default_poll_interval(),
            report_size: default_report_size(),
        }
    }
}

/// Prometheus exporter configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    /// Register and record metrics.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Scrape listener port; 0 disables the listener.
    #[serde(default = "default_metrics_port")]
    pub port: u16,
    /// Scrape path.
    #[serde(default = "default_scrape_path")]
    pub scrape_path: String,
    /// Publish per-cache entry counts periodically.
    #[serde(default = "default_true")]
    pub cache_metrics_enabled: bool,
    /// Period of the cache metrics task.
    #[serde(default = "default_cache_metrics_period")]
    pub cache_metrics_period_secs: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: default_metrics_port(),
            scrape_path: default_scrape_path(),
            cache_metrics_enabled: true,
            cache_metrics_period_secs: default_cache_metrics_period(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// Default filter directive, overridden by `RUST_LOG`.
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::Text,
        }
    }
}

/// Short code encoder selection.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EncoderKind {
    #[default]
    Base62,
    Base64,
}

/// Link defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct LinksConfig {
    /// Expiry applied when a request omits `expiresAt`.
    #[serde(default = "default_expires_days")]
    pub default_expires_days: u32,
    /// Encoder used to derive a code from the link id.
    #[serde(default)]
    pub encoder: EncoderKind,
}

impl Default for LinksConfig {
    fn default() -> Self {
        Self {
            default_expires_days: default_expires_days(),
            encoder: EncoderKind::Base62,
        }
    }
}

//! Configuration loading and management.
//!
//! This module is split into logical submodules:
//! - [`types`]: Config struct definitions and TOML loading
//! - [`defaults`]: serde default value functions
//! - [`validation`]: startup checks that collect every problem at once

mod defaults;
mod types;
pub mod validation;

pub use types::{
    CacheConfig, Config, ConfigError, DatabaseConfig, EncoderKind, InitializerConfig, LinksConfig,
    LogConfig, LogFormat, MetricsConfig, RedisConfig, ReportConfig, ReportSettings, ServerConfig,
};
pub use validation::{ValidationError, validate};

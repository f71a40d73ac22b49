//! Configuration validation.
//!
//! Validates configuration at startup to catch common errors early.

use super::Config;
use std::path::Path;
use thiserror::Error;

/// Validation errors for configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("database.path is required")]
    MissingDatabasePath,
    #[error("database.path parent directory does not exist: {0}")]
    DatabasePathInvalid(String),
    #[error("database.max_connections must be at least 1")]
    ZeroConnections,
    #[error("cache.max_capacity ({max}) is smaller than cache.init_capacity ({init})")]
    CapacityInverted { init: usize, max: u64 },
    #[error("cache.redis_scan_count must be at least 1")]
    ZeroScanCount,
    #[error("report.{0}.report_size must be at least 1")]
    ZeroReportSize(&'static str),
    #[error("report.{0}.poll_interval_ms must be at least 1")]
    ZeroPollInterval(&'static str),
    #[error("metrics.scrape_path must start with '/', got '{0}'")]
    InvalidScrapePath(String),
    #[error("server.advertise must look like host:port, got '{0}'")]
    InvalidAdvertise(String),
    #[error("redis.url must use the redis:// or rediss:// scheme, got '{0}'")]
    InvalidRedisUrl(String),
}

/// Validate a configuration, returning all errors found.
pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    // Database
    let db = &config.database;
    if db.path.is_empty() {
        errors.push(ValidationError::MissingDatabasePath);
    } else if db.path != ":memory:" {
        let db_path = Path::new(&db.path);
        if let Some(parent) = db_path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            errors.push(ValidationError::DatabasePathInvalid(db.path.clone()));
        }
    }
    if db.max_connections == 0 {
        errors.push(ValidationError::ZeroConnections);
    }

    // Cache
    if config.cache.max_capacity < config.cache.init_capacity as u64 {
        errors.push(ValidationError::CapacityInverted {
            init: config.cache.init_capacity,
            max: config.cache.max_capacity,
        });
    }
    if config.cache.redis_scan_count == 0 {
        errors.push(ValidationError::ZeroScanCount);
    }

    // Reporters
    for (name, report) in [
        ("statistics", &config.report.statistics),
        ("geo", &config.report.geo),
    ] {
        if report.report_size == 0 {
            errors.push(ValidationError::ZeroReportSize(name));
        }
        if report.poll_interval_ms == 0 {
            errors.push(ValidationError::ZeroPollInterval(name));
        }
    }

    if !config.metrics.scrape_path.starts_with('/') {
        errors.push(ValidationError::InvalidScrapePath(
            config.metrics.scrape_path.clone(),
        ));
    }

    if let Some(ref advertise) = config.server.advertise {
        let valid = advertise
            .rsplit_once(':')
            .is_some_and(|(host, port)| !host.is_empty() && port.parse::<u16>().is_ok());
        if !valid {
            errors.push(ValidationError::InvalidAdvertise(advertise.clone()));
        }
    }

    if let Some(ref redis) = config.redis
        && !(redis.url.starts_with("redis://") || redis.url.starts_with("rediss://"))
    {
        errors.push(ValidationError::InvalidRedisUrl(redis.url.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

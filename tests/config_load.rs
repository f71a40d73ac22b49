//! Configuration loading and startup validation.

use std::io::Write;
use venus::config::{self, Config, EncoderKind, LogFormat, ValidationError};
use venus::{App, AppError};

#[test]
fn test_load_full_config_from_file() -> anyhow::Result<()> {
    let mut file = tempfile::NamedTempFile::new()?;
    write!(
        file,
        r#"
[server]
address = "0.0.0.0:8029"
advertise = "venus-1.internal:8029"

[database]
path = ":memory:"

[redis]
url = "redis://127.0.0.1:6379/0"

[cache]
allow_null = false
max_capacity = 5000
redis_expires_ms = 60000

[initializer]
enabled = true

[report.geo]
report_size = 10

[metrics]
port = 9100
scrape_path = "/prometheus"

[log]
level = "debug"
format = "json"

[links]
default_expires_days = 7
encoder = "base64"
"#
    )?;

    let config = Config::load(file.path())?;
    assert_eq!(config.server.address.port(), 8029);
    assert_eq!(config.server.advertise.as_deref(), Some("venus-1.internal:8029"));
    assert_eq!(config.redis.as_ref().map(|r| r.url.as_str()), Some("redis://127.0.0.1:6379/0"));
    assert!(!config.cache.allow_null);
    assert_eq!(config.cache.max_capacity, 5000);
    assert!(config.initializer.enabled);
    assert_eq!(config.report.geo.report_size, 10);
    assert_eq!(config.metrics.scrape_path, "/prometheus");
    assert_eq!(config.log.format, LogFormat::Json);
    assert_eq!(config.links.encoder, EncoderKind::Base64);
    assert_eq!(config.links.default_expires_days, 7);
    assert!(config::validate(&config).is_ok());
    Ok(())
}

#[test]
fn test_missing_file_is_an_io_error() {
    let err = Config::load("/nonexistent/venus.toml").unwrap_err();
    assert!(matches!(err, config::ConfigError::Io(_)));
}

#[test]
fn test_validation_collects_every_problem() -> anyhow::Result<()> {
    let config = Config::parse(
        r#"
[server]
address = "127.0.0.1:0"
advertise = "no-port"

[database]
path = ""

[report.statistics]
report_size = 0

[metrics]
scrape_path = "metrics"
"#,
    )?;

    let errors = config::validate(&config).unwrap_err();
    assert!(errors.contains(&ValidationError::MissingDatabasePath));
    assert!(errors.contains(&ValidationError::ZeroReportSize("statistics")));
    assert!(errors.contains(&ValidationError::InvalidScrapePath("metrics".into())));
    assert!(errors.contains(&ValidationError::InvalidAdvertise("no-port".into())));
    Ok(())
}

#[tokio::test]
async fn test_app_refuses_invalid_config() -> anyhow::Result<()> {
    let config = Config::parse(
        r#"
[server]
address = "127.0.0.1:0"

[database]
path = ""
"#,
    )?;

    match App::start(config).await {
        Err(AppError::Config(errors)) => {
            assert_eq!(errors, vec![ValidationError::MissingDatabasePath]);
        }
        Err(e) => anyhow::bail!("unexpected error: {e}"),
        Ok(_) => anyhow::bail!("started with an invalid config"),
    }
    Ok(())
}

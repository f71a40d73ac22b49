//! venus - short link redirect service.

use tracing::{error, info};
use venus::config::{self, Config, LogConfig};
use venus::{App, telemetry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());

    let config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            telemetry::init_logging(&LogConfig::default());
            error!(path = %config_path, error = %e, "Failed to load config");
            return Err(e.into());
        }
    };
    telemetry::init_logging(&config.log);

    if let Err(errors) = config::validate(&config) {
        for e in &errors {
            error!(error = %e, "Invalid configuration");
        }
        anyhow::bail!("refusing to start with {} configuration error(s)", errors.len());
    }

    info!(
        path = %config_path,
        address = %config.server.address,
        redis = config.redis.is_some(),
        version = env!("CARGO_PKG_VERSION"),
        "Starting venus"
    );

    let app = App::start(config).await?;
    info!(addr = %app.local_addr(), source = %app.node().source, "venus started");

    tokio::signal::ctrl_c().await?;
    info!("Received ctrl-c");
    app.shutdown().await;
    Ok(())
}

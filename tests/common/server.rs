//! Test server management.
//!
//! Runs venus in-process on an ephemeral port.

use super::client::TestClient;
use std::sync::Arc;
use venus::cache::{CacheBackend, MemoryBackend};
use venus::{App, Config};

/// Configuration for a test node: ephemeral port, no metrics listener and
/// reporters that flush within a few milliseconds.
pub fn test_config(database_path: &str) -> anyhow::Result<Config> {
    let content = format!(
        r#"
[server]
address = "127.0.0.1:0"

[database]
path = {database_path:?}

[metrics]
enabled = false

[report.statistics]
scheduled_delay_ms = 0
report_timeout_ms = 50
poll_interval_ms = 10

[report.geo]
scheduled_delay_ms = 0
report_timeout_ms = 50
poll_interval_ms = 10
"#
    );
    Ok(Config::parse(&content)?)
}

/// A test server instance.
pub struct TestServer {
    app: App,
    client: TestClient,
}

impl TestServer {
    /// Spawn a node with an in-memory database and its own cache backend.
    pub async fn spawn() -> anyhow::Result<Self> {
        Self::spawn_with(test_config(":memory:")?, Arc::new(MemoryBackend::new())).await
    }

    /// Spawn a node on `backend`. Nodes given clones of one backend form a cluster.
    pub async fn spawn_with(config: Config, backend: Arc<dyn CacheBackend>) -> anyhow::Result<Self> {
        let app = App::start_with_backend(config, backend).await?;
        let client = TestClient::new(app.local_addr())?;
        Ok(Self { app, client })
    }

    pub fn client(&self) -> &TestClient {
        &self.client
    }

    pub fn app(&self) -> &App {
        &self.app
    }

    pub async fn shutdown(self) {
        self.app.shutdown().await;
    }
}

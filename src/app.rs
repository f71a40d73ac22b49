//! Service lifecycle: wiring, startup and graceful shutdown.

use crate::admin::{AdminState, GeoService, LinkService, StatisticsService};
use crate::cache::manager::spawn_metrics_task;
use crate::cache::message::spawn_receiver;
use crate::cache::{
    CacheBackend, CacheCallback, CacheError, CacheManager, LoggingAlarm, MemoryBackend,
    REDIRECT_CACHE, RedisBackend, initializer,
};
use crate::codec;
use crate::config::{Config, ValidationError, validate};
use crate::db::{Database, DbError};
use crate::http;
use crate::metrics;
use crate::openapi::{BatchReporter, GeoSink, OpenapiService, OpenapiState, StatisticsSink};
use crate::support::NodeIdentity;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid configuration: {}", join(.0))]
    Config(Vec<ValidationError>),
    #[error(transparent)]
    Db(#[from] DbError),
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// A running venus node.
pub struct App {
    addr: SocketAddr,
    node: Arc<NodeIdentity>,
    db: Database,
    cache: Arc<CacheManager>,
    statistics: Arc<BatchReporter<crate::db::StatisticsRecord>>,
    geo: Arc<BatchReporter<crate::db::GeoRecord>>,
    server_shutdown: CancellationToken,
    task_shutdown: CancellationToken,
    server: JoinHandle<()>,
    tasks: Vec<JoinHandle<()>>,
}

impl App {
    /// Start a node with the backend named by `config.redis`.
    pub async fn start(config: Config) -> Result<Self, AppError> {
        let backend: Arc<dyn CacheBackend> = match &config.redis {
            Some(redis) => Arc::new(RedisBackend::connect(&redis.url).await?),
            None => {
                info!("No [redis] section, using the in-process cache backend");
                Arc::new(MemoryBackend::new())
            }
        };
        Self::start_with_backend(config, backend).await
    }

    /// Start a node on an existing second level. Nodes sharing `backend`
    /// form one cluster.
    pub async fn start_with_backend(
        config: Config,
        backend: Arc<dyn CacheBackend>,
    ) -> Result<Self, AppError> {
        validate(&config).map_err(AppError::Config)?;
        if config.metrics.enabled {
            metrics::init();
        }

        let db = Database::new(&config.database).await?;

        let listener = TcpListener::bind(config.server.address)
            .await
            .map_err(|source| AppError::Bind {
                addr: config.server.address,
                source,
            })?;
        let addr = listener.local_addr().map_err(|source| AppError::Bind {
            addr: config.server.address,
            source,
        })?;

        let node = Arc::new(NodeIdentity::resolve(
            config.server.advertise.as_deref(),
            addr.port(),
        ));
        info!(source = %node.source, host = %node.host, ip = %node.ip, "Node identity resolved");

        let cache = Arc::new(CacheManager::new(
            config.cache.clone(),
            Arc::clone(&backend),
            node.source.clone(),
        ));

        let server_shutdown = CancellationToken::new();
        let task_shutdown = CancellationToken::new();
        let mut tasks = Vec::new();

        tasks.push(spawn_receiver(Arc::clone(&backend), Arc::clone(&cache), task_shutdown.clone()).await?);

        if config.initializer.enabled {
            match initializer::warm_redirect_cache(&db, &cache).await {
                Ok(count) => info!(count, "Redirect cache initializer finished"),
                Err(e) => warn!(error = %e, "Redirect cache initializer failed"),
            }
        }

        let statistics = BatchReporter::new(
            "statistics",
            Arc::new(StatisticsSink::new(db.clone())),
            config.report.statistics.clone(),
        );
        let geo = BatchReporter::new(
            "geo",
            Arc::new(GeoSink::new(db.clone())),
            config.report.geo.clone(),
        );
        tasks.push(statistics.spawn(task_shutdown.clone()));
        tasks.push(geo.spawn(task_shutdown.clone()));

        if config.metrics.enabled && config.metrics.cache_metrics_enabled {
            tasks.push(spawn_metrics_task(
                Arc::clone(&cache),
                Duration::from_secs(config.metrics.cache_metrics_period_secs.max(1)),
                task_shutdown.clone(),
            ));
        }

        if config.metrics.enabled && config.metrics.port != 0 {
            tasks.push(tokio::spawn(http::run_metrics_server(
                config.metrics.port,
                config.metrics.scrape_path.clone(),
                task_shutdown.clone(),
            )));
        } else {
            info!("Metrics listener disabled");
        }

        let redirect_cache = cache.cache(REDIRECT_CACHE);
        let callback = Arc::new(CacheCallback::new(Arc::clone(&backend), Arc::new(LoggingAlarm)));
        let admin = AdminState {
            links: Arc::new(LinkService::new(
                db.clone(),
                Arc::clone(&redirect_cache),
                callback,
                codec::encoder(config.links.encoder),
                config.links.default_expires_days,
            )),
            statistics: Arc::new(StatisticsService::new(db.clone())),
            geo: Arc::new(GeoService::new(db.clone())),
        };
        let openapi = OpenapiState {
            service: Arc::new(OpenapiService::new(db.clone(), redirect_cache)),
            statistics: Arc::clone(&statistics),
            geo: Arc::clone(&geo),
        };
        let router = http::router(admin, openapi, Arc::clone(&node));

        let token = server_shutdown.clone();
        let server = tokio::spawn(async move {
            let result = axum::serve(listener, router)
                .with_graceful_shutdown(async move { token.cancelled().await })
                .await;
            if let Err(e) = result {
                error!(error = %e, "HTTP server error");
            }
        });
        info!(%addr, "venus listening");

        Ok(Self {
            addr,
            node,
            db,
            cache,
            statistics,
            geo,
            server_shutdown,
            task_shutdown,
            server,
            tasks,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn node(&self) -> &NodeIdentity {
        &self.node
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn cache(&self) -> &Arc<CacheManager> {
        &self.cache
    }

    /// Flush both reporters now instead of waiting for the next tick.
    pub async fn flush_reports(&self) -> usize {
        self.statistics.flush().await + self.geo.flush().await
    }

    /// Stop accepting requests, drain the reporters and close the pool.
    pub async fn shutdown(self) {
        info!("Shutting down");
        self.server_shutdown.cancel();
        if let Err(e) = self.server.await {
            warn!(error = %e, "HTTP server task failed");
        }

        self.task_shutdown.cancel();
        for task in self.tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "Background task failed");
            }
        }

        self.db.close().await;
        info!("Shutdown complete");
    }
}

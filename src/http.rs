//! HTTP routing for the public APIs and the Prometheus scrape endpoint.
//!
//! The APIs and the metrics endpoint are served by separate listeners so
//! scrapes never queue behind redirect traffic.

use crate::admin::{self, AdminState};
use crate::openapi::{self, OpenapiState};
use crate::support::NodeIdentity;
use crate::telemetry;
use axum::{Router, middleware, routing::get};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Assemble the admin and open API routes behind the request tracing layer.
pub fn router(admin: AdminState, openapi: OpenapiState, node: Arc<NodeIdentity>) -> Router {
    Router::new()
        .merge(admin::router(admin))
        .merge(openapi::router(openapi))
        .layer(middleware::from_fn_with_state(node, telemetry::trace_request))
}

/// Handler for the scrape path - returns Prometheus metrics in text format.
async fn metrics_handler() -> String {
    crate::metrics::gather_metrics()
}

pub fn metrics_router(scrape_path: &str) -> Router {
    Router::new().route(scrape_path, get(metrics_handler))
}

/// Run the HTTP server for Prometheus metrics until `shutdown` fires.
///
/// Binds to `0.0.0.0:port` and serves `scrape_path`.
/// This is a long-running task that should be spawned in the background.
pub async fn run_metrics_server(port: u16, scrape_path: String, shutdown: CancellationToken) {
    let app = metrics_router(&scrape_path);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(%addr, error = %e, "Failed to bind metrics server");
            return;
        }
    };
    tracing::info!(%addr, path = %scrape_path, "Prometheus HTTP server listening");

    let result = axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await;
    if let Err(e) = result {
        tracing::error!(error = %e, "Metrics server error");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn metrics_router_serves_registry() {
        crate::metrics::init();
        crate::metrics::record_redirect("permanent");

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = CancellationToken::new();
        let token = shutdown.clone();
        let server = tokio::spawn(async move {
            axum::serve(listener, metrics_router("/metrics"))
                .with_graceful_shutdown(async move { token.cancelled().await })
                .await
                .unwrap();
        });

        let body = reqwest::get(format!("http://{addr}/metrics"))
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert!(body.contains("http_redirect_request_total_count"));

        shutdown.cancel();
        server.await.unwrap();
    }
}

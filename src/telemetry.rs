//! Logging setup and request tracing.

use crate::config::{LogConfig, LogFormat};
use crate::support::NodeIdentity;
use axum::extract::{Request, State};
use axum::http::{HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::Response;
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;
use tracing_subscriber::EnvFilter;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Install the global subscriber. `RUST_LOG` wins over `config.level`.
pub fn init_logging(config: &LogConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    let result = match config.format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    if let Err(e) = result {
        eprintln!("logging already initialized: {e}");
    }
}

/// Guard for timing one HTTP request.
///
/// Records latency under the `5xx` class when dropped before [`finish`](Self::finish),
/// which covers handlers that panic or are cancelled.
pub struct RequestTimer {
    start: Instant,
    class: Option<&'static str>,
}

impl RequestTimer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            class: None,
        }
    }

    pub fn finish(mut self, status: StatusCode) -> f64 {
        self.class = Some(status_class(status));
        self.start.elapsed().as_secs_f64()
    }
}

impl Default for RequestTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for RequestTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        crate::metrics::record_http_request(self.class.unwrap_or("5xx"), duration);
    }
}

pub fn status_class(status: StatusCode) -> &'static str {
    match status.as_u16() {
        100..=199 => "1xx",
        200..=299 => "2xx",
        300..=399 => "3xx",
        400..=499 => "4xx",
        _ => "5xx",
    }
}

/// Run every request inside a `request` span tagged with this node's identity.
pub async fn trace_request(
    State(node): State<Arc<NodeIdentity>>,
    request: Request,
    next: Next,
) -> Response {
    let id = uuid::Uuid::new_v4().to_string();
    let span = spans::request(
        &id,
        request.method().as_str(),
        request.uri().path(),
        &node.host,
        &node.ip.to_string(),
    );

    async move {
        let timer = RequestTimer::new();
        let mut response = next.run(request).await;
        let status = response.status();
        let elapsed = timer.finish(status);
        tracing::debug!(status = status.as_u16(), elapsed_ms = elapsed * 1000.0, "Request served");

        if let Ok(value) = HeaderValue::from_str(&id) {
            response.headers_mut().insert(REQUEST_ID_HEADER, value);
        }
        response
    }
    .instrument(span)
    .await
}

/// Standardized span constructors.
pub mod spans {
    use tracing::{Span, info_span};

    /// Create a span for one HTTP request.
    pub fn request(id: &str, method: &str, path: &str, host: &str, ip: &str) -> Span {
        info_span!("request", id = %id, method = %method, path = %path, host = %host, ip = %ip)
    }
}

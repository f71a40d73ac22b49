//! Open API: link lookups, redirects and click reporting.

pub mod handlers;
pub mod model;
pub mod report;
pub mod service;

pub use report::{BatchReporter, GeoSink, ReportError, ReportSink, StatisticsSink};
pub use service::{OpenapiService, RedirectOutcome};

use crate::db::{GeoRecord, StatisticsRecord};
use axum::Router;
use axum::routing::{get, post};
use std::sync::Arc;

#[derive(Clone)]
pub struct OpenapiState {
    pub service: Arc<OpenapiService>,
    pub statistics: Arc<BatchReporter<StatisticsRecord>>,
    pub geo: Arc<BatchReporter<GeoRecord>>,
}

pub fn router(state: OpenapiState) -> Router {
    Router::new()
        .route("/openapi/mapping", get(handlers::mapping))
        .route("/openapi/lists", get(handlers::lists))
        .route("/openapi/redirect", get(handlers::redirect))
        .route("/openapi/statistics/report", post(handlers::report_statistics))
        .route("/openapi/geo/report", post(handlers::report_geo))
        .with_state(state)
}

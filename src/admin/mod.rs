//! Admin API under `/api/v1`: link management and report browsing.

pub mod handlers;
pub mod model;
pub mod service;

pub use model::{LinkRequest, LinkResponse};
pub use service::{GeoService, LinkService, StatisticsService};

use axum::Router;
use axum::routing::{delete, get, post};
use std::sync::Arc;

#[derive(Clone)]
pub struct AdminState {
    pub links: Arc<LinkService>,
    pub statistics: Arc<StatisticsService>,
    pub geo: Arc<GeoService>,
}

pub fn router(state: AdminState) -> Router {
    Router::new()
        .route("/api/v1/links/lists", get(handlers::link_lists))
        .route("/api/v1/links/detail/:id", get(handlers::link_detail))
        .route("/api/v1/links/create", post(handlers::link_create))
        .route("/api/v1/links/update", post(handlers::link_update))
        .route("/api/v1/links/delete/:id", delete(handlers::link_delete))
        .route("/api/v1/statistics/lists", get(handlers::statistics_lists))
        .route("/api/v1/statistics/detail/:id", get(handlers::statistics_detail))
        .route("/api/v1/geo/lists", get(handlers::geo_lists))
        .route("/api/v1/geo/detail/:id", get(handlers::geo_detail))
        .with_state(state)
}

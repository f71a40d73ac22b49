//! `/api/v1` handlers.

use super::AdminState;
use super::model::{LinkRequest, LinkResponse};
use crate::db::{GeoRecord, StatisticsRecord};
use crate::error::{ApiError, ValidJson};
use crate::support::ApiResponse;
use axum::Json;
use axum::extract::{Path, State};

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

pub async fn link_lists(State(state): State<AdminState>) -> ApiResult<Vec<LinkResponse>> {
    let links = state.links.lists().await.map_err(ApiError::Admin)?;
    Ok(Json(ApiResponse::success(
        links.iter().map(LinkResponse::from).collect(),
    )))
}

pub async fn link_detail(
    State(state): State<AdminState>,
    Path(id): Path<i64>,
) -> ApiResult<LinkResponse> {
    let link = state.links.detail(id).await.map_err(ApiError::Admin)?;
    Ok(Json(ApiResponse::success(LinkResponse::from(&link))))
}

pub async fn link_create(
    State(state): State<AdminState>,
    ValidJson(request): ValidJson<LinkRequest>,
) -> ApiResult<bool> {
    state.links.create(request).await.map_err(ApiError::Admin)?;
    Ok(Json(ApiResponse::success(true)))
}

pub async fn link_update(
    State(state): State<AdminState>,
    ValidJson(request): ValidJson<LinkRequest>,
) -> ApiResult<bool> {
    state.links.update(request).await.map_err(ApiError::Admin)?;
    Ok(Json(ApiResponse::success(true)))
}

pub async fn link_delete(State(state): State<AdminState>, Path(id): Path<i64>) -> ApiResult<bool> {
    state.links.delete(id).await.map_err(ApiError::Admin)?;
    Ok(Json(ApiResponse::success(true)))
}

pub async fn statistics_lists(State(state): State<AdminState>) -> ApiResult<Vec<StatisticsRecord>> {
    let rows = state.statistics.lists().await.map_err(ApiError::Admin)?;
    Ok(Json(ApiResponse::success(rows)))
}

pub async fn statistics_detail(
    State(state): State<AdminState>,
    Path(id): Path<i64>,
) -> ApiResult<StatisticsRecord> {
    let row = state.statistics.detail(id).await.map_err(ApiError::Admin)?;
    Ok(Json(ApiResponse::success(row)))
}

pub async fn geo_lists(State(state): State<AdminState>) -> ApiResult<Vec<GeoRecord>> {
    let rows = state.geo.lists().await.map_err(ApiError::Admin)?;
    Ok(Json(ApiResponse::success(rows)))
}

pub async fn geo_detail(State(state): State<AdminState>, Path(id): Path<i64>) -> ApiResult<GeoRecord> {
    let row = state.geo.detail(id).await.map_err(ApiError::Admin)?;
    Ok(Json(ApiResponse::success(row)))
}

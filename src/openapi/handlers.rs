//! `/openapi` handlers.

use super::OpenapiState;
use super::model::{
    GeoReportRequest, MappingQuery, OpenapiResponse, RedirectQuery, StatisticsReportRequest,
};
use super::service::RedirectOutcome;
use crate::error::{ApiError, FieldError, ValidJson};
use crate::metrics;
use crate::support::ApiResponse;
use axum::Json;
use axum::extract::{Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use tracing::{debug, error};

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

fn required(value: Option<String>, field: &'static str) -> Result<String, ApiError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::Validation(vec![FieldError::new(field, "must not be empty")]))
}

/// GET /openapi/mapping?original=<code>
pub async fn mapping(
    State(state): State<OpenapiState>,
    Query(query): Query<MappingQuery>,
) -> ApiResult<OpenapiResponse> {
    let code = required(query.original, "original")?;
    let link = state.service.mapping(&code).await.map_err(ApiError::Openapi)?;
    Ok(Json(ApiResponse::success(OpenapiResponse::from(&link))))
}

/// GET /openapi/lists
pub async fn lists(State(state): State<OpenapiState>) -> ApiResult<Vec<OpenapiResponse>> {
    let links = state.service.lists().await.map_err(ApiError::Openapi)?;
    Ok(Json(ApiResponse::success(
        links.iter().map(OpenapiResponse::from).collect(),
    )))
}

/// GET /openapi/redirect?encode=<code>
pub async fn redirect(
    State(state): State<OpenapiState>,
    Query(query): Query<RedirectQuery>,
) -> Response {
    let Some(code) = query.encode.filter(|c| !c.trim().is_empty()) else {
        metrics::record_redirect("empty_code");
        return StatusCode::BAD_REQUEST.into_response();
    };

    match state.service.redirect(code.trim()).await {
        Ok(outcome) => {
            metrics::record_redirect(outcome.label());
            debug!(code = %code, outcome = outcome.label(), "Redirect");
            match outcome {
                RedirectOutcome::Found { kind, location } => {
                    let status = StatusCode::from_u16(kind.code()).unwrap_or(StatusCode::FOUND);
                    (status, [(header::LOCATION, location)]).into_response()
                }
                RedirectOutcome::UnknownUrl | RedirectOutcome::UnknownStatus => {
                    StatusCode::BAD_REQUEST.into_response()
                }
            }
        }
        Err(e) => {
            metrics::record_redirect("error");
            error!(code = %code, error = %e, "Redirect lookup failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// POST /openapi/statistics/report
pub async fn report_statistics(
    State(state): State<OpenapiState>,
    ValidJson(request): ValidJson<StatisticsReportRequest>,
) -> ApiResult<()> {
    state
        .statistics
        .report(request.into())
        .map_err(|e| ApiError::Report(e.to_string()))?;
    Ok(Json(ApiResponse::empty()))
}

/// POST /openapi/geo/report
pub async fn report_geo(
    State(state): State<OpenapiState>,
    ValidJson(request): ValidJson<GeoReportRequest>,
) -> ApiResult<()> {
    state
        .geo
        .report(request.into())
        .map_err(|e| ApiError::Report(e.to_string()))?;
    Ok(Json(ApiResponse::empty()))
}

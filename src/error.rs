//! Unified error handling for venus.
//!
//! Layers below the HTTP surface return [`ServiceError`]; handlers wrap it in
//! an [`ApiError`] that picks the envelope code for the API it came from.

use crate::cache::CacheError;
use crate::db::DbError;
use crate::support::{ApiResponse, RestApiCode};
use axum::extract::{FromRequest, Request};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Json, async_trait};
use serde::de::DeserializeOwned;
use std::fmt;
use thiserror::Error;
use tracing::{debug, warn};

// ============================================================================
// Service Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Db(#[from] DbError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("not found: {0}")]
    NotFound(String),
}

impl ServiceError {
    /// Get a static error code string for log fields.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Db(DbError::LinkNotFound(_)) => "link_not_found",
            Self::Db(DbError::LinkExists(_)) => "link_exists",
            Self::Db(_) => "database_error",
            Self::Cache(_) => "cache_error",
            Self::NotFound(_) => "not_found",
        }
    }
}

// ============================================================================
// Request validation
// ============================================================================

/// One rejected request field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Request bodies that check their own field constraints.
pub trait Validate {
    fn validate(&self) -> Result<(), Vec<FieldError>>;
}

// ============================================================================
// API Errors (envelope rendering)
// ============================================================================

#[derive(Debug, Error)]
pub enum ApiError {
    /// Field constraints failed; carries every violation.
    #[error("{}", join_fields(.0))]
    Validation(Vec<FieldError>),

    /// Missing or undecodable JSON body.
    #[error("Required request body is missing")]
    MissingBody,

    #[error(transparent)]
    Admin(ServiceError),

    #[error(transparent)]
    Openapi(ServiceError),

    /// Report could not be accepted.
    #[error("{0}")]
    Report(String),
}

fn join_fields(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl ApiError {
    pub fn code(&self) -> RestApiCode {
        match self {
            Self::Validation(_) | Self::MissingBody => RestApiCode::BadRequest,
            Self::Admin(_) => RestApiCode::AdminException,
            Self::Openapi(_) => RestApiCode::OpenapiException,
            Self::Report(_) => RestApiCode::Failure,
        }
    }

    pub fn message(&self) -> String {
        match self {
            Self::Validation(_) | Self::MissingBody => self.to_string(),
            Self::Admin(e) | Self::Openapi(e) => self.code().message_with(e),
            Self::Report(_) => RestApiCode::Failure.message().to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            Self::Admin(e) | Self::Openapi(e) => {
                warn!(error = %e, error_code = e.error_code(), "Request failed")
            }
            Self::Report(e) => warn!(error = %e, "Report rejected"),
            Self::Validation(_) | Self::MissingBody => debug!(error = %self, "Bad request"),
        }
        let body = ApiResponse::<()>::fail(self.code(), self.message());
        (StatusCode::OK, Json(body)).into_response()
    }
}

// ============================================================================
// Extractor
// ============================================================================

/// `Json<T>` that renders decode failures and field violations as envelopes.
#[derive(Debug, Clone)]
pub struct ValidJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| {
                debug!(error = %rejection.body_text(), "Rejected request body");
                ApiError::MissingBody
            })?;
        value.validate().map_err(ApiError::Validation)?;
        Ok(Self(value))
    }
}

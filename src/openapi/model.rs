//! Open API request and response bodies.

use crate::db::{GeoRecord, LinkRecord, StatisticsRecord};
use crate::error::{FieldError, Validate};
use crate::support::datetime;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Public view of a link.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenapiResponse {
    pub code: String,
    pub redirect: i32,
    pub original_url: String,
    #[serde(with = "datetime")]
    pub expires_at: NaiveDateTime,
    pub is_active: bool,
}

impl From<&LinkRecord> for OpenapiResponse {
    fn from(link: &LinkRecord) -> Self {
        Self {
            code: link.code.clone(),
            redirect: link.redirect,
            original_url: link.original_url.clone(),
            expires_at: link.expires_at,
            is_active: link.is_active != 0,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct MappingQuery {
    pub original: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RedirectQuery {
    pub encode: Option<String>,
}

/// One click, as reported by a redirect front-end.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticsReportRequest {
    #[serde(default)]
    pub id: Option<i64>,
    pub link_id: Option<i64>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub referer: Option<String>,
    #[serde(default, with = "datetime::option")]
    pub clicked_at: Option<NaiveDateTime>,
}

impl Validate for StatisticsReportRequest {
    fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();
        if self.link_id.is_none() {
            errors.push(FieldError::new("linkId", "The openapi statistics linkId cannot be empty"));
        }
        if self.ip.is_none() {
            errors.push(FieldError::new("ip", "The openapi statistics ip cannot be empty"));
        }
        if self.user_agent.is_none() {
            errors.push(FieldError::new("userAgent", "The openapi statistics userAgent cannot be empty"));
        }
        if self.referer.is_none() {
            errors.push(FieldError::new("referer", "The openapi statistics referer cannot be empty"));
        }
        if self.clicked_at.is_none() {
            errors.push(FieldError::new("clickedAt", "The openapi statistics clickedAt cannot be empty"));
        }
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

impl From<StatisticsReportRequest> for StatisticsRecord {
    fn from(req: StatisticsReportRequest) -> Self {
        Self {
            id: req.id,
            link_id: req.link_id.unwrap_or_default(),
            ip: req.ip.unwrap_or_default(),
            user_agent: req.user_agent.unwrap_or_default(),
            referer: req.referer.unwrap_or_default(),
            clicked_at: req.clicked_at.unwrap_or_default(),
        }
    }
}

/// Location resolved for a click.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoReportRequest {
    #[serde(default)]
    pub id: Option<i64>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub click_id: Option<i64>,
    pub city: Option<String>,
    pub country: Option<String>,
}

impl Validate for GeoReportRequest {
    fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();
        match self.lat {
            None => errors.push(FieldError::new("lat", "The openapi geo lat cannot be empty")),
            Some(lat) if !(-90.0..=90.0).contains(&lat) => {
                errors.push(FieldError::new("lat", "must be between -90 and 90"))
            }
            Some(_) => {}
        }
        match self.lng {
            None => errors.push(FieldError::new("lng", "The openapi geo lng cannot be empty")),
            Some(lng) if !(-180.0..=180.0).contains(&lng) => {
                errors.push(FieldError::new("lng", "must be between -180 and 180"))
            }
            Some(_) => {}
        }
        if self.click_id.is_none() {
            errors.push(FieldError::new("clickId", "The openapi geo clickId cannot be empty"));
        }
        if self.city.is_none() {
            errors.push(FieldError::new("city", "The openapi geo city cannot be empty"));
        }
        if self.country.is_none() {
            errors.push(FieldError::new("country", "The openapi geo country cannot be empty"));
        }
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

impl From<GeoReportRequest> for GeoRecord {
    fn from(req: GeoReportRequest) -> Self {
        Self {
            id: req.id,
            lat: req.lat.unwrap_or_default(),
            lng: req.lng.unwrap_or_default(),
            click_id: req.click_id.unwrap_or_default(),
            city: req.city.unwrap_or_default(),
            country: req.country.unwrap_or_default(),
        }
    }
}

//! Admin API request and response bodies.

use crate::db::LinkRecord;
use crate::error::{FieldError, Validate};
use crate::support::datetime;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

const CODE_MAX_CHARS: usize = 8;
const URL_MAX_CHARS: usize = 500;

/// Body of `links/create` and `links/update`.
///
/// Everything is optional at the serde level so that missing fields are
/// reported by [`Validate`] with a field name instead of a decode error.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkRequest {
    pub id: Option<i64>,
    #[serde(default)]
    pub code: Option<String>,
    pub redirect: Option<i32>,
    pub original_url: Option<String>,
    #[serde(default, with = "datetime::option")]
    pub expires_at: Option<NaiveDateTime>,
    pub is_active: Option<i32>,
}

impl Validate for LinkRequest {
    fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();

        match self.id {
            None => errors.push(FieldError::new("id", "The links mapping id cannot be empty")),
            Some(id) if id < 0 => {
                errors.push(FieldError::new("id", "The links mapping id min-value is 0"))
            }
            Some(_) => {}
        }

        if let Some(code) = &self.code
            && code.chars().count() > CODE_MAX_CHARS
        {
            errors.push(FieldError::new("code", "The links code character length must be 8"));
        }

        match self.redirect {
            None => errors.push(FieldError::new("redirect", "The links redirect code cannot be empty")),
            Some(r) if r < 301 => errors.push(FieldError::new("redirect", "The min redirect must be 301")),
            Some(r) if r > 302 => errors.push(FieldError::new("redirect", "The max redirect must be 302")),
            Some(_) => {}
        }

        match self.original_url.as_deref().map(str::trim) {
            None | Some("") => {
                errors.push(FieldError::new("originalUrl", "The links original URL cannot be empty"))
            }
            Some(url) if url.chars().count() > URL_MAX_CHARS => {
                errors.push(FieldError::new("originalUrl", "The links original URL length in [0,500]"))
            }
            Some(_) => {}
        }

        if let Some(expires_at) = self.expires_at
            && expires_at <= datetime::now()
        {
            errors.push(FieldError::new("expiresAt", "The links expires_at must be a future date"));
        }

        match self.is_active {
            None => errors.push(FieldError::new("isActive", "The links is_active cannot be empty")),
            Some(a) if a < 0 => errors.push(FieldError::new("isActive", "The links is_active min-value is 0")),
            Some(a) if a > 1 => errors.push(FieldError::new("isActive", "The links is_active max-value is 1")),
            Some(_) => {}
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkResponse {
    pub id: i64,
    pub code: String,
    pub redirect: i32,
    pub original_url: String,
    #[serde(with = "datetime")]
    pub created_at: NaiveDateTime,
    #[serde(with = "datetime")]
    pub expires_at: NaiveDateTime,
    pub is_active: bool,
}

impl From<&LinkRecord> for LinkResponse {
    fn from(link: &LinkRecord) -> Self {
        Self {
            id: link.id,
            code: link.code.clone(),
            redirect: link.redirect,
            original_url: link.original_url.clone(),
            created_at: link.created_at,
            expires_at: link.expires_at,
            is_active: link.is_active != 0,
        }
    }
}

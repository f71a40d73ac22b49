//! Link lookups for the open API, served through the redirect cache.

use crate::cache::MultiLevelCache;
use crate::db::{Database, LinkRecord, RedirectKind};
use crate::error::ServiceError;
use crate::support::datetime;
use std::sync::Arc;

/// What the redirect endpoint should answer for a code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectOutcome {
    Found { kind: RedirectKind, location: String },
    /// Unknown, inactive or expired code.
    UnknownUrl,
    /// Stored redirect status is neither 301 nor 302.
    UnknownStatus,
}

impl RedirectOutcome {
    /// Metric label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Found { kind: RedirectKind::Permanent, .. } => "permanent",
            Self::Found { kind: RedirectKind::Temporary, .. } => "temporary",
            Self::UnknownUrl => "unknown_url",
            Self::UnknownStatus => "unknown_status",
        }
    }
}

pub struct OpenapiService {
    db: Database,
    cache: Arc<MultiLevelCache>,
}

impl OpenapiService {
    pub fn new(db: Database, cache: Arc<MultiLevelCache>) -> Self {
        Self { db, cache }
    }

    /// Link for `code`, cached including "not found".
    pub async fn find(&self, code: &str) -> Result<Option<LinkRecord>, ServiceError> {
        let db = &self.db;
        let link = self
            .cache
            .get_with(code, || async move { db.links().find_by_code(code).await })
            .await?;
        Ok(link)
    }

    pub async fn mapping(&self, code: &str) -> Result<LinkRecord, ServiceError> {
        self.find(code)
            .await?
            .ok_or_else(|| ServiceError::NotFound(code.to_string()))
    }

    /// Active links that have not expired yet.
    pub async fn lists(&self) -> Result<Vec<LinkRecord>, ServiceError> {
        Ok(self.db.links().list_active(datetime::now()).await?)
    }

    pub async fn redirect(&self, code: &str) -> Result<RedirectOutcome, ServiceError> {
        let Some(link) = self.find(code).await? else {
            return Ok(RedirectOutcome::UnknownUrl);
        };
        if !link.is_live(datetime::now()) {
            return Ok(RedirectOutcome::UnknownUrl);
        }
        Ok(match RedirectKind::from_code(link.redirect) {
            Some(kind) => RedirectOutcome::Found {
                kind,
                location: link.original_url,
            },
            None => RedirectOutcome::UnknownStatus,
        })
    }
}

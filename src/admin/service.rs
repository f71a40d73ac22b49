//! Admin services. Link writes keep the redirect cache coherent.

use super::model::LinkRequest;
use crate::cache::{CacheCallback, CallbackKind, MultiLevelCache};
use crate::codec::Encoder;
use crate::db::{Database, DbError, GeoRecord, LinkRecord, StatisticsRecord};
use crate::error::ServiceError;
use crate::support::datetime;
use chrono::{Duration, NaiveDateTime};
use std::sync::Arc;
use tracing::info;

pub struct LinkService {
    db: Database,
    cache: Arc<MultiLevelCache>,
    callback: Arc<CacheCallback>,
    encoder: &'static dyn Encoder,
    default_expiry: Duration,
}

impl LinkService {
    pub fn new(
        db: Database,
        cache: Arc<MultiLevelCache>,
        callback: Arc<CacheCallback>,
        encoder: &'static dyn Encoder,
        default_expires_days: u32,
    ) -> Self {
        Self {
            db,
            cache,
            callback,
            encoder,
            default_expiry: Duration::days(i64::from(default_expires_days)),
        }
    }

    pub async fn lists(&self) -> Result<Vec<LinkRecord>, ServiceError> {
        Ok(self.db.links().list().await?)
    }

    pub async fn detail(&self, id: i64) -> Result<LinkRecord, ServiceError> {
        self.db
            .links()
            .find_by_id(id)
            .await?
            .ok_or_else(|| DbError::LinkNotFound(id.to_string()).into())
    }

    /// Fill defaults: code from the encoder, expiry from config.
    fn to_record(&self, request: LinkRequest, now: NaiveDateTime) -> LinkRecord {
        let id = request.id.unwrap_or_default();
        let code = request
            .code
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| self.encoder.encode(id as u64));
        LinkRecord {
            id,
            code,
            redirect: request.redirect.unwrap_or_default(),
            original_url: request.original_url.unwrap_or_default().trim().to_string(),
            created_at: now,
            expires_at: request.expires_at.unwrap_or(now + self.default_expiry),
            is_active: request.is_active.unwrap_or_default(),
        }
    }

    async fn announce(&self, link: &LinkRecord) {
        let value = serde_json::to_value(link).ok();
        self.callback
            .notify(&link.code, value, CallbackKind::Update)
            .await;
    }

    pub async fn create(&self, request: LinkRequest) -> Result<LinkRecord, ServiceError> {
        let link = self.to_record(request, datetime::now());
        self.db.links().insert(&link).await?;
        // A lookup before creation may have cached "not found".
        self.cache.evict(&link.code).await?;
        self.announce(&link).await;
        info!(id = link.id, code = %link.code, "Link created");
        Ok(link)
    }

    pub async fn update(&self, request: LinkRequest) -> Result<LinkRecord, ServiceError> {
        let id = request.id.unwrap_or_default();
        let existing = self.detail(id).await?;

        let mut link = self.to_record(request, datetime::now());
        link.created_at = existing.created_at;
        self.db.links().update(&link).await?;

        if existing.code != link.code {
            self.cache.evict(&existing.code).await?;
            self.callback
                .notify(&existing.code, None, CallbackKind::Evict)
                .await;
        }
        self.cache.put(&link.code, Some(&link)).await?;
        self.announce(&link).await;
        info!(id = link.id, code = %link.code, "Link updated");
        Ok(link)
    }

    pub async fn delete(&self, id: i64) -> Result<(), ServiceError> {
        let existing = self.detail(id).await?;
        self.db.links().delete(id).await?;
        self.cache.evict(&existing.code).await?;
        self.callback
            .notify(&existing.code, None, CallbackKind::Evict)
            .await;
        info!(id, code = %existing.code, "Link deleted");
        Ok(())
    }
}

pub struct StatisticsService {
    db: Database,
}

impl StatisticsService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn lists(&self) -> Result<Vec<StatisticsRecord>, ServiceError> {
        Ok(self.db.statistics().list().await?)
    }

    pub async fn detail(&self, id: i64) -> Result<StatisticsRecord, ServiceError> {
        self.db
            .statistics()
            .find_by_id(id)
            .await?
            .ok_or_else(|| DbError::StatisticsNotFound(id).into())
    }
}

pub struct GeoService {
    db: Database,
}

impl GeoService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn lists(&self) -> Result<Vec<GeoRecord>, ServiceError> {
        Ok(self.db.geo().list().await?)
    }

    pub async fn detail(&self, id: i64) -> Result<GeoRecord, ServiceError> {
        self.db
            .geo()
            .find_by_id(id)
            .await?
            .ok_or_else(|| DbError::GeoNotFound(id).into())
    }
}

//! Link repository.
//!
//! A link maps a short code to its original URL together with the
//! redirect status and an expiry.

use super::{DbError, from_timestamp, to_timestamp};
use crate::support::datetime;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

/// A stored short link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkRecord {
    pub id: i64,
    pub code: String,
    pub redirect: i32,
    pub original_url: String,
    #[serde(with = "datetime")]
    pub created_at: NaiveDateTime,
    #[serde(with = "datetime")]
    pub expires_at: NaiveDateTime,
    pub is_active: i32,
}

impl LinkRecord {
    pub fn status(&self) -> LinkStatus {
        LinkStatus::from_code(self.is_active)
    }

    /// Active and not yet expired at `now`.
    pub fn is_live(&self, now: NaiveDateTime) -> bool {
        self.status() == LinkStatus::Active && self.expires_at > now
    }
}

/// Activation state stored in `links.is_active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStatus {
    Unknown,
    Inactive,
    Active,
}

impl LinkStatus {
    pub fn code(self) -> i32 {
        match self {
            Self::Unknown => -1,
            Self::Inactive => 0,
            Self::Active => 1,
        }
    }

    pub fn from_code(code: i32) -> Self {
        match code {
            0 => Self::Inactive,
            1 => Self::Active,
            _ => Self::Unknown,
        }
    }
}

/// HTTP status used when following a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectKind {
    Permanent,
    Temporary,
}

impl RedirectKind {
    pub fn code(self) -> u16 {
        match self {
            Self::Permanent => 301,
            Self::Temporary => 302,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            301 => Some(Self::Permanent),
            302 => Some(Self::Temporary),
            _ => None,
        }
    }
}

type LinkRow = (i64, String, i32, String, i64, i64, i32);

fn into_record(row: LinkRow) -> Result<LinkRecord, DbError> {
    let (id, code, redirect, original_url, created_at, expires_at, is_active) = row;
    Ok(LinkRecord {
        id,
        code,
        redirect,
        original_url,
        created_at: from_timestamp(created_at, "links.created_at")?,
        expires_at: from_timestamp(expires_at, "links.expires_at")?,
        is_active,
    })
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

/// Repository for link operations.
pub struct LinkRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> LinkRepository<'a> {
    /// Create a new link repository.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// All links, ordered by id.
    pub async fn list(&self) -> Result<Vec<LinkRecord>, DbError> {
        let rows = sqlx::query_as::<_, LinkRow>(
            r#"
            SELECT id, code, redirect, original_url, created_at, expires_at, is_active
            FROM links
            ORDER BY id
            "#,
        )
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(into_record).collect()
    }

    /// Active links that expire after `now`.
    pub async fn list_active(&self, now: NaiveDateTime) -> Result<Vec<LinkRecord>, DbError> {
        let rows = sqlx::query_as::<_, LinkRow>(
            r#"
            SELECT id, code, redirect, original_url, created_at, expires_at, is_active
            FROM links
            WHERE is_active = ? AND expires_at > ?
            ORDER BY id
            "#,
        )
        .bind(LinkStatus::Active.code())
        .bind(to_timestamp(&now))
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(into_record).collect()
    }

    /// Find link by ID.
    pub async fn find_by_id(&self, id: i64) -> Result<Option<LinkRecord>, DbError> {
        let row = sqlx::query_as::<_, LinkRow>(
            r#"
            SELECT id, code, redirect, original_url, created_at, expires_at, is_active
            FROM links
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(into_record).transpose()
    }

    /// Find link by short code.
    pub async fn find_by_code(&self, code: &str) -> Result<Option<LinkRecord>, DbError> {
        let row = sqlx::query_as::<_, LinkRow>(
            r#"
            SELECT id, code, redirect, original_url, created_at, expires_at, is_active
            FROM links
            WHERE code = ?
            "#,
        )
        .bind(code)
        .fetch_optional(self.pool)
        .await?;

        row.map(into_record).transpose()
    }

    /// Insert a new link. Fails with `LinkExists` when the id, code or URL is taken.
    pub async fn insert(&self, link: &LinkRecord) -> Result<(), DbError> {
        sqlx::query(
            r#"
            INSERT INTO links (id, code, redirect, original_url, created_at, expires_at, is_active)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(link.id)
        .bind(&link.code)
        .bind(link.redirect)
        .bind(&link.original_url)
        .bind(to_timestamp(&link.created_at))
        .bind(to_timestamp(&link.expires_at))
        .bind(link.is_active)
        .execute(self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                DbError::LinkExists(link.code.clone())
            } else {
                DbError::Sqlx(e)
            }
        })?;

        Ok(())
    }

    /// Overwrite the link with the same id. `created_at` is left untouched.
    pub async fn update(&self, link: &LinkRecord) -> Result<(), DbError> {
        let result = sqlx::query(
            r#"
            UPDATE links
            SET code = ?, redirect = ?, original_url = ?, expires_at = ?, is_active = ?
            WHERE id = ?
            "#,
        )
        .bind(&link.code)
        .bind(link.redirect)
        .bind(&link.original_url)
        .bind(to_timestamp(&link.expires_at))
        .bind(link.is_active)
        .bind(link.id)
        .execute(self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                DbError::LinkExists(link.code.clone())
            } else {
                DbError::Sqlx(e)
            }
        })?;

        if result.rows_affected() == 0 {
            return Err(DbError::LinkNotFound(link.id.to_string()));
        }
        Ok(())
    }

    /// Delete a link by ID.
    pub async fn delete(&self, id: i64) -> Result<(), DbError> {
        let result = sqlx::query("DELETE FROM links WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::LinkNotFound(id.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory;
    use chrono::Duration;

    fn link(id: i64, code: &str, url: &str) -> LinkRecord {
        let now = datetime::now();
        LinkRecord {
            id,
            code: code.to_string(),
            redirect: 302,
            original_url: url.to_string(),
            created_at: now,
            expires_at: now + Duration::days(30),
            is_active: 1,
        }
    }

    #[tokio::test]
    async fn insert_then_find() {
        let db = memory().await;
        let repo = db.links();
        let record = link(1, "B", "https://example.com/a");
        repo.insert(&record).await.unwrap();

        assert_eq!(repo.find_by_id(1).await.unwrap(), Some(record.clone()));
        assert_eq!(repo.find_by_code("B").await.unwrap(), Some(record));
        assert_eq!(repo.find_by_code("C").await.unwrap(), None);
    }

    #[tokio::test]
    async fn duplicate_code_is_rejected() {
        let db = memory().await;
        let repo = db.links();
        repo.insert(&link(1, "B", "https://example.com/a"))
            .await
            .unwrap();

        let err = repo
            .insert(&link(2, "B", "https://example.com/b"))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::LinkExists(code) if code == "B"));

        let err = repo
            .insert(&link(3, "D", "https://example.com/a"))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::LinkExists(_)));
    }

    #[tokio::test]
    async fn list_active_filters_inactive_and_expired() {
        let db = memory().await;
        let repo = db.links();
        let now = datetime::now();

        repo.insert(&link(1, "B", "https://example.com/live"))
            .await
            .unwrap();

        let mut inactive = link(2, "C", "https://example.com/inactive");
        inactive.is_active = 0;
        repo.insert(&inactive).await.unwrap();

        let mut expired = link(3, "D", "https://example.com/expired");
        expired.expires_at = now - Duration::days(1);
        repo.insert(&expired).await.unwrap();

        let active = repo.list_active(now).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].code, "B");
        assert_eq!(repo.list().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn update_and_delete_missing_rows() {
        let db = memory().await;
        let repo = db.links();

        let err = repo
            .update(&link(9, "J", "https://example.com/j"))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::LinkNotFound(_)));

        let err = repo.delete(9).await.unwrap_err();
        assert!(matches!(err, DbError::LinkNotFound(_)));
    }

    #[tokio::test]
    async fn update_keeps_created_at() {
        let db = memory().await;
        let repo = db.links();
        let original = link(1, "B", "https://example.com/a");
        repo.insert(&original).await.unwrap();

        let mut changed = original.clone();
        changed.code = "Z".to_string();
        changed.redirect = 301;
        changed.created_at = original.created_at - Duration::days(100);
        repo.update(&changed).await.unwrap();

        let stored = repo.find_by_id(1).await.unwrap().unwrap();
        assert_eq!(stored.code, "Z");
        assert_eq!(stored.redirect, 301);
        assert_eq!(stored.created_at, original.created_at);
    }

    #[test]
    fn status_and_redirect_codes() {
        assert_eq!(LinkStatus::from_code(1), LinkStatus::Active);
        assert_eq!(LinkStatus::from_code(0), LinkStatus::Inactive);
        assert_eq!(LinkStatus::from_code(7), LinkStatus::Unknown);
        assert_eq!(LinkStatus::Unknown.code(), -1);
        assert_eq!(RedirectKind::from_code(301), Some(RedirectKind::Permanent));
        assert_eq!(RedirectKind::from_code(302), Some(RedirectKind::Temporary));
        assert_eq!(RedirectKind::from_code(303), None);
    }

    #[test]
    fn record_json_uses_camel_case_and_wire_dates() {
        let mut record = link(1, "B", "https://example.com/a");
        record.expires_at = datetime::parse("2030-01-02 03:04:05").unwrap();
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["originalUrl"], "https://example.com/a");
        assert_eq!(json["expiresAt"], "2030-01-02 03:04:05");
        assert_eq!(json["isActive"], 1);
    }
}

//! Click statistics repository.

use super::{DbError, from_timestamp, to_timestamp};
use crate::support::datetime;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

/// One click on a short link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticsRecord {
    #[serde(default)]
    pub id: Option<i64>,
    pub link_id: i64,
    pub ip: String,
    pub user_agent: String,
    pub referer: String,
    #[serde(with = "datetime")]
    pub clicked_at: NaiveDateTime,
}

type StatisticsRow = (i64, i64, String, String, String, i64);

fn into_record(row: StatisticsRow) -> Result<StatisticsRecord, DbError> {
    let (id, link_id, ip, user_agent, referer, clicked_at) = row;
    Ok(StatisticsRecord {
        id: Some(id),
        link_id,
        ip,
        user_agent,
        referer,
        clicked_at: from_timestamp(clicked_at, "statistics.clicked_at")?,
    })
}

/// Repository for click statistics.
pub struct StatisticsRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> StatisticsRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn list(&self) -> Result<Vec<StatisticsRecord>, DbError> {
        let rows = sqlx::query_as::<_, StatisticsRow>(
            r#"
            SELECT id, link_id, ip, user_agent, referer, clicked_at
            FROM statistics
            ORDER BY id
            "#,
        )
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(into_record).collect()
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<StatisticsRecord>, DbError> {
        let row = sqlx::query_as::<_, StatisticsRow>(
            r#"
            SELECT id, link_id, ip, user_agent, referer, clicked_at
            FROM statistics
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(into_record).transpose()
    }

    /// Save a batch in a single transaction. Records without an id get one
    /// assigned; a record whose id already exists replaces that row.
    pub async fn insert_batch(&self, records: &[StatisticsRecord]) -> Result<u64, DbError> {
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0;

        for record in records {
            let result = sqlx::query(
                r#"
                INSERT INTO statistics (id, link_id, ip, user_agent, referer, clicked_at)
                VALUES (?, ?, ?, ?, ?, ?)
                ON CONFLICT(id) DO UPDATE SET
                    link_id = excluded.link_id,
                    ip = excluded.ip,
                    user_agent = excluded.user_agent,
                    referer = excluded.referer,
                    clicked_at = excluded.clicked_at
                "#,
            )
            .bind(record.id)
            .bind(record.link_id)
            .bind(&record.ip)
            .bind(&record.user_agent)
            .bind(&record.referer)
            .bind(to_timestamp(&record.clicked_at))
            .execute(&mut *tx)
            .await?;
            inserted += result.rows_affected();
        }

        tx.commit().await?;
        Ok(inserted)
    }
}

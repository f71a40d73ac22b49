//! Geo repository: where a click came from.

use super::DbError;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

/// Location resolved for one click.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoRecord {
    #[serde(default)]
    pub id: Option<i64>,
    pub lat: f64,
    pub lng: f64,
    pub click_id: i64,
    pub city: String,
    pub country: String,
}

type GeoRow = (i64, f64, f64, i64, String, String);

fn into_record((id, lat, lng, click_id, city, country): GeoRow) -> GeoRecord {
    GeoRecord {
        id: Some(id),
        lat,
        lng,
        click_id,
        city,
        country,
    }
}

/// Repository for geo rows.
pub struct GeoRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> GeoRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn list(&self) -> Result<Vec<GeoRecord>, DbError> {
        let rows = sqlx::query_as::<_, GeoRow>(
            r#"
            SELECT id, latitude, longitude, click_id, city, country
            FROM geo
            ORDER BY id
            "#,
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(into_record).collect())
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<GeoRecord>, DbError> {
        let row = sqlx::query_as::<_, GeoRow>(
            r#"
            SELECT id, latitude, longitude, click_id, city, country
            FROM geo
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(into_record))
    }

    /// Save a batch in a single transaction, replacing rows whose id already exists.
    pub async fn insert_batch(&self, records: &[GeoRecord]) -> Result<u64, DbError> {
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0;

        for record in records {
            let result = sqlx::query(
                r#"
                INSERT INTO geo (id, latitude, longitude, click_id, city, country)
                VALUES (?, ?, ?, ?, ?, ?)
                ON CONFLICT(id) DO UPDATE SET
                    latitude = excluded.latitude,
                    longitude = excluded.longitude,
                    click_id = excluded.click_id,
                    city = excluded.city,
                    country = excluded.country
                "#,
            )
            .bind(record.id)
            .bind(record.lat)
            .bind(record.lng)
            .bind(record.click_id)
            .bind(&record.city)
            .bind(&record.country)
            .execute(&mut *tx)
            .await?;
            inserted += result.rows_affected();
        }

        tx.commit().await?;
        Ok(inserted)
    }
}

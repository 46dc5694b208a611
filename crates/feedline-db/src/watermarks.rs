//! Queries on `materializer_watermarks`.

use chrono::{DateTime, Utc};
use feedline_types::{PostId, Watermark};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DbError;

/// Row name of the home timeline materializer's watermark.
pub const HOME_TIMELINE_WATERMARK: &str = "home_timeline";

/// Operations on the `materializer_watermarks` table.
pub struct WatermarkQueries<'a> {
    pool: &'a PgPool,
    name: &'a str,
}

impl<'a> WatermarkQueries<'a> {
    /// Bind to a connection pool and a named watermark.
    pub const fn new(pool: &'a PgPool, name: &'a str) -> Self {
        Self { pool, name }
    }

    /// Load the watermark, if one has been saved.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn load(&self) -> Result<Option<Watermark>, DbError> {
        let row = sqlx::query_as::<_, WatermarkRow>(
            r"SELECT created_at, post_id
              FROM materializer_watermarks
              WHERE name = $1",
        )
        .bind(self.name)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(|row| Watermark {
            created_at: row.created_at,
            post_id: PostId::from(row.post_id),
        }))
    }

    /// Save the watermark. An older value never overwrites a newer one.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the upsert fails.
    pub async fn save(&self, watermark: Watermark) -> Result<(), DbError> {
        sqlx::query(
            r"INSERT INTO materializer_watermarks (name, created_at, post_id)
              VALUES ($1, $2, $3)
              ON CONFLICT (name) DO UPDATE SET
                created_at = EXCLUDED.created_at,
                post_id = EXCLUDED.post_id,
                updated_at = now()
              WHERE (materializer_watermarks.created_at, materializer_watermarks.post_id)
                    < (EXCLUDED.created_at, EXCLUDED.post_id)",
        )
        .bind(self.name)
        .bind(watermark.created_at)
        .bind(watermark.post_id.into_inner())
        .execute(self.pool)
        .await?;
        Ok(())
    }
}

/// A row from the `materializer_watermarks` table.
#[derive(Debug, Clone, sqlx::FromRow)]
struct WatermarkRow {
    created_at: DateTime<Utc>,
    post_id: Uuid,
}

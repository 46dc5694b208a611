//! Queries on `home_timelines` and `timeline_entries`.
//!
//! `timeline_entries.seq` is a `BIGSERIAL`, so it strictly increases with
//! insertion order and pages are read by walking it downwards. The
//! `(owner_id, post_id)` unique constraint makes inserts idempotent.

use chrono::{DateTime, Utc};
use feedline_types::{PostId, TimelineEntry, UserId};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DbError;

/// Operations on the `home_timelines` and `timeline_entries` tables.
pub struct TimelineQueries<'a> {
    pool: &'a PgPool,
}

impl<'a> TimelineQueries<'a> {
    /// Bind to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Upsert the owner's provisioning record and touch `last_accessed_at`.
    /// Returns `true` when the record was created by this call.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the upsert fails.
    pub async fn provision(&self, owner: UserId) -> Result<bool, DbError> {
        // xmax is zero only for a freshly inserted tuple.
        let created = sqlx::query_scalar::<_, bool>(
            r"INSERT INTO home_timelines (owner_id)
              VALUES ($1)
              ON CONFLICT (owner_id) DO UPDATE SET last_accessed_at = now()
              RETURNING (xmax = 0)",
        )
        .bind(owner.into_inner())
        .fetch_one(self.pool)
        .await?;
        Ok(created)
    }

    /// Insert `(owner, post)` unless it already exists. Returns `true` if a
    /// row was written.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the insert fails, including a
    /// foreign key violation for an unknown post or owner.
    pub async fn insert_entry(&self, owner: UserId, post: PostId) -> Result<bool, DbError> {
        let result = sqlx::query(
            r"INSERT INTO timeline_entries (owner_id, post_id)
              VALUES ($1, $2)
              ON CONFLICT (owner_id, post_id) DO NOTHING",
        )
        .bind(owner.into_inner())
        .bind(post.into_inner())
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Sequence number of `(owner, post)`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn entry_seq(&self, owner: UserId, post: PostId) -> Result<Option<i64>, DbError> {
        let seq = sqlx::query_scalar::<_, i64>(
            r"SELECT seq FROM timeline_entries
              WHERE owner_id = $1 AND post_id = $2",
        )
        .bind(owner.into_inner())
        .bind(post.into_inner())
        .fetch_optional(self.pool)
        .await?;
        Ok(seq)
    }

    /// Up to `limit` entries, newest first, below `before_seq` if given.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn page(
        &self,
        owner: UserId,
        before_seq: Option<i64>,
        limit: usize,
    ) -> Result<Vec<TimelineEntry>, DbError> {
        let limit_i64 = i64::try_from(limit).unwrap_or(i64::MAX);

        let rows = sqlx::query_as::<_, EntryRow>(
            r"SELECT seq, owner_id, post_id, inserted_at
              FROM timeline_entries
              WHERE owner_id = $1 AND ($2::bigint IS NULL OR seq < $2)
              ORDER BY seq DESC
              LIMIT $3",
        )
        .bind(owner.into_inner())
        .bind(before_seq)
        .bind(limit_i64)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(TimelineEntry::from).collect())
    }
}

/// A row from the `timeline_entries` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EntryRow {
    /// Insertion sequence.
    pub seq: i64,
    /// Timeline owner.
    pub owner_id: Uuid,
    /// Referenced post.
    pub post_id: Uuid,
    /// When the entry was written.
    pub inserted_at: DateTime<Utc>,
}

impl From<EntryRow> for TimelineEntry {
    fn from(row: EntryRow) -> Self {
        Self {
            owner_id: UserId::from(row.owner_id),
            post_id: PostId::from(row.post_id),
            seq: row.seq,
            inserted_at: row.inserted_at,
        }
    }
}

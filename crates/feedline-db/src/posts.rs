//! Queries on the append-only `posts` table.
//!
//! `created_at` is assigned by the database with `clock_timestamp()` when
//! the row is built, which can precede its commit. The stream is read in
//! `(created_at, id)` order, which both stream indexes cover; readers judge
//! post age with [`PostQueries::now`] so both sides use the database clock.

use chrono::{DateTime, Utc};
use feedline_types::{Post, PostId, UserId, Watermark};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DbError;

/// Operations on the `posts` table.
pub struct PostQueries<'a> {
    pool: &'a PgPool,
}

impl<'a> PostQueries<'a> {
    /// Bind to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Append a post and return it as stored.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the insert fails (e.g. an unknown
    /// author).
    pub async fn create_post(
        &self,
        author: UserId,
        content: &str,
        tags: &[String],
    ) -> Result<Post, DbError> {
        let row = sqlx::query_as::<_, PostRow>(
            r"INSERT INTO posts (id, author_id, content, tags)
              VALUES ($1, $2, $3, $4)
              RETURNING id, author_id, content, tags, created_at",
        )
        .bind(PostId::new().into_inner())
        .bind(author.into_inner())
        .bind(content)
        .bind(tags)
        .fetch_one(self.pool)
        .await?;
        Ok(row.into())
    }

    /// Posts strictly after `since`, oldest first, optionally narrowed to
    /// one author.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn posts_since(
        &self,
        author: Option<UserId>,
        since: Option<Watermark>,
        limit: usize,
    ) -> Result<Vec<Post>, DbError> {
        let limit_i64 = i64::try_from(limit).unwrap_or(i64::MAX);

        let rows = sqlx::query_as::<_, PostRow>(
            r"SELECT id, author_id, content, tags, created_at
              FROM posts
              WHERE ($1::uuid IS NULL OR author_id = $1)
                AND ($2::timestamptz IS NULL OR (created_at, id) > ($2, $3::uuid))
              ORDER BY created_at, id
              LIMIT $4",
        )
        .bind(author.map(UserId::into_inner))
        .bind(since.map(|mark| mark.created_at))
        .bind(since.map(|mark| mark.post_id.into_inner()))
        .bind(limit_i64)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Post::from).collect())
    }

    /// The database clock that stamps `created_at`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn now(&self) -> Result<DateTime<Utc>, DbError> {
        let now = sqlx::query_scalar::<_, DateTime<Utc>>("SELECT clock_timestamp()")
            .fetch_one(self.pool)
            .await?;
        Ok(now)
    }

    /// Fetch posts by id. Unknown ids are omitted; order is unspecified.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn posts_by_ids(&self, ids: &[PostId]) -> Result<Vec<Post>, DbError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Uuid> = ids.iter().map(|id| id.into_inner()).collect();

        let rows = sqlx::query_as::<_, PostRow>(
            r"SELECT id, author_id, content, tags, created_at
              FROM posts
              WHERE id = ANY($1)",
        )
        .bind(&ids)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Post::from).collect())
    }
}

/// A row from the `posts` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PostRow {
    /// Post id.
    pub id: Uuid,
    /// Author id.
    pub author_id: Uuid,
    /// Body text.
    pub content: String,
    /// Tags.
    pub tags: Vec<String>,
    /// Database-assigned creation time.
    pub created_at: DateTime<Utc>,
}

impl From<PostRow> for Post {
    fn from(row: PostRow) -> Self {
        Self {
            id: PostId::from(row.id),
            author_id: UserId::from(row.author_id),
            content: row.content,
            tags: row.tags,
            created_at: row.created_at,
        }
    }
}

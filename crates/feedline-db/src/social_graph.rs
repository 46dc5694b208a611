//! Queries on `following_relationships`.
//!
//! The composite primary key makes edges a set: inserting an existing edge
//! is a no-op and deleting a missing one affects zero rows.

use feedline_types::{FollowEdge, UserId};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DbError;

/// Operations on the `following_relationships` table.
pub struct FollowQueries<'a> {
    pool: &'a PgPool,
}

impl<'a> FollowQueries<'a> {
    /// Bind to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert an edge. Returns `false` if it already existed.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the insert fails, including the
    /// check constraint rejecting a self edge.
    pub async fn add_edge(&self, edge: FollowEdge) -> Result<bool, DbError> {
        let result = sqlx::query(
            r"INSERT INTO following_relationships (follower_id, followee_id)
              VALUES ($1, $2)
              ON CONFLICT (follower_id, followee_id) DO NOTHING",
        )
        .bind(edge.follower_id.into_inner())
        .bind(edge.followee_id.into_inner())
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete an edge. Returns `false` if it did not exist.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the delete fails.
    pub async fn remove_edge(&self, edge: FollowEdge) -> Result<bool, DbError> {
        let result = sqlx::query(
            r"DELETE FROM following_relationships
              WHERE follower_id = $1 AND followee_id = $2",
        )
        .bind(edge.follower_id.into_inner())
        .bind(edge.followee_id.into_inner())
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Whether the edge exists.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn edge_exists(&self, edge: FollowEdge) -> Result<bool, DbError> {
        let exists = sqlx::query_scalar::<_, bool>(
            r"SELECT EXISTS (
                SELECT 1 FROM following_relationships
                WHERE follower_id = $1 AND followee_id = $2
              )",
        )
        .bind(edge.follower_id.into_inner())
        .bind(edge.followee_id.into_inner())
        .fetch_one(self.pool)
        .await?;
        Ok(exists)
    }

    /// Everyone following `user`, read in a single statement.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn followers_of(&self, user: UserId) -> Result<Vec<UserId>, DbError> {
        let rows = sqlx::query_scalar::<_, Uuid>(
            r"SELECT follower_id
              FROM following_relationships
              WHERE followee_id = $1
              ORDER BY follower_id",
        )
        .bind(user.into_inner())
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(UserId::from).collect())
    }
}

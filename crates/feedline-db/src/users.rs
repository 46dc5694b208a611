//! Queries on `hub_users` and `hub_sessions`.
//!
//! Accounts and sessions are owned by the hub's user lifecycle and
//! authentication services. This service only reads them; the insert
//! helpers exist for seeding and integration tests.

use chrono::{DateTime, Utc};
use feedline_types::{Handle, User, UserId, UserState};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DbError;

/// Operations on the `hub_users` and `hub_sessions` tables.
pub struct UserQueries<'a> {
    pool: &'a PgPool,
}

impl<'a> UserQueries<'a> {
    /// Bind to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Look up a user by handle.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the query fails or the row is invalid.
    pub async fn find_by_handle(&self, handle: &Handle) -> Result<Option<User>, DbError> {
        let row = sqlx::query_as::<_, UserRow>(
            r"SELECT id, handle, full_name, state
              FROM hub_users
              WHERE handle = $1",
        )
        .bind(handle.as_str())
        .fetch_optional(self.pool)
        .await?;

        row.map(UserRow::into_user).transpose()
    }

    /// Fetch users by id. Unknown ids are omitted.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the query fails or a row is invalid.
    pub async fn users_by_ids(&self, ids: &[UserId]) -> Result<Vec<User>, DbError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Uuid> = ids.iter().map(|id| id.into_inner()).collect();

        let rows = sqlx::query_as::<_, UserRow>(
            r"SELECT id, handle, full_name, state
              FROM hub_users
              WHERE id = ANY($1)",
        )
        .bind(&ids)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(UserRow::into_user).collect()
    }

    /// Resolve an unexpired session token to its user.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn resolve_session(&self, token: &str) -> Result<Option<UserId>, DbError> {
        let user_id = sqlx::query_scalar::<_, Uuid>(
            r"SELECT user_id
              FROM hub_sessions
              WHERE token = $1 AND expires_at > now()",
        )
        .bind(token)
        .fetch_optional(self.pool)
        .await?;

        Ok(user_id.map(UserId::from))
    }

    /// Insert an active user.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the insert fails (e.g. a duplicate
    /// handle).
    pub async fn insert_user(&self, handle: &str, full_name: &str) -> Result<User, DbError> {
        let user = User {
            id: UserId::new(),
            handle: Handle::new(handle),
            full_name: full_name.to_owned(),
            state: UserState::Active,
        };

        sqlx::query(
            r"INSERT INTO hub_users (id, handle, full_name, state)
              VALUES ($1, $2, $3, $4)",
        )
        .bind(user.id.into_inner())
        .bind(user.handle.as_str())
        .bind(&user.full_name)
        .bind(user.state.as_db_str())
        .execute(self.pool)
        .await?;

        Ok(user)
    }

    /// Change a user's lifecycle state. Returns `false` for unknown users.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the update fails.
    pub async fn set_user_state(&self, id: UserId, state: UserState) -> Result<bool, DbError> {
        let result = sqlx::query(r"UPDATE hub_users SET state = $2 WHERE id = $1")
            .bind(id.into_inner())
            .bind(state.as_db_str())
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Issue a session token for `user` valid until `expires_at`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the insert fails.
    pub async fn issue_session(
        &self,
        user: UserId,
        expires_at: DateTime<Utc>,
    ) -> Result<String, DbError> {
        let token = Uuid::new_v4().simple().to_string();
        sqlx::query(
            r"INSERT INTO hub_sessions (token, user_id, expires_at)
              VALUES ($1, $2, $3)",
        )
        .bind(&token)
        .bind(user.into_inner())
        .bind(expires_at)
        .execute(self.pool)
        .await?;
        Ok(token)
    }
}

/// A row from the `hub_users` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRow {
    /// User id.
    pub id: Uuid,
    /// Public handle.
    pub handle: String,
    /// Display name.
    pub full_name: String,
    /// Lifecycle state as stored.
    pub state: String,
}

impl UserRow {
    /// Convert into the domain type.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::InvalidRow`] for an unknown lifecycle state.
    pub fn into_user(self) -> Result<User, DbError> {
        let state = UserState::from_db_str(&self.state).ok_or_else(|| {
            DbError::InvalidRow(format!("user {} has unknown state {}", self.id, self.state))
        })?;
        Ok(User {
            id: UserId::from(self.id),
            handle: Handle::new(self.handle),
            full_name: self.full_name,
            state,
        })
    }
}

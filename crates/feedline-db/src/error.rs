//! Error types for the data layer.
//!
//! Queries return [`DbError`]. At the store-trait boundary it is folded
//! into [`StoreError`]: connection, pool and I/O problems become
//! [`StoreError::Unavailable`], undecodable rows and integrity violations
//! become [`StoreError::Corrupt`].

use feedline_core::StoreError;

/// Errors that can occur in the data layer.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A `PostgreSQL` operation failed.
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    /// A `PostgreSQL` migration failed.
    #[error("PostgreSQL migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A row decoded but holds a value the domain does not accept.
    #[error("invalid row: {0}")]
    InvalidRow(String),

    /// A configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl DbError {
    /// Whether retrying the same operation would fail the same way.
    pub fn is_permanent(&self) -> bool {
        match self {
            Self::Postgres(err) => is_permanent_sqlx(err),
            Self::InvalidRow(_) => true,
            Self::Migration(_) | Self::Config(_) => false,
        }
    }
}

/// Decode failures and SQLSTATE class 23 (integrity constraint violation).
fn is_permanent_sqlx(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Decode(_)
        | sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnIndexOutOfBounds { .. }
        | sqlx::Error::TypeNotFound { .. } => true,
        sqlx::Error::Database(db) => db.code().is_some_and(|code| code.starts_with("23")),
        _ => false,
    }
}

impl From<DbError> for StoreError {
    fn from(err: DbError) -> Self {
        if err.is_permanent() {
            Self::Corrupt(err.to_string())
        } else {
            Self::Unavailable(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_errors_are_transient() {
        let err: StoreError = DbError::Postgres(sqlx::Error::PoolTimedOut).into();
        assert!(err.is_transient());

        let err: StoreError = DbError::Postgres(sqlx::Error::PoolClosed).into();
        assert!(err.is_transient());
    }

    #[test]
    fn bad_rows_are_corrupt() {
        let err: StoreError = DbError::InvalidRow("state 'zombie'".to_owned()).into();
        assert!(matches!(err, StoreError::Corrupt(_)));

        let err: StoreError =
            DbError::Postgres(sqlx::Error::ColumnNotFound("handle".to_owned())).into();
        assert!(matches!(err, StoreError::Corrupt(_)));
    }
}

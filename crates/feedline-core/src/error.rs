//! Error types shared by the stores and the timeline services.
//!
//! [`StoreError`] is what a storage backend reports. [`FeedError`] is the
//! caller-facing taxonomy surfaced by the follow and timeline operations;
//! the HTTP layer maps each variant to a status code.

/// Failures reported by a storage backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The store could not be reached or timed out. Retrying may succeed.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Stored data could not be decoded or violates an integrity rule.
    /// Retrying the same operation will fail the same way.
    #[error("corrupt data: {0}")]
    Corrupt(String),
}

impl StoreError {
    /// Whether the failure is worth retrying on a later cycle.
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// Errors surfaced synchronously to callers of the follow and timeline
/// operations.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    /// The caller has no valid identity.
    #[error("unauthorized")]
    Unauthorized,

    /// Malformed input (e.g. an empty handle or an out-of-range limit).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The referenced account does not exist, cannot be followed, or the
    /// operation is semantically invalid for it (unfollowing yourself).
    #[error("not found: {0}")]
    NotFound(String),

    /// A syntactically valid request that cannot be resumed, such as an
    /// unknown pagination key.
    #[error("unprocessable: {0}")]
    UnprocessableEntity(String),

    /// The underlying store failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

//! Storage contracts consumed by the timeline services.
//!
//! Each trait covers one component of the system: the user directory and
//! sessions (collaborators), the social graph, the append-only post store,
//! the per-owner timeline store, and the materializer's watermark. Two
//! backends implement all of them: [`InMemoryStore`] and the `PostgreSQL`
//! store in `feedline-db`.
//!
//! Methods return `impl Future + Send` so the services can be driven from
//! spawned Tokio tasks.
//!
//! [`InMemoryStore`]: crate::memory::InMemoryStore

use std::future::Future;

use chrono::{DateTime, Utc};
use feedline_types::{FollowEdge, Handle, Post, PostId, TimelineEntry, User, UserId, Watermark};

use crate::error::StoreError;

/// Read access to hub user accounts.
pub trait UserDirectory: Send + Sync {
    /// Look up a user by handle, in any lifecycle state.
    fn find_by_handle(
        &self,
        handle: &Handle,
    ) -> impl Future<Output = Result<Option<User>, StoreError>> + Send;

    /// Fetch the users with the given ids. Unknown ids are omitted.
    fn users_by_ids(
        &self,
        ids: &[UserId],
    ) -> impl Future<Output = Result<Vec<User>, StoreError>> + Send;
}

/// Resolves bearer tokens issued by the authentication collaborator.
pub trait SessionStore: Send + Sync {
    /// Return the user owning `token`, or `None` if it is unknown or expired.
    fn resolve_session(
        &self,
        token: &str,
    ) -> impl Future<Output = Result<Option<UserId>, StoreError>> + Send;
}

/// Directed follow edges.
pub trait SocialGraphStore: Send + Sync {
    /// Insert an edge. Returns `false` if it already existed.
    fn add_edge(&self, edge: FollowEdge) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Delete an edge. Returns `false` if it did not exist.
    fn remove_edge(
        &self,
        edge: FollowEdge,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Whether the edge exists right now.
    fn edge_exists(
        &self,
        edge: FollowEdge,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Point-in-time snapshot of everyone following `user`.
    fn followers_of(
        &self,
        user: UserId,
    ) -> impl Future<Output = Result<Vec<UserId>, StoreError>> + Send;
}

/// Append-only storage of authored posts.
pub trait PostStore: Send + Sync {
    /// Persist a new post and return it with its id and creation time.
    fn create_post(
        &self,
        author: UserId,
        content: String,
        tags: Vec<String>,
    ) -> impl Future<Output = Result<Post, StoreError>> + Send;

    /// Posts strictly after `since` in `(created_at, id)` order, oldest
    /// first, at most `limit` of them. `author` narrows the scan to a
    /// single author; `None` scans the global stream.
    fn posts_since(
        &self,
        author: Option<UserId>,
        since: Option<Watermark>,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<Post>, StoreError>> + Send;

    /// Fetch posts by id. Unknown ids are omitted.
    fn posts_by_ids(
        &self,
        ids: &[PostId],
    ) -> impl Future<Output = Result<Vec<Post>, StoreError>> + Send;

    /// Current time on the clock that stamps `created_at`. Post age is
    /// measured against it, never against the caller's clock.
    fn stream_now(&self) -> impl Future<Output = Result<DateTime<Utc>, StoreError>> + Send;
}

/// Per-owner materialized timelines.
pub trait TimelineStore: Send + Sync {
    /// Create the owner's timeline record if missing and mark it accessed.
    /// Returns `true` when this call created it.
    fn provision_timeline(
        &self,
        owner: UserId,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Idempotent upsert of `(owner, post)`. Returns `false` when the entry
    /// already existed; a duplicate is not an error.
    fn insert_entry(
        &self,
        owner: UserId,
        post: PostId,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Insertion sequence of `(owner, post)`, if that entry exists.
    fn entry_seq(
        &self,
        owner: UserId,
        post: PostId,
    ) -> impl Future<Output = Result<Option<i64>, StoreError>> + Send;

    /// Up to `limit` of the owner's entries, newest first, strictly older
    /// than `before_seq` when given.
    fn timeline_page(
        &self,
        owner: UserId,
        before_seq: Option<i64>,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<TimelineEntry>, StoreError>> + Send;
}

/// Persisted progress of the materializer.
pub trait WatermarkStore: Send + Sync {
    /// The last fully materialized position, if any.
    fn load_watermark(&self) -> impl Future<Output = Result<Option<Watermark>, StoreError>> + Send;

    /// Record that everything up to and including `watermark` is done.
    fn save_watermark(
        &self,
        watermark: Watermark,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// Everything the services need from one backend.
pub trait FeedStore:
    UserDirectory
    + SessionStore
    + SocialGraphStore
    + PostStore
    + TimelineStore
    + WatermarkStore
    + Clone
    + 'static
{
}

impl<T> FeedStore for T where
    T: UserDirectory
        + SessionStore
        + SocialGraphStore
        + PostStore
        + TimelineStore
        + WatermarkStore
        + Clone
        + 'static
{
}

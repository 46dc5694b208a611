//! [`PgFeedStore`]: the `PostgreSQL` implementation of every store trait.

use chrono::{DateTime, Utc};
use feedline_core::StoreError;
use feedline_core::store::{
    PostStore, SessionStore, SocialGraphStore, TimelineStore, UserDirectory, WatermarkStore,
};
use feedline_types::{FollowEdge, Handle, Post, PostId, TimelineEntry, User, UserId, Watermark};
use sqlx::PgPool;

use crate::posts::PostQueries;
use crate::social_graph::FollowQueries;
use crate::timelines::TimelineQueries;
use crate::users::UserQueries;
use crate::watermarks::{HOME_TIMELINE_WATERMARK, WatermarkQueries};

/// Feed store over a shared connection pool. Cheap to clone.
#[derive(Clone)]
pub struct PgFeedStore {
    pool: PgPool,
}

impl core::fmt::Debug for PgFeedStore {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PgFeedStore").finish_non_exhaustive()
    }
}

impl PgFeedStore {
    /// Wrap a pool.
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Account and session queries, for seeding.
    pub const fn users(&self) -> UserQueries<'_> {
        UserQueries::new(&self.pool)
    }
}

impl UserDirectory for PgFeedStore {
    async fn find_by_handle(&self, handle: &Handle) -> Result<Option<User>, StoreError> {
        Ok(self.users().find_by_handle(handle).await?)
    }

    async fn users_by_ids(&self, ids: &[UserId]) -> Result<Vec<User>, StoreError> {
        Ok(self.users().users_by_ids(ids).await?)
    }
}

impl SessionStore for PgFeedStore {
    async fn resolve_session(&self, token: &str) -> Result<Option<UserId>, StoreError> {
        Ok(self.users().resolve_session(token).await?)
    }
}

impl SocialGraphStore for PgFeedStore {
    async fn add_edge(&self, edge: FollowEdge) -> Result<bool, StoreError> {
        Ok(FollowQueries::new(&self.pool).add_edge(edge).await?)
    }

    async fn remove_edge(&self, edge: FollowEdge) -> Result<bool, StoreError> {
        Ok(FollowQueries::new(&self.pool).remove_edge(edge).await?)
    }

    async fn edge_exists(&self, edge: FollowEdge) -> Result<bool, StoreError> {
        Ok(FollowQueries::new(&self.pool).edge_exists(edge).await?)
    }

    async fn followers_of(&self, user: UserId) -> Result<Vec<UserId>, StoreError> {
        Ok(FollowQueries::new(&self.pool).followers_of(user).await?)
    }
}

impl PostStore for PgFeedStore {
    async fn create_post(
        &self,
        author: UserId,
        content: String,
        tags: Vec<String>,
    ) -> Result<Post, StoreError> {
        Ok(PostQueries::new(&self.pool)
            .create_post(author, &content, &tags)
            .await?)
    }

    async fn posts_since(
        &self,
        author: Option<UserId>,
        since: Option<Watermark>,
        limit: usize,
    ) -> Result<Vec<Post>, StoreError> {
        Ok(PostQueries::new(&self.pool)
            .posts_since(author, since, limit)
            .await?)
    }

    async fn posts_by_ids(&self, ids: &[PostId]) -> Result<Vec<Post>, StoreError> {
        Ok(PostQueries::new(&self.pool).posts_by_ids(ids).await?)
    }

    async fn stream_now(&self) -> Result<DateTime<Utc>, StoreError> {
        Ok(PostQueries::new(&self.pool).now().await?)
    }
}

impl TimelineStore for PgFeedStore {
    async fn provision_timeline(&self, owner: UserId) -> Result<bool, StoreError> {
        Ok(TimelineQueries::new(&self.pool).provision(owner).await?)
    }

    async fn insert_entry(&self, owner: UserId, post: PostId) -> Result<bool, StoreError> {
        Ok(TimelineQueries::new(&self.pool)
            .insert_entry(owner, post)
            .await?)
    }

    async fn entry_seq(&self, owner: UserId, post: PostId) -> Result<Option<i64>, StoreError> {
        Ok(TimelineQueries::new(&self.pool).entry_seq(owner, post).await?)
    }

    async fn timeline_page(
        &self,
        owner: UserId,
        before_seq: Option<i64>,
        limit: usize,
    ) -> Result<Vec<TimelineEntry>, StoreError> {
        Ok(TimelineQueries::new(&self.pool)
            .page(owner, before_seq, limit)
            .await?)
    }
}

impl WatermarkStore for PgFeedStore {
    async fn load_watermark(&self) -> Result<Option<Watermark>, StoreError> {
        Ok(WatermarkQueries::new(&self.pool, HOME_TIMELINE_WATERMARK)
            .load()
            .await?)
    }

    async fn save_watermark(&self, watermark: Watermark) -> Result<(), StoreError> {
        Ok(WatermarkQueries::new(&self.pool, HOME_TIMELINE_WATERMARK)
            .save(watermark)
            .await?)
    }
}

//! Home timeline reads.
//!
//! The read path never fans out: it only looks at entries the materializer
//! has already written. A timeline that has never been read is provisioned
//! on first access, so a brand new user gets an empty page, not an error.
//!
//! # Pagination
//!
//! Pages are ordered newest first by insertion sequence. The pagination
//! key is the id of the last post on the page. Resuming looks up that
//! entry's sequence and continues strictly below it, so entries inserted
//! after the key was issued never show up on later pages and nothing
//! older is skipped.

use std::collections::HashMap;

use feedline_types::{MyHomeTimeline, PostId, TimelineEntry, TimelinePost, UserId};
use tracing::{debug, info, warn};

use crate::config::TimelineConfig;
use crate::error::FeedError;
use crate::store::FeedStore;

/// Serves cursor-paginated pages of a user's own home timeline.
#[derive(Debug, Clone)]
pub struct TimelineReader<S> {
    store: S,
    limits: TimelineConfig,
}

impl<S: FeedStore> TimelineReader<S> {
    /// Create a reader with the given page-size limits.
    pub const fn new(store: S, limits: TimelineConfig) -> Self {
        Self { store, limits }
    }

    /// Return up to `limit` posts from `user`'s home timeline, starting
    /// strictly after `pagination_key` when one is given.
    ///
    /// # Errors
    ///
    /// - [`FeedError::BadRequest`] if `limit` is outside `1..=max_limit`.
    /// - [`FeedError::UnprocessableEntity`] if `pagination_key` does not
    ///   name an entry of this timeline.
    /// - [`FeedError::Store`] if the store fails.
    pub async fn get_my_home_timeline(
        &self,
        user: UserId,
        pagination_key: Option<&str>,
        limit: Option<u32>,
    ) -> Result<MyHomeTimeline, FeedError> {
        let limit = self.resolve_limit(limit)?;

        if self.store.provision_timeline(user).await? {
            info!(%user, "provisioned home timeline");
        }

        let before_seq = match pagination_key.map(str::trim).filter(|key| !key.is_empty()) {
            Some(key) => Some(self.resolve_cursor(user, key).await?),
            None => None,
        };

        let mut entries = self
            .store
            .timeline_page(user, before_seq, limit.saturating_add(1))
            .await?;
        let has_more = entries.len() > limit;
        entries.truncate(limit);

        let pagination_key = match entries.last() {
            Some(last) if has_more => last.post_id.to_string(),
            _ => String::new(),
        };
        let posts = self.hydrate(&entries).await?;

        debug!(%user, count = posts.len(), has_more, "served home timeline page");
        Ok(MyHomeTimeline {
            posts,
            pagination_key,
        })
    }

    fn resolve_limit(&self, limit: Option<u32>) -> Result<usize, FeedError> {
        let limit = limit.unwrap_or(self.limits.default_limit);
        if limit == 0 || limit > self.limits.max_limit {
            return Err(FeedError::BadRequest(format!(
                "limit must be between 1 and {}",
                self.limits.max_limit
            )));
        }
        usize::try_from(limit).map_err(|_err| FeedError::BadRequest("limit too large".to_owned()))
    }

    /// Map a pagination key to the sequence number it stands for.
    async fn resolve_cursor(&self, user: UserId, key: &str) -> Result<i64, FeedError> {
        let unusable = || FeedError::UnprocessableEntity(format!("invalid pagination key {key}"));
        let post: PostId = key.parse().map_err(|_err| unusable())?;
        self.store
            .entry_seq(user, post)
            .await?
            .ok_or_else(unusable)
    }

    /// Join entries with post content and author details, keeping entry order.
    async fn hydrate(&self, entries: &[TimelineEntry]) -> Result<Vec<TimelinePost>, FeedError> {
        if entries.is_empty() {
            return Ok(Vec::new());
        }

        let post_ids: Vec<PostId> = entries.iter().map(|entry| entry.post_id).collect();
        let posts: HashMap<PostId, _> = self
            .store
            .posts_by_ids(&post_ids)
            .await?
            .into_iter()
            .map(|post| (post.id, post))
            .collect();

        let mut author_ids: Vec<UserId> = posts.values().map(|post| post.author_id).collect();
        author_ids.sort_unstable();
        author_ids.dedup();
        let authors: HashMap<UserId, _> = self
            .store
            .users_by_ids(&author_ids)
            .await?
            .into_iter()
            .map(|user| (user.id, user))
            .collect();

        let mut hydrated = Vec::with_capacity(entries.len());
        for entry in entries {
            let Some(post) = posts.get(&entry.post_id) else {
                warn!(post_id = %entry.post_id, owner = %entry.owner_id, "timeline entry without post");
                continue;
            };
            let Some(author) = authors.get(&post.author_id) else {
                warn!(post_id = %post.id, author = %post.author_id, "timeline post without author");
                continue;
            };
            hydrated.push(TimelinePost {
                id: post.id,
                content: post.content.clone(),
                tags: post.tags.clone(),
                author_handle: author.handle.clone(),
                author_name: author.full_name.clone(),
                created_at: post.created_at,
            });
        }
        Ok(hydrated)
    }
}

//! Authoring posts.
//!
//! Publishing only appends to the post store. Nothing is written to any
//! timeline here; followers see the post once the materializer has run.

use feedline_types::{Post, UserId};
use tracing::info;

use crate::error::FeedError;
use crate::store::FeedStore;

/// Longest accepted post body, in characters.
pub const MAX_CONTENT_CHARS: usize = 4096;

/// Most tags a post may carry.
pub const MAX_TAGS: usize = 3;

/// Appends posts on behalf of authenticated authors.
#[derive(Debug, Clone)]
pub struct PostPublisher<S> {
    store: S,
}

impl<S: FeedStore> PostPublisher<S> {
    /// Wrap a store.
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// Publish a post by `author`.
    ///
    /// Tags are trimmed, lowercased and deduplicated in order of first
    /// appearance.
    ///
    /// # Errors
    ///
    /// [`FeedError::BadRequest`] if the content is blank or too long, or if
    /// there are too many or empty tags.
    pub async fn publish(
        &self,
        author: UserId,
        content: String,
        tags: Vec<String>,
    ) -> Result<Post, FeedError> {
        if content.trim().is_empty() {
            return Err(FeedError::BadRequest("content must not be empty".to_owned()));
        }
        if content.chars().count() > MAX_CONTENT_CHARS {
            return Err(FeedError::BadRequest(format!(
                "content must be at most {MAX_CONTENT_CHARS} characters"
            )));
        }
        let tags = normalize_tags(tags)?;

        let post = self.store.create_post(author, content, tags).await?;
        info!(post_id = %post.id, %author, tags = post.tags.len(), "post published");
        Ok(post)
    }
}

fn normalize_tags(tags: Vec<String>) -> Result<Vec<String>, FeedError> {
    let mut normalized: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim().to_lowercase();
        if tag.is_empty() {
            return Err(FeedError::BadRequest("tags must not be empty".to_owned()));
        }
        if !normalized.contains(&tag) {
            normalized.push(tag);
        }
    }
    if normalized.len() > MAX_TAGS {
        return Err(FeedError::BadRequest(format!(
            "a post may carry at most {MAX_TAGS} tags"
        )));
    }
    Ok(normalized)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]
mod tests {
    use super::*;
    use crate::memory::InMemoryStore;
    use crate::store::PostStore;

    #[tokio::test]
    async fn publish_appends_to_stream() {
        let store = InMemoryStore::new();
        let a = store.insert_user("a", "A").await;
        let publisher = PostPublisher::new(store.clone());

        let post = publisher
            .publish(a.id, "hello".into(), vec![" Rust ".into(), "rust".into()])
            .await
            .unwrap();
        assert_eq!(post.tags, vec!["rust".to_owned()]);

        let stream = store.posts_since(None, None, 10).await.unwrap();
        assert_eq!(stream.len(), 1);
        assert_eq!(stream.first().map(|p| p.id), Some(post.id));
        assert_eq!(store.entry_count(a.id).await, 0);
    }

    #[tokio::test]
    async fn rejects_bad_content_and_tags() {
        let store = InMemoryStore::new();
        let a = store.insert_user("a", "A").await;
        let publisher = PostPublisher::new(store);

        for (content, tags) in [
            ("   ", vec![]),
            ("ok", vec![String::new()]),
            ("ok", vec!["a".into(), "b".into(), "c".into(), "d".into()]),
        ] {
            let result = publisher.publish(a.id, content.into(), tags).await;
            assert!(matches!(result, Err(FeedError::BadRequest(_))));
        }

        let long = "x".repeat(MAX_CONTENT_CHARS + 1);
        assert!(matches!(
            publisher.publish(a.id, long, vec![]).await,
            Err(FeedError::BadRequest(_))
        ));
    }
}

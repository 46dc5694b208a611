//! Follow / unfollow / follow-status operations.
//!
//! Targets are addressed by handle, the caller by an already-authenticated
//! [`UserId`]. Repeating an operation never produces a conflict: following
//! twice or unfollowing a stranger both succeed. Only genuinely invalid
//! targets are errors.
//!
//! | Case | Follow | Unfollow | Status |
//! |------|--------|----------|--------|
//! | empty handle | `BadRequest` | `BadRequest` | `BadRequest` |
//! | unknown handle | `NotFound` | `NotFound` | `NotFound` |
//! | disabled / deleted target | `NotFound` | ok | `can_follow = false` |
//! | self | ok, no edge | `NotFound` | following, cannot follow |

use feedline_types::{FollowEdge, FollowStatus, Handle, User, UserId};
use tracing::{debug, info};

use crate::error::FeedError;
use crate::store::FeedStore;

/// Social graph operations over a [`FeedStore`].
#[derive(Debug, Clone)]
pub struct SocialGraph<S> {
    store: S,
}

impl<S: FeedStore> SocialGraph<S> {
    /// Wrap a store.
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// Start following `handle`.
    ///
    /// # Errors
    ///
    /// [`FeedError::BadRequest`] for an empty handle, [`FeedError::NotFound`]
    /// when the target does not exist or cannot be followed.
    pub async fn follow(&self, follower: UserId, handle: &Handle) -> Result<(), FeedError> {
        let target = self.resolve(handle).await?;
        if !target.is_followable() {
            debug!(%handle, state = ?target.state, "follow target is not followable");
            return Err(FeedError::NotFound(format!("no followable user {handle}")));
        }
        if target.id == follower {
            debug!(%follower, "ignoring self-follow");
            return Ok(());
        }

        let created = self
            .store
            .add_edge(FollowEdge {
                follower_id: follower,
                followee_id: target.id,
            })
            .await?;
        info!(%follower, followee = %target.id, created, "follow");
        Ok(())
    }

    /// Stop following `handle`. Succeeds whether or not an edge existed.
    ///
    /// # Errors
    ///
    /// [`FeedError::BadRequest`] for an empty handle, [`FeedError::NotFound`]
    /// for an unknown handle or for the caller's own handle.
    pub async fn unfollow(&self, follower: UserId, handle: &Handle) -> Result<(), FeedError> {
        let target = self.resolve(handle).await?;
        if target.id == follower {
            return Err(FeedError::NotFound("cannot unfollow yourself".to_owned()));
        }

        let removed = self
            .store
            .remove_edge(FollowEdge {
                follower_id: follower,
                followee_id: target.id,
            })
            .await?;
        info!(%follower, followee = %target.id, removed, "unfollow");
        Ok(())
    }

    /// Describe the relationship between `observer` and `handle`.
    ///
    /// # Errors
    ///
    /// [`FeedError::BadRequest`] for an empty handle, [`FeedError::NotFound`]
    /// for an unknown handle.
    pub async fn follow_status(
        &self,
        observer: UserId,
        handle: &Handle,
    ) -> Result<FollowStatus, FeedError> {
        let target = self.resolve(handle).await?;
        if target.id == observer {
            return Ok(FollowStatus {
                is_following: true,
                is_blocked: false,
                can_follow: false,
            });
        }

        let is_following = self
            .store
            .edge_exists(FollowEdge {
                follower_id: observer,
                followee_id: target.id,
            })
            .await?;

        Ok(FollowStatus {
            is_following,
            is_blocked: false,
            can_follow: target.is_followable(),
        })
    }

    async fn resolve(&self, handle: &Handle) -> Result<User, FeedError> {
        if handle.as_str().trim().is_empty() {
            return Err(FeedError::BadRequest("handle must not be empty".to_owned()));
        }
        self.store
            .find_by_handle(handle)
            .await?
            .ok_or_else(|| FeedError::NotFound(format!("no user {handle}")))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use feedline_types::UserState;

    use super::*;
    use crate::memory::InMemoryStore;
    use crate::store::SocialGraphStore;

    async fn setup() -> (InMemoryStore, SocialGraph<InMemoryStore>, User, User) {
        let store = InMemoryStore::new();
        let a = store.insert_user("alice", "Alice").await;
        let b = store.insert_user("bob", "Bob").await;
        (store.clone(), SocialGraph::new(store), a, b)
    }

    #[tokio::test]
    async fn follow_twice_creates_one_edge() {
        let (store, graph, a, b) = setup().await;
        graph.follow(a.id, &b.handle).await.unwrap();
        graph.follow(a.id, &b.handle).await.unwrap();
        assert_eq!(store.edge_count().await, 1);
        assert_eq!(store.followers_of(b.id).await.unwrap(), vec![a.id]);
    }

    #[tokio::test]
    async fn unfollow_is_idempotent() {
        let (store, graph, a, b) = setup().await;
        graph.follow(a.id, &b.handle).await.unwrap();
        graph.unfollow(a.id, &b.handle).await.unwrap();
        graph.unfollow(a.id, &b.handle).await.unwrap();
        assert_eq!(store.edge_count().await, 0);
    }

    #[tokio::test]
    async fn unfollow_never_followed_succeeds() {
        let (store, graph, a, b) = setup().await;
        graph.unfollow(a.id, &b.handle).await.unwrap();
        assert_eq!(store.edge_count().await, 0);
    }

    #[tokio::test]
    async fn self_follow_is_silent_no_op() {
        let (store, graph, a, _) = setup().await;
        graph.follow(a.id, &a.handle).await.unwrap();
        assert_eq!(store.edge_count().await, 0);

        let status = graph.follow_status(a.id, &a.handle).await.unwrap();
        assert!(status.is_following);
        assert!(!status.is_blocked);
        assert!(!status.can_follow);
    }

    #[tokio::test]
    async fn self_unfollow_is_not_found() {
        let (_, graph, a, _) = setup().await;
        let err = graph.unfollow(a.id, &a.handle).await.unwrap_err();
        assert!(matches!(err, FeedError::NotFound(_)));
    }

    #[tokio::test]
    async fn unknown_and_empty_handles() {
        let (_, graph, a, _) = setup().await;
        let ghost = Handle::new("ghost");
        assert!(matches!(
            graph.follow(a.id, &ghost).await,
            Err(FeedError::NotFound(_))
        ));
        assert!(matches!(
            graph.unfollow(a.id, &ghost).await,
            Err(FeedError::NotFound(_))
        ));
        assert!(matches!(
            graph.follow_status(a.id, &ghost).await,
            Err(FeedError::NotFound(_))
        ));
        assert!(matches!(
            graph.follow(a.id, &Handle::new("")).await,
            Err(FeedError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn deleted_target_cannot_be_followed() {
        let (store, graph, a, b) = setup().await;
        graph.follow(a.id, &b.handle).await.unwrap();
        store.set_user_state(b.id, UserState::Deleted).await;

        let err = graph.follow(a.id, &b.handle).await.unwrap_err();
        assert!(matches!(err, FeedError::NotFound(_)));

        let status = graph.follow_status(a.id, &b.handle).await.unwrap();
        assert!(status.is_following);
        assert!(!status.can_follow);

        graph.unfollow(a.id, &b.handle).await.unwrap();
        assert_eq!(store.edge_count().await, 0);
    }

    #[tokio::test]
    async fn status_reflects_edges() {
        let (_, graph, a, b) = setup().await;
        let before = graph.follow_status(a.id, &b.handle).await.unwrap();
        assert_eq!(
            before,
            FollowStatus {
                is_following: false,
                is_blocked: false,
                can_follow: true,
            }
        );
        graph.follow(a.id, &b.handle).await.unwrap();
        let after = graph.follow_status(a.id, &b.handle).await.unwrap();
        assert!(after.is_following);
        assert!(after.can_follow);
    }
}

//! Core entity structs for the home timeline service.
//!
//! Covers users and their handles, immutable posts, follow edges, the
//! materialized timeline entries, and the materializer's watermark.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::UserState;
use crate::ids::{PostId, UserId};

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

/// A public, unique user handle (e.g. `ada`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Handle(pub String);

impl Handle {
    /// Wrap a handle string.
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    /// Borrow the handle text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Handle {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A hub user as seen by the timeline service.
///
/// Owned by the user lifecycle collaborator; this service only reads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct User {
    /// Stable identifier.
    pub id: UserId,
    /// Public handle.
    pub handle: Handle,
    /// Display name shown next to posts.
    pub full_name: String,
    /// Lifecycle state; only [`UserState::Active`] users can be followed.
    pub state: UserState,
}

impl User {
    /// Whether other users may start following this account.
    pub const fn is_followable(&self) -> bool {
        matches!(self.state, UserState::Active)
    }
}

// ---------------------------------------------------------------------------
// Posts
// ---------------------------------------------------------------------------

/// An authored post. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Post {
    /// Post identifier.
    pub id: PostId,
    /// The author.
    pub author_id: UserId,
    /// Body text.
    pub content: String,
    /// Free-form tags attached by the author.
    pub tags: Vec<String>,
    /// Creation timestamp; posts are totally ordered by `(created_at, id)`.
    pub created_at: DateTime<Utc>,
}

impl Post {
    /// The position of this post in the global materialization order.
    pub const fn watermark(&self) -> Watermark {
        Watermark {
            created_at: self.created_at,
            post_id: self.id,
        }
    }
}

// ---------------------------------------------------------------------------
// Social graph
// ---------------------------------------------------------------------------

/// A directed follow edge: `follower_id` receives `followee_id`'s future posts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct FollowEdge {
    /// The consuming user.
    pub follower_id: UserId,
    /// The producing user.
    pub followee_id: UserId,
}

// ---------------------------------------------------------------------------
// Timelines
// ---------------------------------------------------------------------------

/// "This post is visible in `owner_id`'s home timeline."
///
/// `(owner_id, post_id)` is unique. `seq` is a store-wide, strictly
/// increasing insertion sequence used for newest-first pagination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct TimelineEntry {
    /// Timeline owner.
    pub owner_id: UserId,
    /// The referenced post.
    pub post_id: PostId,
    /// Insertion order.
    pub seq: i64,
    /// When the entry was materialized.
    pub inserted_at: DateTime<Utc>,
}

/// Progress marker of the materializer over the global post stream.
///
/// Orders lexicographically by `(created_at, post_id)`, matching the
/// total order of posts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Watermark {
    /// Creation time of the last processed post.
    pub created_at: DateTime<Utc>,
    /// Id of the last processed post (tie-breaker).
    pub post_id: PostId,
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// Relationship between the caller and another user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct FollowStatus {
    /// Whether the caller currently follows the target.
    pub is_following: bool,
    /// Reserved for a blocking subsystem; always `false` today.
    pub is_blocked: bool,
    /// Whether a follow request would create an edge.
    pub can_follow: bool,
}

/// A post hydrated for display in a home timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct TimelinePost {
    /// Post identifier; also usable as a pagination key.
    pub id: PostId,
    /// Body text.
    pub content: String,
    /// Tags.
    pub tags: Vec<String>,
    /// Author's current handle.
    pub author_handle: Handle,
    /// Author's current display name.
    pub author_name: String,
    /// When the post was written.
    pub created_at: DateTime<Utc>,
}

/// One page of a user's home timeline, newest first.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct MyHomeTimeline {
    /// The posts on this page.
    pub posts: Vec<TimelinePost>,
    /// Key to request the next page; empty when this is the last page.
    pub pagination_key: String,
}

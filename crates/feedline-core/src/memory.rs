//! In-memory implementation of every store trait.
//!
//! Used by the test suites and by the `memory` storage backend for local
//! development. Follows the same contracts as the `PostgreSQL` store:
//! follow edges are a set, posts are kept in `(created_at, id)` order, and
//! timeline inserts are deduplicated per `(owner, post)`.
//!
//! Timelines are partitioned by owner. The owner map is only write-locked
//! to add a new partition; inserts for different owners lock different
//! partitions and never contend.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::ops::Bound;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Utc};
use feedline_types::{
    FollowEdge, Handle, Post, PostId, TimelineEntry, User, UserId, UserState, Watermark,
};
use tokio::sync::{Mutex, RwLock};

use crate::clock::{Clock, SystemClock};
use crate::error::StoreError;
use crate::store::{
    PostStore, SessionStore, SocialGraphStore, TimelineStore, UserDirectory, WatermarkStore,
};

/// Provisioning record of a home timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimelineRecord {
    /// When the timeline was first requested.
    pub created_at: DateTime<Utc>,
    /// The most recent read.
    pub last_accessed_at: DateTime<Utc>,
}

/// One owner's partition: the provisioning record plus materialized entries.
#[derive(Debug, Default)]
struct OwnerTimeline {
    record: Option<TimelineRecord>,
    seq_by_post: HashMap<PostId, i64>,
    entries: BTreeMap<i64, TimelineEntry>,
}

#[derive(Debug, Default)]
struct Graph {
    /// `(follower, followee)` pairs.
    edges: BTreeSet<(UserId, UserId)>,
    /// `(followee, follower)` pairs for follower scans.
    by_followee: BTreeSet<(UserId, UserId)>,
}

#[derive(Debug, Default)]
struct Posts {
    stream: BTreeMap<Watermark, Post>,
    by_id: HashMap<PostId, Watermark>,
}

struct Inner {
    clock: Arc<dyn Clock>,
    users: RwLock<BTreeMap<UserId, User>>,
    sessions: RwLock<HashMap<String, UserId>>,
    graph: RwLock<Graph>,
    posts: RwLock<Posts>,
    timelines: RwLock<HashMap<UserId, Arc<Mutex<OwnerTimeline>>>>,
    next_seq: AtomicI64,
    watermark: Mutex<Option<Watermark>>,
    /// Remaining successful timeline inserts before the store reports
    /// itself unavailable. `None` means unlimited.
    insert_budget: Mutex<Option<u32>>,
}

/// Process-local store backed by ordered maps.
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct InMemoryStore {
    inner: Arc<Inner>,
}

impl core::fmt::Debug for InMemoryStore {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("InMemoryStore").finish_non_exhaustive()
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    /// Create an empty store using the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create an empty store that timestamps with `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(Inner {
                clock,
                users: RwLock::new(BTreeMap::new()),
                sessions: RwLock::new(HashMap::new()),
                graph: RwLock::new(Graph::default()),
                posts: RwLock::new(Posts::default()),
                timelines: RwLock::new(HashMap::new()),
                next_seq: AtomicI64::new(1),
                watermark: Mutex::new(None),
                insert_budget: Mutex::new(None),
            }),
        }
    }

    // -----------------------------------------------------------------------
    // Seeding helpers (the user lifecycle and auth collaborators)
    // -----------------------------------------------------------------------

    /// Register an active user.
    pub async fn insert_user(&self, handle: &str, full_name: &str) -> User {
        let user = User {
            id: UserId::new(),
            handle: Handle::new(handle),
            full_name: full_name.to_owned(),
            state: UserState::Active,
        };
        self.inner.users.write().await.insert(user.id, user.clone());
        user
    }

    /// Change a user's lifecycle state. Returns `false` for unknown users.
    pub async fn set_user_state(&self, id: UserId, state: UserState) -> bool {
        let mut users = self.inner.users.write().await;
        users.get_mut(&id).is_some_and(|user| {
            user.state = state;
            true
        })
    }

    /// Hard-delete a user, cascading to their follow edges (both
    /// directions), sessions, and timeline.
    pub async fn delete_user(&self, id: UserId) -> bool {
        let removed = self.inner.users.write().await.remove(&id).is_some();
        if removed {
            let mut graph = self.inner.graph.write().await;
            let Graph { edges, by_followee } = &mut *graph;
            edges.retain(|&(follower, followee)| follower != id && followee != id);
            by_followee.retain(|&(followee, follower)| follower != id && followee != id);
            drop(graph);
            self.inner.sessions.write().await.retain(|_, owner| *owner != id);
            self.inner.timelines.write().await.remove(&id);
        }
        removed
    }

    /// Issue a bearer token for `user`.
    pub async fn issue_session(&self, user: UserId) -> String {
        let token = uuid::Uuid::new_v4().simple().to_string();
        self.inner.sessions.write().await.insert(token.clone(), user);
        token
    }

    // -----------------------------------------------------------------------
    // Inspection and fault injection
    // -----------------------------------------------------------------------

    /// Number of provisioned timeline records.
    pub async fn timeline_record_count(&self) -> usize {
        let partitions: Vec<_> = self.inner.timelines.read().await.values().cloned().collect();
        let mut count = 0usize;
        for partition in partitions {
            if partition.lock().await.record.is_some() {
                count = count.saturating_add(1);
            }
        }
        count
    }

    /// The provisioning record for `owner`, if any.
    pub async fn timeline_record(&self, owner: UserId) -> Option<TimelineRecord> {
        let partition = self.inner.timelines.read().await.get(&owner).cloned()?;
        let guard = partition.lock().await;
        guard.record
    }

    /// Number of materialized entries in `owner`'s timeline.
    pub async fn entry_count(&self, owner: UserId) -> usize {
        let Some(partition) = self.inner.timelines.read().await.get(&owner).cloned() else {
            return 0;
        };
        let timeline = partition.lock().await;
        timeline.entries.len()
    }

    /// Number of follow edges in the graph.
    pub async fn edge_count(&self) -> usize {
        self.inner.graph.read().await.edges.len()
    }

    /// Allow `budget` more successful timeline inserts, after which inserts
    /// fail with [`StoreError::Unavailable`]. `None` lifts the limit.
    pub async fn set_insert_budget(&self, budget: Option<u32>) {
        *self.inner.insert_budget.lock().await = budget;
    }

    /// Get or create the partition for `owner`.
    async fn partition(&self, owner: UserId) -> Arc<Mutex<OwnerTimeline>> {
        if let Some(partition) = self.inner.timelines.read().await.get(&owner) {
            return Arc::clone(partition);
        }
        let mut timelines = self.inner.timelines.write().await;
        Arc::clone(timelines.entry(owner).or_default())
    }

    async fn take_insert_permit(&self) -> Result<(), StoreError> {
        let mut budget = self.inner.insert_budget.lock().await;
        match *budget {
            None => Ok(()),
            Some(0) => Err(StoreError::Unavailable(
                "timeline store rejected insert (budget exhausted)".to_owned(),
            )),
            Some(remaining) => {
                *budget = Some(remaining.saturating_sub(1));
                Ok(())
            }
        }
    }
}

impl UserDirectory for InMemoryStore {
    async fn find_by_handle(&self, handle: &Handle) -> Result<Option<User>, StoreError> {
        let users = self.inner.users.read().await;
        Ok(users.values().find(|user| &user.handle == handle).cloned())
    }

    async fn users_by_ids(&self, ids: &[UserId]) -> Result<Vec<User>, StoreError> {
        let users = self.inner.users.read().await;
        Ok(ids.iter().filter_map(|id| users.get(id).cloned()).collect())
    }
}

impl SessionStore for InMemoryStore {
    async fn resolve_session(&self, token: &str) -> Result<Option<UserId>, StoreError> {
        Ok(self.inner.sessions.read().await.get(token).copied())
    }
}

impl SocialGraphStore for InMemoryStore {
    async fn add_edge(&self, edge: FollowEdge) -> Result<bool, StoreError> {
        if edge.follower_id == edge.followee_id {
            return Err(StoreError::Corrupt("self-follow edge".to_owned()));
        }
        let mut graph = self.inner.graph.write().await;
        let created = graph.edges.insert((edge.follower_id, edge.followee_id));
        graph.by_followee.insert((edge.followee_id, edge.follower_id));
        Ok(created)
    }

    async fn remove_edge(&self, edge: FollowEdge) -> Result<bool, StoreError> {
        let mut graph = self.inner.graph.write().await;
        let removed = graph.edges.remove(&(edge.follower_id, edge.followee_id));
        graph.by_followee.remove(&(edge.followee_id, edge.follower_id));
        Ok(removed)
    }

    async fn edge_exists(&self, edge: FollowEdge) -> Result<bool, StoreError> {
        let graph = self.inner.graph.read().await;
        Ok(graph.edges.contains(&(edge.follower_id, edge.followee_id)))
    }

    async fn followers_of(&self, user: UserId) -> Result<Vec<UserId>, StoreError> {
        let graph = self.inner.graph.read().await;
        Ok(graph
            .by_followee
            .range((user, UserId(uuid::Uuid::nil()))..)
            .take_while(|(followee, _)| *followee == user)
            .map(|&(_, follower)| follower)
            .collect())
    }
}

impl PostStore for InMemoryStore {
    async fn create_post(
        &self,
        author: UserId,
        content: String,
        tags: Vec<String>,
    ) -> Result<Post, StoreError> {
        // Stamped under the write lock, so stream order is publication order.
        let mut posts = self.inner.posts.write().await;
        let post = Post {
            id: PostId::new(),
            author_id: author,
            content,
            tags,
            created_at: self.inner.clock.now(),
        };
        posts.by_id.insert(post.id, post.watermark());
        posts.stream.insert(post.watermark(), post.clone());
        Ok(post)
    }

    async fn posts_since(
        &self,
        author: Option<UserId>,
        since: Option<Watermark>,
        limit: usize,
    ) -> Result<Vec<Post>, StoreError> {
        let posts = self.inner.posts.read().await;
        let lower = since.map_or(Bound::Unbounded, Bound::Excluded);
        Ok(posts
            .stream
            .range((lower, Bound::Unbounded))
            .map(|(_, post)| post)
            .filter(|post| author.is_none_or(|author| post.author_id == author))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn posts_by_ids(&self, ids: &[PostId]) -> Result<Vec<Post>, StoreError> {
        let posts = self.inner.posts.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| posts.by_id.get(id))
            .filter_map(|mark| posts.stream.get(mark).cloned())
            .collect())
    }

    async fn stream_now(&self) -> Result<DateTime<Utc>, StoreError> {
        Ok(self.inner.clock.now())
    }
}

impl TimelineStore for InMemoryStore {
    async fn provision_timeline(&self, owner: UserId) -> Result<bool, StoreError> {
        let now = self.inner.clock.now();
        let partition = self.partition(owner).await;
        let mut timeline = partition.lock().await;
        match timeline.record.as_mut() {
            Some(record) => {
                record.last_accessed_at = now;
                Ok(false)
            }
            None => {
                timeline.record = Some(TimelineRecord {
                    created_at: now,
                    last_accessed_at: now,
                });
                Ok(true)
            }
        }
    }

    async fn insert_entry(&self, owner: UserId, post: PostId) -> Result<bool, StoreError> {
        if !self.inner.posts.read().await.by_id.contains_key(&post) {
            return Err(StoreError::Corrupt(format!("post {post} does not exist")));
        }
        // Held until the entry is written so `delete_user` cannot remove the
        // partition in between.
        let users = self.inner.users.read().await;
        if !users.contains_key(&owner) {
            return Err(StoreError::Corrupt(format!(
                "timeline owner {owner} does not exist"
            )));
        }
        self.take_insert_permit().await?;
        let partition = self.partition(owner).await;
        let mut timeline = partition.lock().await;
        if timeline.seq_by_post.contains_key(&post) {
            return Ok(false);
        }
        // Allocated under the owner's lock, so per-owner order is insertion order.
        let seq = self.inner.next_seq.fetch_add(1, Ordering::SeqCst);
        timeline.seq_by_post.insert(post, seq);
        timeline.entries.insert(
            seq,
            TimelineEntry {
                owner_id: owner,
                post_id: post,
                seq,
                inserted_at: self.inner.clock.now(),
            },
        );
        drop(timeline);
        drop(users);
        Ok(true)
    }

    async fn entry_seq(&self, owner: UserId, post: PostId) -> Result<Option<i64>, StoreError> {
        let Some(partition) = self.inner.timelines.read().await.get(&owner).cloned() else {
            return Ok(None);
        };
        let timeline = partition.lock().await;
        Ok(timeline.seq_by_post.get(&post).copied())
    }

    async fn timeline_page(
        &self,
        owner: UserId,
        before_seq: Option<i64>,
        limit: usize,
    ) -> Result<Vec<TimelineEntry>, StoreError> {
        let partition = self.inner.timelines.read().await.get(&owner).cloned();
        let Some(partition) = partition else {
            return Ok(Vec::new());
        };
        let timeline = partition.lock().await;
        let upper = before_seq.map_or(Bound::Unbounded, Bound::Excluded);
        Ok(timeline
            .entries
            .range((Bound::Unbounded, upper))
            .rev()
            .take(limit)
            .map(|(_, entry)| *entry)
            .collect())
    }
}

impl WatermarkStore for InMemoryStore {
    async fn load_watermark(&self) -> Result<Option<Watermark>, StoreError> {
        Ok(*self.inner.watermark.lock().await)
    }

    async fn save_watermark(&self, watermark: Watermark) -> Result<(), StoreError> {
        let mut current = self.inner.watermark.lock().await;
        // Never move backwards, even if an overlapping cycle finishes late.
        if current.is_none_or(|existing| existing < watermark) {
            *current = Some(watermark);
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn edge(follower: UserId, followee: UserId) -> FollowEdge {
        FollowEdge {
            follower_id: follower,
            followee_id: followee,
        }
    }

    #[tokio::test]
    async fn edges_are_a_set() {
        let store = InMemoryStore::new();
        let a = store.insert_user("a", "A").await;
        let b = store.insert_user("b", "B").await;

        assert!(store.add_edge(edge(a.id, b.id)).await.unwrap());
        assert!(!store.add_edge(edge(a.id, b.id)).await.unwrap());
        assert_eq!(store.edge_count().await, 1);
        assert_eq!(store.followers_of(b.id).await.unwrap(), vec![a.id]);
        assert!(store.followers_of(a.id).await.unwrap().is_empty());

        assert!(store.remove_edge(edge(a.id, b.id)).await.unwrap());
        assert!(!store.remove_edge(edge(a.id, b.id)).await.unwrap());
        assert_eq!(store.edge_count().await, 0);
    }

    #[tokio::test]
    async fn deleting_a_user_cascades_edges() {
        let store = InMemoryStore::new();
        let a = store.insert_user("a", "A").await;
        let b = store.insert_user("b", "B").await;
        let c = store.insert_user("c", "C").await;
        store.add_edge(edge(a.id, b.id)).await.unwrap();
        store.add_edge(edge(b.id, c.id)).await.unwrap();
        store.add_edge(edge(a.id, c.id)).await.unwrap();

        assert!(store.delete_user(b.id).await);
        assert_eq!(store.edge_count().await, 1);
        assert_eq!(store.followers_of(c.id).await.unwrap(), vec![a.id]);
        assert!(store.followers_of(b.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn posts_since_is_ordered_and_exclusive() {
        let store = InMemoryStore::new();
        let a = store.insert_user("a", "A").await;
        let b = store.insert_user("b", "B").await;
        let p1 = store.create_post(a.id, "one".into(), vec![]).await.unwrap();
        let p2 = store.create_post(b.id, "two".into(), vec![]).await.unwrap();
        let p3 = store.create_post(a.id, "three".into(), vec![]).await.unwrap();

        let all = store.posts_since(None, None, 10).await.unwrap();
        let ids: Vec<_> = all.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![p1.id, p2.id, p3.id]);

        let after_first = store.posts_since(None, Some(p1.watermark()), 10).await.unwrap();
        assert_eq!(after_first.len(), 2);
        assert_eq!(after_first[0].id, p2.id);

        let by_a = store.posts_since(Some(a.id), Some(p1.watermark()), 10).await.unwrap();
        assert_eq!(by_a.len(), 1);
        assert_eq!(by_a[0].id, p3.id);

        let limited = store.posts_since(None, None, 2).await.unwrap();
        assert_eq!(limited.len(), 2);
    }

    #[tokio::test]
    async fn timeline_insert_is_idempotent() {
        let store = InMemoryStore::new();
        let a = store.insert_user("a", "A").await;
        let b = store.insert_user("b", "B").await;
        let post = store.create_post(b.id, "hi".into(), vec![]).await.unwrap();

        assert!(store.insert_entry(a.id, post.id).await.unwrap());
        assert!(!store.insert_entry(a.id, post.id).await.unwrap());
        assert_eq!(store.entry_count(a.id).await, 1);
    }

    #[tokio::test]
    async fn deleted_owner_gets_no_timeline_back() {
        let store = InMemoryStore::new();
        let a = store.insert_user("a", "A").await;
        let b = store.insert_user("b", "B").await;
        let post = store.create_post(b.id, "hi".into(), vec![]).await.unwrap();
        store.provision_timeline(a.id).await.unwrap();

        assert!(store.delete_user(a.id).await);
        let err = store.insert_entry(a.id, post.id).await.unwrap_err();
        assert!(matches!(err, StoreError::Corrupt(_)));
        assert_eq!(store.entry_count(a.id).await, 0);
        assert_eq!(store.timeline_record(a.id).await, None);
    }

    #[tokio::test]
    async fn timeline_page_is_newest_first() {
        let store = InMemoryStore::new();
        let a = store.insert_user("a", "A").await;
        let b = store.insert_user("b", "B").await;
        let mut ids = Vec::new();
        for i in 0..5 {
            let post = store.create_post(b.id, format!("p{i}"), vec![]).await.unwrap();
            store.insert_entry(a.id, post.id).await.unwrap();
            ids.push(post.id);
        }

        let page = store.timeline_page(a.id, None, 2).await.unwrap();
        assert_eq!(page[0].post_id, ids[4]);
        assert_eq!(page[1].post_id, ids[3]);

        let next = store.timeline_page(a.id, Some(page[1].seq), 10).await.unwrap();
        let next_ids: Vec<_> = next.iter().map(|e| e.post_id).collect();
        assert_eq!(next_ids, vec![ids[2], ids[1], ids[0]]);
    }

    #[tokio::test]
    async fn provisioning_is_idempotent() {
        let store = InMemoryStore::new();
        let a = store.insert_user("a", "A").await;
        assert!(store.provision_timeline(a.id).await.unwrap());
        assert!(!store.provision_timeline(a.id).await.unwrap());
        assert_eq!(store.timeline_record_count().await, 1);
    }

    #[tokio::test]
    async fn watermark_never_moves_backwards() {
        let store = InMemoryStore::new();
        let a = store.insert_user("a", "A").await;
        let p1 = store.create_post(a.id, "1".into(), vec![]).await.unwrap();
        let p2 = store.create_post(a.id, "2".into(), vec![]).await.unwrap();

        store.save_watermark(p2.watermark()).await.unwrap();
        store.save_watermark(p1.watermark()).await.unwrap();
        assert_eq!(store.load_watermark().await.unwrap(), Some(p2.watermark()));
    }

    #[tokio::test]
    async fn insert_budget_simulates_outage() {
        let store = InMemoryStore::new();
        let a = store.insert_user("a", "A").await;
        let b = store.insert_user("b", "B").await;
        let p1 = store.create_post(b.id, "1".into(), vec![]).await.unwrap();
        let p2 = store.create_post(b.id, "2".into(), vec![]).await.unwrap();

        store.set_insert_budget(Some(1)).await;
        assert!(store.insert_entry(a.id, p1.id).await.is_ok());
        let err = store.insert_entry(a.id, p2.id).await.unwrap_err();
        assert!(err.is_transient());

        store.set_insert_budget(None).await;
        assert!(store.insert_entry(a.id, p2.id).await.unwrap());
    }
}

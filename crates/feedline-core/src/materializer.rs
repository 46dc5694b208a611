//! Background fan-out of new posts into followers' home timelines.
//!
//! The materializer reads the global post stream in `(created_at, id)`
//! order, starting after a persisted [`Watermark`]. For each post it takes
//! a snapshot of the author's followers and inserts one timeline entry per
//! follower. Inserts are idempotent, so a cycle that dies halfway can
//! simply be re-run.
//!
//! # Progress
//!
//! The watermark is saved once per cycle, after every post of the batch
//! has been handled. If the store becomes unavailable mid-batch the cycle
//! aborts without saving, and the next cycle repeats the same posts.
//!
//! A post that can never be materialized (blank content, unreadable
//! followers, or every follower's insert rejected as corrupt) is logged,
//! counted and skipped so that it cannot stall the stream. A corrupt
//! insert for a single follower (typically one deleted mid-cycle) skips
//! only that follower; the others still receive the post.
//!
//! # Scheduling
//!
//! [`Materializer::run`] waits on a [`Ticker`]. After a tick it keeps
//! running cycles back to back while each one fills its batch, then goes
//! back to waiting.
//!
//! # Settle window
//!
//! `created_at` is stamped before the post's write becomes visible, so a
//! post can appear in the stream behind one that is already materialized.
//! Posts younger than `settle_delay`, measured on the store's own clock,
//! are left for a later cycle; the window must exceed the longest
//! post-insert commit.

use std::time::Duration;

use chrono::TimeDelta;
use feedline_types::{Post, UserId, Watermark};
use futures::{StreamExt, stream};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::clock::Ticker;
use crate::config::MaterializerConfig;
use crate::error::StoreError;
use crate::store::FeedStore;

/// Errors that abort a materialization cycle.
#[derive(Debug, thiserror::Error)]
pub enum MaterializerError {
    /// A store call failed in a way that is worth retrying later.
    #[error("{stage} failed: {source}")]
    Store {
        /// Which step of the cycle failed.
        stage: &'static str,
        /// The underlying store error.
        source: StoreError,
    },
}

/// Outcome of one cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Posts consumed from the stream, poisoned ones included.
    pub posts_seen: usize,
    /// Timeline entries newly written. Re-inserts are not counted.
    pub entries_inserted: usize,
    /// Posts skipped because they can never be materialized.
    pub poisoned: usize,
    /// Single-follower inserts rejected as corrupt and skipped.
    pub skipped_entries: usize,
    /// Watermark after the cycle.
    pub watermark: Option<Watermark>,
    /// Whether the batch was full, i.e. more posts are likely waiting.
    pub batch_full: bool,
}

/// Why a single post was not fanned out.
enum PostFailure {
    Poison(String),
    Transient(StoreError),
}

/// Result of fanning out one post.
#[derive(Default)]
struct FanOut {
    inserted: usize,
    skipped: usize,
}

/// Drives fan-out from the post stream into timelines.
pub struct Materializer<S> {
    store: S,
    config: MaterializerConfig,
}

impl<S> core::fmt::Debug for Materializer<S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Materializer")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<S: FeedStore> Materializer<S> {
    /// Create a materializer over `store`.
    pub const fn new(store: S, config: MaterializerConfig) -> Self {
        Self { store, config }
    }

    /// Materialize at most one batch of posts.
    ///
    /// # Errors
    ///
    /// Returns [`MaterializerError::Store`] if the store is unavailable or
    /// a call exceeds `store_timeout`. The watermark is left untouched.
    pub async fn run_cycle(&self) -> Result<CycleReport, MaterializerError> {
        let since = self
            .timed(self.store.load_watermark())
            .await
            .map_err(|source| MaterializerError::Store {
                stage: "load watermark",
                source,
            })?;

        let settle = TimeDelta::from_std(self.config.settle_delay()).unwrap_or(TimeDelta::zero());
        let now = self
            .timed(self.store.stream_now())
            .await
            .map_err(|source| MaterializerError::Store {
                stage: "read store clock",
                source,
            })?;
        let cutoff = now.checked_sub_signed(settle).unwrap_or(now);

        let batch = self
            .timed(self.store.posts_since(None, since, self.config.batch_size))
            .await
            .map_err(|source| MaterializerError::Store {
                stage: "read post stream",
                source,
            })?;

        let mut report = CycleReport {
            watermark: since,
            batch_full: batch.len() >= self.config.batch_size,
            ..CycleReport::default()
        };

        for post in &batch {
            if post.created_at > cutoff {
                debug!(post_id = %post.id, "post inside settle window, deferring");
                report.batch_full = false;
                break;
            }

            match self.fan_out(post).await {
                Ok(fan_out) => {
                    report.entries_inserted =
                        report.entries_inserted.saturating_add(fan_out.inserted);
                    report.skipped_entries =
                        report.skipped_entries.saturating_add(fan_out.skipped);
                }
                Err(PostFailure::Poison(reason)) => {
                    warn!(post_id = %post.id, author = %post.author_id, %reason, "skipping unmaterializable post");
                    report.poisoned = report.poisoned.saturating_add(1);
                }
                Err(PostFailure::Transient(source)) => {
                    return Err(MaterializerError::Store {
                        stage: "fan out",
                        source,
                    });
                }
            }
            report.posts_seen = report.posts_seen.saturating_add(1);
            report.watermark = Some(post.watermark());
        }

        if let Some(watermark) = report.watermark.filter(|mark| Some(*mark) != since) {
            self.timed(self.store.save_watermark(watermark))
                .await
                .map_err(|source| MaterializerError::Store {
                    stage: "save watermark",
                    source,
                })?;
        }

        Ok(report)
    }

    /// Insert `post` into the timeline of every current follower of its
    /// author.
    async fn fan_out(&self, post: &Post) -> Result<FanOut, PostFailure> {
        if post.content.trim().is_empty() {
            return Err(PostFailure::Poison("blank content".to_owned()));
        }

        let followers = self
            .timed(self.store.followers_of(post.author_id))
            .await
            .map_err(classify)?;

        let author = post.author_id;
        let post_id = post.id;
        let timeout = self.config.store_timeout();
        let targets: Vec<UserId> = followers.into_iter().filter(|f| *f != author).collect();
        let attempted = targets.len();
        let outcomes: Vec<(UserId, Result<bool, StoreError>)> = stream::iter(targets)
            .map(|follower| {
                let store = self.store.clone();
                async move {
                    let outcome =
                        with_timeout(timeout, store.insert_entry(follower, post_id)).await;
                    (follower, outcome)
                }
            })
            .buffer_unordered(self.config.fanout_concurrency.max(1))
            .collect()
            .await;

        let mut fan_out = FanOut::default();
        let mut last_rejection = None;
        for (follower, outcome) in outcomes {
            match outcome {
                Ok(true) => fan_out.inserted = fan_out.inserted.saturating_add(1),
                Ok(false) => {}
                Err(StoreError::Corrupt(reason)) => {
                    warn!(
                        %post_id,
                        %follower,
                        %reason,
                        "timeline rejected entry, skipping follower"
                    );
                    fan_out.skipped = fan_out.skipped.saturating_add(1);
                    last_rejection = Some(reason);
                }
                Err(transient @ StoreError::Unavailable(_)) => {
                    return Err(PostFailure::Transient(transient));
                }
            }
        }

        // Every follower failing the same way points at the post itself.
        if let Some(reason) = last_rejection.filter(|_| fan_out.skipped == attempted) {
            return Err(PostFailure::Poison(reason));
        }

        debug!(
            %post_id,
            %author,
            written = fan_out.inserted,
            skipped = fan_out.skipped,
            "fanned out post"
        );
        Ok(fan_out)
    }

    async fn timed<T>(
        &self,
        call: impl Future<Output = Result<T, StoreError>> + Send,
    ) -> Result<T, StoreError> {
        with_timeout(self.config.store_timeout(), call).await
    }

    /// Run cycles until `shutdown` turns `true` or its sender is dropped.
    ///
    /// Cycle failures are logged and retried on the next tick; they never
    /// end the loop.
    pub async fn run<T: Ticker>(self, mut ticker: T, mut shutdown: watch::Receiver<bool>) {
        info!(
            poll_interval_ms = self.config.poll_interval_ms,
            batch_size = self.config.batch_size,
            settle_delay_ms = self.config.settle_delay_ms,
            "materializer started"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
                () = ticker.tick() => {}
            }
            self.drain(&shutdown).await;
        }

        info!("materializer stopped");
    }

    /// Run cycles back to back while they keep filling their batch.
    async fn drain(&self, shutdown: &watch::Receiver<bool>) {
        loop {
            match self.run_cycle().await {
                Ok(report) => {
                    if report.posts_seen > 0 {
                        info!(
                            posts = report.posts_seen,
                            entries = report.entries_inserted,
                            poisoned = report.poisoned,
                            skipped_entries = report.skipped_entries,
                            batch_full = report.batch_full,
                            "materialization cycle complete"
                        );
                    }
                    if !report.batch_full || *shutdown.borrow() {
                        return;
                    }
                }
                Err(err) => {
                    warn!(error = %err, "materialization cycle failed, retrying on next tick");
                    return;
                }
            }
        }
    }

    /// Run the loop on its own Tokio task.
    pub fn spawn<T: Ticker + 'static>(
        self,
        ticker: T,
        shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        tokio::spawn(self.run(ticker, shutdown))
    }
}

async fn with_timeout<T>(
    limit: Duration,
    call: impl Future<Output = Result<T, StoreError>> + Send,
) -> Result<T, StoreError> {
    tokio::time::timeout(limit, call)
        .await
        .map_err(|_elapsed| {
            StoreError::Unavailable(format!("store call exceeded {}ms", limit.as_millis()))
        })?
}

fn classify(err: StoreError) -> PostFailure {
    match err {
        StoreError::Corrupt(reason) => PostFailure::Poison(reason),
        transient @ StoreError::Unavailable(_) => PostFailure::Transient(transient),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::collections::HashSet;
    use std::sync::{Arc, Mutex};

    use chrono::{DateTime, Utc};
    use feedline_types::{FollowEdge, Handle, PostId, TimelineEntry, User};

    use super::*;
    use crate::clock::{ManualClock, ManualTicker};
    use crate::config::TimelineConfig;
    use crate::memory::InMemoryStore;
    use crate::store::{
        PostStore, SessionStore, SocialGraphStore, TimelineStore, UserDirectory, WatermarkStore,
    };
    use crate::timeline::TimelineReader;

    /// Defaults without a settle window, for posts stamped just now.
    fn immediate() -> MaterializerConfig {
        MaterializerConfig {
            settle_delay_ms: 0,
            ..MaterializerConfig::default()
        }
    }

    fn materializer(
        store: &InMemoryStore,
        config: MaterializerConfig,
    ) -> Materializer<InMemoryStore> {
        Materializer::new(store.clone(), config)
    }

    /// In-memory store whose posts can be held back until "committed" and
    /// whose timeline inserts can be rejected for chosen owners.
    #[derive(Clone)]
    struct GatedStore {
        inner: InMemoryStore,
        uncommitted: Arc<Mutex<HashSet<PostId>>>,
        rejected_owners: Arc<Mutex<HashSet<UserId>>>,
    }

    impl GatedStore {
        fn new(inner: InMemoryStore) -> Self {
            Self {
                inner,
                uncommitted: Arc::default(),
                rejected_owners: Arc::default(),
            }
        }

        fn hold_back(&self, post: PostId) {
            self.uncommitted.lock().unwrap().insert(post);
        }

        fn commit(&self, post: PostId) {
            self.uncommitted.lock().unwrap().remove(&post);
        }

        fn reject_owner(&self, owner: UserId) {
            self.rejected_owners.lock().unwrap().insert(owner);
        }
    }

    impl UserDirectory for GatedStore {
        async fn find_by_handle(&self, handle: &Handle) -> Result<Option<User>, StoreError> {
            self.inner.find_by_handle(handle).await
        }

        async fn users_by_ids(&self, ids: &[UserId]) -> Result<Vec<User>, StoreError> {
            self.inner.users_by_ids(ids).await
        }
    }

    impl SessionStore for GatedStore {
        async fn resolve_session(&self, token: &str) -> Result<Option<UserId>, StoreError> {
            self.inner.resolve_session(token).await
        }
    }

    impl SocialGraphStore for GatedStore {
        async fn add_edge(&self, edge: FollowEdge) -> Result<bool, StoreError> {
            self.inner.add_edge(edge).await
        }

        async fn remove_edge(&self, edge: FollowEdge) -> Result<bool, StoreError> {
            self.inner.remove_edge(edge).await
        }

        async fn edge_exists(&self, edge: FollowEdge) -> Result<bool, StoreError> {
            self.inner.edge_exists(edge).await
        }

        async fn followers_of(&self, user: UserId) -> Result<Vec<UserId>, StoreError> {
            self.inner.followers_of(user).await
        }
    }

    impl PostStore for GatedStore {
        async fn create_post(
            &self,
            author: UserId,
            content: String,
            tags: Vec<String>,
        ) -> Result<Post, StoreError> {
            self.inner.create_post(author, content, tags).await
        }

        async fn posts_since(
            &self,
            author: Option<UserId>,
            since: Option<Watermark>,
            limit: usize,
        ) -> Result<Vec<Post>, StoreError> {
            let posts = self.inner.posts_since(author, since, limit).await?;
            let hidden = self.uncommitted.lock().unwrap().clone();
            Ok(posts.into_iter().filter(|p| !hidden.contains(&p.id)).collect())
        }

        async fn posts_by_ids(&self, ids: &[PostId]) -> Result<Vec<Post>, StoreError> {
            self.inner.posts_by_ids(ids).await
        }

        async fn stream_now(&self) -> Result<DateTime<Utc>, StoreError> {
            self.inner.stream_now().await
        }
    }

    impl TimelineStore for GatedStore {
        async fn provision_timeline(&self, owner: UserId) -> Result<bool, StoreError> {
            self.inner.provision_timeline(owner).await
        }

        async fn insert_entry(&self, owner: UserId, post: PostId) -> Result<bool, StoreError> {
            let rejected = self.rejected_owners.lock().unwrap().contains(&owner);
            if rejected {
                return Err(StoreError::Corrupt(format!(
                    "timeline_entries.owner_id violates foreign key: {owner}"
                )));
            }
            self.inner.insert_entry(owner, post).await
        }

        async fn entry_seq(&self, owner: UserId, post: PostId) -> Result<Option<i64>, StoreError> {
            self.inner.entry_seq(owner, post).await
        }

        async fn timeline_page(
            &self,
            owner: UserId,
            before_seq: Option<i64>,
            limit: usize,
        ) -> Result<Vec<TimelineEntry>, StoreError> {
            self.inner.timeline_page(owner, before_seq, limit).await
        }
    }

    impl WatermarkStore for GatedStore {
        async fn load_watermark(&self) -> Result<Option<Watermark>, StoreError> {
            self.inner.load_watermark().await
        }

        async fn save_watermark(&self, watermark: Watermark) -> Result<(), StoreError> {
            self.inner.save_watermark(watermark).await
        }
    }

    async fn follow(store: &InMemoryStore, follower: &User, followee: &User) {
        store
            .add_edge(FollowEdge {
                follower_id: follower.id,
                followee_id: followee.id,
            })
            .await
            .unwrap();
    }

    async fn post(store: &InMemoryStore, author: &User, content: &str) -> Post {
        store.create_post(author.id, content.to_owned(), vec![]).await.unwrap()
    }

    #[tokio::test]
    async fn fans_out_to_followers_but_not_author() {
        let store = InMemoryStore::new();
        let a = store.insert_user("a", "A").await;
        let b = store.insert_user("b", "B").await;
        let c = store.insert_user("c", "C").await;
        follow(&store, &a, &b).await;
        follow(&store, &c, &b).await;
        let p = post(&store, &b, "hello").await;

        let report = materializer(&store, immediate())
            .run_cycle()
            .await
            .unwrap();
        assert_eq!(report.posts_seen, 1);
        assert_eq!(report.entries_inserted, 2);
        assert_eq!(report.watermark, Some(p.watermark()));
        assert!(!report.batch_full);
        assert_eq!(store.entry_count(a.id).await, 1);
        assert_eq!(store.entry_count(c.id).await, 1);
        assert_eq!(store.entry_count(b.id).await, 0);
    }

    #[tokio::test]
    async fn two_followees_interleave_newest_first() {
        let store = InMemoryStore::new();
        let a = store.insert_user("a", "A").await;
        let b = store.insert_user("b", "B").await;
        let c = store.insert_user("c", "C").await;
        follow(&store, &a, &b).await;
        follow(&store, &a, &c).await;
        let b1 = post(&store, &b, "b1").await;
        let c1 = post(&store, &c, "c1").await;
        let b2 = post(&store, &b, "b2").await;
        let c2 = post(&store, &c, "c2").await;

        materializer(&store, immediate())
            .run_cycle()
            .await
            .unwrap();

        let page = TimelineReader::new(store.clone(), TimelineConfig::default())
            .get_my_home_timeline(a.id, None, Some(4))
            .await
            .unwrap();
        let ids: Vec<_> = page.posts.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![c2.id, b2.id, c1.id, b1.id]);
        assert!(page.pagination_key.is_empty());
    }

    #[tokio::test]
    async fn unfollow_is_not_retroactive() {
        let store = InMemoryStore::new();
        let a = store.insert_user("a", "A").await;
        let b = store.insert_user("b", "B").await;
        let m = materializer(&store, immediate());
        follow(&store, &a, &b).await;
        post(&store, &b, "before").await;
        m.run_cycle().await.unwrap();

        store
            .remove_edge(FollowEdge {
                follower_id: a.id,
                followee_id: b.id,
            })
            .await
            .unwrap();
        post(&store, &b, "after").await;
        m.run_cycle().await.unwrap();

        assert_eq!(store.entry_count(a.id).await, 1);
    }

    #[tokio::test]
    async fn followers_are_resolved_when_the_cycle_runs() {
        let store = InMemoryStore::new();
        let a = store.insert_user("a", "A").await;
        let b = store.insert_user("b", "B").await;
        post(&store, &b, "posted before the follow").await;
        follow(&store, &a, &b).await;

        materializer(&store, immediate())
            .run_cycle()
            .await
            .unwrap();
        assert_eq!(store.entry_count(a.id).await, 1);
    }

    #[tokio::test]
    async fn outage_mid_batch_is_retried_without_duplicates() {
        let store = InMemoryStore::new();
        let b = store.insert_user("b", "B").await;
        let mut followers = Vec::new();
        for handle in ["f1", "f2", "f3"] {
            let f = store.insert_user(handle, handle).await;
            follow(&store, &f, &b).await;
            followers.push(f);
        }
        let p = post(&store, &b, "hello").await;
        let m = Materializer::new(
            store.clone(),
            MaterializerConfig {
                fanout_concurrency: 1,
                ..immediate()
            },
        );

        store.set_insert_budget(Some(1)).await;
        let err = m.run_cycle().await.unwrap_err();
        assert!(matches!(err, MaterializerError::Store { stage: "fan out", .. }));
        assert_eq!(store.load_watermark().await.unwrap(), None);

        store.set_insert_budget(None).await;
        let report = m.run_cycle().await.unwrap();
        assert_eq!(report.entries_inserted, 2);
        assert_eq!(report.watermark, Some(p.watermark()));
        for f in &followers {
            assert_eq!(store.entry_count(f.id).await, 1);
        }
    }

    #[tokio::test]
    async fn poison_post_is_skipped() {
        let store = InMemoryStore::new();
        let a = store.insert_user("a", "A").await;
        let b = store.insert_user("b", "B").await;
        follow(&store, &a, &b).await;
        post(&store, &b, "   ").await;
        let good = post(&store, &b, "fine").await;

        let report = materializer(&store, immediate())
            .run_cycle()
            .await
            .unwrap();
        assert_eq!(report.posts_seen, 2);
        assert_eq!(report.poisoned, 1);
        assert_eq!(report.entries_inserted, 1);
        assert_eq!(report.watermark, Some(good.watermark()));
        assert_eq!(store.entry_count(a.id).await, 1);
    }

    #[tokio::test]
    async fn settle_delay_defers_young_posts() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let store = InMemoryStore::with_clock(clock.clone());
        let a = store.insert_user("a", "A").await;
        let b = store.insert_user("b", "B").await;
        follow(&store, &a, &b).await;
        post(&store, &b, "fresh").await;

        let m = Materializer::new(
            store.clone(),
            MaterializerConfig {
                settle_delay_ms: 5_000,
                ..immediate()
            },
        );
        let early = m.run_cycle().await.unwrap();
        assert_eq!(early.posts_seen, 0);
        assert_eq!(early.watermark, None);

        clock.advance(TimeDelta::seconds(6));
        let late = m.run_cycle().await.unwrap();
        assert_eq!(late.posts_seen, 1);
        assert_eq!(store.entry_count(a.id).await, 1);
    }

    #[tokio::test]
    async fn post_committed_late_within_settle_window_is_not_skipped() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let store = GatedStore::new(InMemoryStore::with_clock(clock.clone()));
        let a = store.inner.insert_user("a", "A").await;
        let b = store.inner.insert_user("b", "B").await;
        let c = store.inner.insert_user("c", "C").await;
        follow(&store.inner, &a, &b).await;
        follow(&store.inner, &a, &c).await;

        let slow = post(&store.inner, &b, "stamped first, committed last").await;
        store.hold_back(slow.id);
        clock.advance(TimeDelta::seconds(1));
        post(&store.inner, &c, "stamped second").await;

        let m = Materializer::new(store.clone(), MaterializerConfig::default());
        clock.advance(TimeDelta::milliseconds(500));
        let early = m.run_cycle().await.unwrap();
        assert_eq!(early.posts_seen, 0, "default settle window holds the newer post");

        store.commit(slow.id);
        clock.advance(TimeDelta::seconds(3));
        for _ in 0..3 {
            m.run_cycle().await.unwrap();
        }
        assert_eq!(store.inner.entry_count(a.id).await, 2);
    }

    #[tokio::test]
    async fn rejected_follower_does_not_drop_post_for_others() {
        let store = GatedStore::new(InMemoryStore::new());
        let b = store.inner.insert_user("b", "B").await;
        let mut followers = Vec::new();
        for handle in ["f1", "f2", "f3", "f4"] {
            let f = store.inner.insert_user(handle, handle).await;
            follow(&store.inner, &f, &b).await;
            followers.push(f);
        }
        store.reject_owner(followers[1].id);
        let p = post(&store.inner, &b, "hello").await;

        let m = Materializer::new(
            store.clone(),
            MaterializerConfig {
                fanout_concurrency: 1,
                ..immediate()
            },
        );
        let report = m.run_cycle().await.unwrap();
        assert_eq!(report.poisoned, 0);
        assert_eq!(report.skipped_entries, 1);
        assert_eq!(report.entries_inserted, 3);
        assert_eq!(report.watermark, Some(p.watermark()));

        let mut counts = Vec::new();
        for f in &followers {
            counts.push(store.inner.entry_count(f.id).await);
        }
        assert_eq!(counts, vec![1, 0, 1, 1]);
    }

    #[tokio::test]
    async fn post_rejected_by_every_follower_is_poisoned() {
        let store = GatedStore::new(InMemoryStore::new());
        let a = store.inner.insert_user("a", "A").await;
        let b = store.inner.insert_user("b", "B").await;
        follow(&store.inner, &a, &b).await;
        store.reject_owner(a.id);
        let p = post(&store.inner, &b, "hello").await;

        let report = Materializer::new(store.clone(), immediate())
            .run_cycle()
            .await
            .unwrap();
        assert_eq!(report.poisoned, 1);
        assert_eq!(report.entries_inserted, 0);
        assert_eq!(report.watermark, Some(p.watermark()));
    }

    #[tokio::test]
    async fn full_batches_report_backlog() {
        let store = InMemoryStore::new();
        let a = store.insert_user("a", "A").await;
        let b = store.insert_user("b", "B").await;
        follow(&store, &a, &b).await;
        for i in 0..5 {
            post(&store, &b, &format!("p{i}")).await;
        }
        let m = materializer(
            &store,
            MaterializerConfig {
                batch_size: 2,
                ..immediate()
            },
        );

        let mut seen = Vec::new();
        loop {
            let report = m.run_cycle().await.unwrap();
            seen.push(report.posts_seen);
            if !report.batch_full {
                break;
            }
        }
        assert_eq!(seen, vec![2, 2, 1]);
        assert_eq!(store.entry_count(a.id).await, 5);
    }

    #[tokio::test]
    async fn loop_drains_backlog_and_stops_on_shutdown() {
        let store = InMemoryStore::new();
        let a = store.insert_user("a", "A").await;
        let b = store.insert_user("b", "B").await;
        follow(&store, &a, &b).await;
        for i in 0..5 {
            post(&store, &b, &format!("p{i}")).await;
        }
        let m = materializer(
            &store,
            MaterializerConfig {
                batch_size: 2,
                ..immediate()
            },
        );
        let (ticker, handle) = ManualTicker::new();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = m.spawn(ticker, shutdown_rx);

        assert!(handle.tick());
        let mut drained = false;
        for _ in 0..200 {
            if store.entry_count(a.id).await == 5 {
                drained = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(drained, "one tick drains the whole backlog");

        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();
    }
}

//! Shared application state for the hub API.
//!
//! [`AppState`] bundles the services the handlers call. All of them wrap
//! clones of the same store, so the HTTP layer holds no state of its own.

use feedline_core::FeedStore;
use feedline_core::config::TimelineConfig;
use feedline_core::graph::SocialGraph;
use feedline_core::posts::PostPublisher;
use feedline_core::timeline::TimelineReader;

/// Services available to every request handler.
#[derive(Debug)]
pub struct AppState<S> {
    /// Backing store, also used to resolve session tokens.
    pub store: S,
    /// Follow / unfollow / follow status.
    pub graph: SocialGraph<S>,
    /// Home timeline reads.
    pub timelines: TimelineReader<S>,
    /// Post authoring.
    pub posts: PostPublisher<S>,
}

impl<S: FeedStore> AppState<S> {
    /// Build the services over `store`.
    pub fn new(store: S, timeline: TimelineConfig) -> Self {
        Self {
            graph: SocialGraph::new(store.clone()),
            timelines: TimelineReader::new(store.clone(), timeline),
            posts: PostPublisher::new(store.clone()),
            store,
        }
    }
}

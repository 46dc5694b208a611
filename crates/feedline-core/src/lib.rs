//! Social graph, home timeline reads, and timeline materialization for
//! Feedline.
//!
//! Writes and reads are decoupled: publishing a post only appends it to
//! the post stream, the [`Materializer`] fans it out into followers'
//! timelines in the background, and [`TimelineReader`] pages through what
//! has been materialized.
//!
//! # Modules
//!
//! - [`clock`] -- [`Clock`] and [`Ticker`] abstractions, with manual
//!   variants for deterministic tests.
//! - [`config`] -- Configuration loading from `feedline.yaml` into
//!   strongly-typed structs.
//! - [`error`] -- [`StoreError`] and the caller-facing [`FeedError`].
//! - [`graph`] -- Follow, unfollow, and follow status.
//! - [`materializer`] -- Background fan-out driven by a persisted watermark.
//! - [`memory`] -- [`InMemoryStore`], a process-local backend.
//! - [`posts`] -- Post authoring.
//! - [`store`] -- Storage traits implemented by every backend.
//! - [`timeline`] -- Cursor-paginated home timeline reads.
//!
//! [`Clock`]: clock::Clock
//! [`Ticker`]: clock::Ticker
//! [`StoreError`]: error::StoreError
//! [`FeedError`]: error::FeedError
//! [`InMemoryStore`]: memory::InMemoryStore
//! [`Materializer`]: materializer::Materializer
//! [`TimelineReader`]: timeline::TimelineReader

pub mod clock;
pub mod config;
pub mod error;
pub mod graph;
pub mod materializer;
pub mod memory;
pub mod posts;
pub mod store;
pub mod timeline;

pub use error::{FeedError, StoreError};
pub use store::FeedStore;

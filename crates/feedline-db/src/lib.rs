//! `PostgreSQL` storage backend for Feedline.
//!
//! [`PgFeedStore`] implements every store trait from `feedline-core` on
//! top of a shared [`sqlx::PgPool`]. Each table group has its own query
//! type borrowing the pool; the store delegates to them and folds
//! [`DbError`] into the backend-neutral `StoreError`.
//!
//! # Tables
//!
//! ```text
//! hub_users, hub_sessions      (read-only collaborators)
//! following_relationships      (follow edges)
//! posts                        (append-only stream)
//! home_timelines               (provisioning records)
//! timeline_entries             (materialized entries)
//! materializer_watermarks      (fan-out progress)
//! ```
//!
//! # Modules
//!
//! - [`postgres`] -- Connection pool, configuration, and migrations
//! - [`users`] -- Accounts and sessions
//! - [`social_graph`] -- Follow edges
//! - [`posts`] -- The post stream
//! - [`timelines`] -- Provisioning records and timeline entries
//! - [`watermarks`] -- Materializer progress
//! - [`store`] -- The store-trait implementation
//! - [`error`] -- Shared error types

pub mod error;
pub mod posts;
pub mod postgres;
pub mod social_graph;
pub mod store;
pub mod timelines;
pub mod users;
pub mod watermarks;

// Re-export primary types for convenience.
pub use error::DbError;
pub use postgres::{PostgresConfig, PostgresPool};
pub use store::PgFeedStore;

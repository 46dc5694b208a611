//! Shared type definitions for the Feedline home timeline service.
//!
//! This crate is the single source of truth for the entities that flow
//! between the stores, the materializer, and the HTTP surface. Types are
//! exported to `TypeScript` via `ts-rs` for the hub frontends.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers for users and posts
//! - [`enums`] -- Enumeration types (user lifecycle)
//! - [`structs`] -- Users, posts, follow edges, timeline entries, responses

pub mod enums;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::UserState;
pub use ids::{PostId, UserId};
pub use structs::{
    FollowEdge, FollowStatus, Handle, MyHomeTimeline, Post, TimelineEntry, TimelinePost, User,
    Watermark,
};

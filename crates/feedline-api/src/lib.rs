//! Hub HTTP API for Feedline.
//!
//! Exposes the follow operations, post authoring, and the caller's home
//! timeline as JSON `POST` endpoints under `/hub/`. Callers authenticate
//! with a bearer token issued by the hub's session service.
//!
//! # Modules
//!
//! - [`auth`] -- `Authorization: Bearer` extractor
//! - [`error`] -- [`ApiError`] and its status code mapping
//! - [`handlers`] -- Endpoint handlers
//! - [`requests`] -- Request and response bodies
//! - [`router`] -- Route table and middleware
//! - [`server`] -- Listener lifecycle with graceful shutdown
//! - [`state`] -- Services shared by all handlers
//!
//! [`ApiError`]: error::ApiError

pub mod auth;
pub mod error;
pub mod handlers;
pub mod requests;
pub mod router;
pub mod server;
pub mod state;

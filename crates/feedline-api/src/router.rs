//! Axum router construction for the hub API.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use feedline_core::FeedStore;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Build the complete router.
///
/// - `GET /health`
/// - `POST /hub/follow-user`
/// - `POST /hub/unfollow-user`
/// - `POST /hub/get-follow-status`
/// - `POST /hub/get-my-home-timeline`
/// - `POST /hub/add-post`
///
/// CORS allows any origin; the hub frontends are served from other hosts.
pub fn build_router<S: FeedStore>(state: Arc<AppState<S>>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/hub/follow-user", post(handlers::follow_user::<S>))
        .route("/hub/unfollow-user", post(handlers::unfollow_user::<S>))
        .route("/hub/get-follow-status", post(handlers::get_follow_status::<S>))
        .route(
            "/hub/get-my-home-timeline",
            post(handlers::get_my_home_timeline::<S>),
        )
        .route("/hub/add-post", post(handlers::add_post::<S>))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

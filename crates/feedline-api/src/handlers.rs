//! HTTP handlers for the hub endpoints.
//!
//! Every hub endpoint is a `POST` with a JSON body and requires an
//! authenticated caller. Handlers only translate between HTTP and the
//! services in [`AppState`]; status codes come from [`ApiError`].

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use feedline_core::FeedStore;
use feedline_types::{FollowStatus, Handle, MyHomeTimeline};
use validator::Validate;

use crate::auth::AuthenticatedUser;
use crate::error::ApiError;
use crate::requests::{AddPostRequest, AddPostResponse, HandleRequest, TimelineRequest};
use crate::state::AppState;

/// `GET /health` -- liveness check.
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// `POST /hub/follow-user`
///
/// # Errors
///
/// 400 for an empty handle, 404 for an unknown or unfollowable target.
pub async fn follow_user<S: FeedStore>(
    State(state): State<Arc<AppState<S>>>,
    AuthenticatedUser(user): AuthenticatedUser,
    payload: Result<Json<HandleRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(req) = payload?;
    state.graph.follow(user, &Handle::new(req.handle)).await?;
    Ok(StatusCode::OK)
}

/// `POST /hub/unfollow-user`
///
/// # Errors
///
/// 400 for an empty handle, 404 for an unknown handle or the caller's own.
pub async fn unfollow_user<S: FeedStore>(
    State(state): State<Arc<AppState<S>>>,
    AuthenticatedUser(user): AuthenticatedUser,
    payload: Result<Json<HandleRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(req) = payload?;
    state.graph.unfollow(user, &Handle::new(req.handle)).await?;
    Ok(StatusCode::OK)
}

/// `POST /hub/get-follow-status`
///
/// # Errors
///
/// 400 for an empty handle, 404 for an unknown handle.
pub async fn get_follow_status<S: FeedStore>(
    State(state): State<Arc<AppState<S>>>,
    AuthenticatedUser(user): AuthenticatedUser,
    payload: Result<Json<HandleRequest>, JsonRejection>,
) -> Result<Json<FollowStatus>, ApiError> {
    let Json(req) = payload?;
    let status = state
        .graph
        .follow_status(user, &Handle::new(req.handle))
        .await?;
    Ok(Json(status))
}

/// `POST /hub/get-my-home-timeline`
///
/// # Errors
///
/// 400 for an out-of-range limit, 422 for an unusable pagination key.
pub async fn get_my_home_timeline<S: FeedStore>(
    State(state): State<Arc<AppState<S>>>,
    AuthenticatedUser(user): AuthenticatedUser,
    payload: Result<Json<TimelineRequest>, JsonRejection>,
) -> Result<Json<MyHomeTimeline>, ApiError> {
    let Json(req) = payload?;
    let page = state
        .timelines
        .get_my_home_timeline(user, req.pagination_key.as_deref(), req.limit)
        .await?;
    Ok(Json(page))
}

/// `POST /hub/add-post`
///
/// # Errors
///
/// 400 when the content or tags break the posting rules.
pub async fn add_post<S: FeedStore>(
    State(state): State<Arc<AppState<S>>>,
    AuthenticatedUser(user): AuthenticatedUser,
    payload: Result<Json<AddPostRequest>, JsonRejection>,
) -> Result<Json<AddPostResponse>, ApiError> {
    let Json(req) = payload?;
    req.validate()?;
    let post = state.posts.publish(user, req.content, req.tags).await?;
    Ok(Json(AddPostResponse { post_id: post.id }))
}

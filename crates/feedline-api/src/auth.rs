//! Bearer-token authentication.
//!
//! Tokens are issued by the hub's authentication service. This layer only
//! resolves them to a [`UserId`] through the [`SessionStore`].
//!
//! [`SessionStore`]: feedline_core::store::SessionStore

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use feedline_core::{FeedError, FeedStore};
use feedline_types::UserId;
use tracing::debug;

use crate::error::ApiError;
use crate::state::AppState;

/// The caller identified by the request's `Authorization: Bearer` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser(pub UserId);

impl<S: FeedStore> FromRequestParts<Arc<AppState<S>>> for AuthenticatedUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState<S>>,
    ) -> Result<Self, Self::Rejection> {
        let Some(token) = bearer_token(parts) else {
            debug!("request without bearer token");
            return Err(ApiError::Unauthorized);
        };

        match state.store.resolve_session(token).await {
            Ok(Some(user)) => Ok(Self(user)),
            Ok(None) => {
                debug!("unknown or expired session token");
                Err(ApiError::Unauthorized)
            }
            Err(err) => Err(FeedError::from(err).into()),
        }
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

//! Authorization gate for protected routes.
//!
//! Flow Overview: read the bearer token, verify it against the signing keys,
//! and attach the resulting [`Principal`] to the request so handlers can use
//! it. No header means 401; a token that fails verification for any reason
//! (bad signature, expired, malformed) means 403. The rejected request never
//! reaches the handler.

use axum::{
    extract::{Extension, Request},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use super::{state::AuthState, utils::extract_bearer_token};
use crate::api::error::ApiError;
use crate::auth::TokenKeys;

/// Authenticated identity taken from a verified token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Principal {
    pub user_id: Uuid,
    pub email: String,
}

/// Decide whether the request headers carry a valid token at `now_unix_seconds`.
///
/// # Errors
/// [`ApiError::Unauthorized`] when no bearer token is present,
/// [`ApiError::Forbidden`] when the token does not verify.
pub fn authorize(
    headers: &HeaderMap,
    keys: &TokenKeys,
    now_unix_seconds: i64,
) -> Result<Principal, ApiError> {
    let Some(token) = extract_bearer_token(headers) else {
        debug!("Missing bearer token");
        return Err(ApiError::Unauthorized);
    };

    match keys.verify(&token, now_unix_seconds) {
        Ok(claims) => Ok(Principal {
            user_id: claims.user_id,
            email: claims.email,
        }),
        Err(err) if err.is_expired() => {
            debug!("Rejected expired bearer token");
            Err(ApiError::Forbidden)
        }
        Err(err) => {
            warn!("Rejected bearer token: {}", err);
            Err(ApiError::Forbidden)
        }
    }
}

/// Middleware applied with `route_layer` to every protected route.
pub async fn require_token(
    auth_state: Extension<Arc<AuthState>>,
    mut request: Request,
    next: Next,
) -> Response {
    match authorize(
        request.headers(),
        auth_state.keys(),
        Utc::now().timestamp(),
    ) {
        Ok(principal) => {
            request.extensions_mut().insert(principal);
            next.run(request).await
        }
        Err(err) => err.into_response(),
    }
}

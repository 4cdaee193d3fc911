//! Password login.
//!
//! Unknown email and wrong password return the same response, and both paths
//! run one Argon2 verification.

use axum::{extract::Extension, http::StatusCode, Json};
use std::sync::Arc;
use tracing::{debug, error, info, instrument};

use super::{
    state::AuthState,
    types::{AuthResponse, LoginRequest, UserSummary},
    utils::{decoy_hash, normalize_email, verify_password_blocking},
};
use crate::api::error::{ApiError, ErrorBody};
use crate::store::{SharedStore, UserStore};

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in", body = AuthResponse),
        (status = 400, description = "Invalid credentials", body = ErrorBody),
        (status = 500, description = "Login could not be completed", body = ErrorBody),
    ),
    tag = "auth"
)]
#[instrument(skip(store, auth_state, payload))]
pub async fn login(
    store: Extension<SharedStore>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<LoginRequest>>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let Some(Json(request)) = payload else {
        return Err(ApiError::MissingPayload);
    };
    let email = normalize_email(&request.email);

    let user = match store.find_by_email(&email).await {
        Ok(user) => user,
        Err(err) => {
            error!("Failed to lookup user: {:#}", err);
            return Err(ApiError::internal("Error logging in"));
        }
    };

    let Some(user) = user else {
        if let Some(decoy) = decoy_hash() {
            verify_password_blocking(request.password, decoy.to_string()).await;
        }
        debug!("Login rejected: unknown email");
        return Err(ApiError::InvalidCredentials);
    };

    if !verify_password_blocking(request.password, user.password_hash.clone()).await {
        debug!("Login rejected: password mismatch");
        return Err(ApiError::InvalidCredentials);
    }

    let token = auth_state.issue_for(&user).map_err(|err| {
        error!("Failed to issue token: {}", err);
        ApiError::internal("Error logging in")
    })?;

    info!(user_id = %user.id, "User logged in");

    Ok((
        StatusCode::OK,
        Json(AuthResponse {
            message: "Login successful".to_string(),
            token,
            user: UserSummary::from(&user),
        }),
    ))
}

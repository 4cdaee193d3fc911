//! Account creation.
//!
//! Flow Overview: validate the payload, hash the password, then let the
//! store's unique email index decide whether the account is new. There is no
//! existence check before the insert, so concurrent signups for one email
//! produce exactly one account.

use axum::{extract::Extension, http::StatusCode, Json};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

use super::{
    state::AuthState,
    types::{AuthResponse, SignupRequest, UserSummary},
    utils::{hash_password_blocking, normalize_email, valid_email},
};
use crate::api::error::{ApiError, ErrorBody};
use crate::store::{NewUser, SharedStore, StoreError, UserStore};

/// Trimmed, normalized signup input.
#[derive(Debug, PartialEq, Eq)]
pub(super) struct SignupInput {
    pub name: String,
    pub email: String,
    pub password: String,
}

pub(super) fn validate_signup(request: SignupRequest) -> Result<SignupInput, ApiError> {
    let name = request.name.trim().to_string();
    if name.is_empty() {
        return Err(ApiError::Validation("Name is required".to_string()));
    }

    let email = normalize_email(&request.email);
    if email.is_empty() {
        return Err(ApiError::Validation("Email is required".to_string()));
    }
    if !valid_email(&email) {
        return Err(ApiError::Validation("Invalid email".to_string()));
    }

    if request.password.is_empty() {
        return Err(ApiError::Validation("Password is required".to_string()));
    }

    Ok(SignupInput {
        name,
        email,
        password: request.password,
    })
}

#[utoipa::path(
    post,
    path = "/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "User created and signed in", body = AuthResponse),
        (status = 400, description = "Missing or invalid fields, or the email is taken", body = ErrorBody),
        (status = 500, description = "Account could not be created", body = ErrorBody),
    ),
    tag = "auth"
)]
#[instrument(skip(store, auth_state, payload))]
pub async fn signup(
    store: Extension<SharedStore>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<SignupRequest>>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let Some(Json(request)) = payload else {
        return Err(ApiError::MissingPayload);
    };
    let input = validate_signup(request)?;

    let password_hash = hash_password_blocking(input.password)
        .await
        .map_err(|err| {
            error!("Failed to hash password: {:#}", err);
            ApiError::internal("Error creating user")
        })?;

    let user = match store
        .create(NewUser {
            name: input.name,
            email: input.email,
            password_hash,
        })
        .await
    {
        Ok(user) => user,
        Err(StoreError::DuplicateEmail) => {
            warn!("Signup rejected: email already registered");
            return Err(ApiError::DuplicateEmail);
        }
        Err(StoreError::Backend(err)) => {
            error!("Failed to create user: {:#}", err);
            return Err(ApiError::internal("Error creating user"));
        }
    };

    let token = auth_state.issue_for(&user).map_err(|err| {
        error!("Failed to issue token: {}", err);
        ApiError::internal("Error creating user")
    })?;

    info!(user_id = %user.id, "User created");

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: "User created successfully".to_string(),
            token,
            user: UserSummary::from(&user),
        }),
    ))
}

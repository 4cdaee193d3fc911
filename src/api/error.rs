//! Error responses shared by every handler.
//!
//! Each variant maps to one status code and a JSON body of the form
//! `{"message": "..."}`. Internal failures may carry a short `error` detail;
//! storage and hashing errors are logged where they happen and never echoed.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct ErrorBody {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ApiError {
    #[error("Missing payload")]
    MissingPayload,
    #[error("{0}")]
    Validation(String),
    #[error("User already exists")]
    DuplicateEmail,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Access denied")]
    Unauthorized,
    #[error("Invalid token")]
    Forbidden,
    #[error("{message}")]
    Internal {
        message: &'static str,
        detail: Option<String>,
    },
}

impl ApiError {
    #[must_use]
    pub fn internal(message: &'static str) -> Self {
        Self::Internal {
            message,
            detail: None,
        }
    }

    #[must_use]
    pub fn internal_with_detail(message: &'static str, detail: impl Into<String>) -> Self {
        Self::Internal {
            message,
            detail: Some(detail.into()),
        }
    }

    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::MissingPayload
            | Self::Validation(_)
            | Self::DuplicateEmail
            | Self::InvalidCredentials => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    #[must_use]
    pub fn body(&self) -> ErrorBody {
        let error = match self {
            Self::Internal { detail, .. } => detail.clone(),
            _ => None,
        };
        ErrorBody {
            message: self.to_string(),
            error,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.body())).into_response()
    }
}

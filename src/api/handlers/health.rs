use crate::api::GIT_COMMIT_HASH;
use crate::store::{SharedStore, Store};
use axum::{
    body::Body,
    extract::Extension,
    http::{HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct Health {
    commit: String,
    name: String,
    version: String,
    database: String,
}

#[utoipa::path(
    get,
    path= "/health",
    responses (
        (status = 200, description = "Database is reachable", body = [Health]),
        (status = 503, description = "Database is unreachable", body = [Health])
    ),
    tag= "health"
)]
// axum handler for health
pub async fn health(method: Method, store: Extension<SharedStore>) -> impl IntoResponse {
    let result = store.ping().await;
    if let Err(err) = &result {
        error!("Database health check failed: {:#}", err);
    }

    let health = Health {
        commit: GIT_COMMIT_HASH.to_string(),
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: if result.is_ok() {
            "ok".to_string()
        } else {
            "error".to_string()
        },
    };

    let body = if method == Method::GET {
        Json(&health).into_response()
    } else {
        Body::empty().into_response()
    };

    let short_hash = if health.commit.len() > 7 {
        &health.commit[0..7]
    } else {
        ""
    };

    let headers = format!("{}:{}:{}", health.name, health.version, short_hash)
        .parse::<HeaderValue>()
        .map(|x_app_header_value| {
            debug!("X-App header: {:?}", x_app_header_value);

            let mut headers = HeaderMap::new();
            headers.insert("X-App", x_app_header_value);
            headers
        })
        .map_err(|err| {
            error!("Failed to parse X-App header: {}", err);
        })
        .unwrap_or_else(|()| HeaderMap::new());

    if result.is_ok() {
        debug!("Database connection is healthy");
        (StatusCode::OK, headers, body)
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, headers, body)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::store::{
        Event, EventStore, MemoryStore, NewEvent, NewUser, Store, StoreError, User, UserStore,
    };
    use anyhow::anyhow;
    use async_trait::async_trait;
    use axum::body::to_bytes;
    use std::sync::Arc;

    struct DownStore;

    #[async_trait]
    impl UserStore for DownStore {
        async fn find_by_email(&self, _email: &str) -> Result<Option<User>, StoreError> {
            Err(anyhow!("down").into())
        }

        async fn create(&self, _user: NewUser) -> Result<User, StoreError> {
            Err(anyhow!("down").into())
        }
    }

    #[async_trait]
    impl EventStore for DownStore {
        async fn list_events(&self) -> Result<Vec<Event>, StoreError> {
            Err(anyhow!("down").into())
        }

        async fn insert_event(&self, _event: NewEvent) -> Result<Event, StoreError> {
            Err(anyhow!("down").into())
        }

        async fn count_events(&self) -> Result<i64, StoreError> {
            Err(anyhow!("down").into())
        }

        async fn replace_events(&self, _events: Vec<NewEvent>) -> Result<usize, StoreError> {
            Err(anyhow!("down").into())
        }
    }

    #[async_trait]
    impl Store for DownStore {
        async fn ping(&self) -> Result<(), StoreError> {
            Err(anyhow!("connection refused").into())
        }
    }

    #[tokio::test]
    async fn healthy_store_reports_ok() {
        let store: SharedStore = Arc::new(MemoryStore::new());
        let response = health(Method::GET, Extension(store)).await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("X-App"));

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let health: Health = serde_json::from_slice(&body).unwrap();
        assert_eq!(health.database, "ok");
        assert_eq!(health.name, env!("CARGO_PKG_NAME"));
    }

    #[tokio::test]
    async fn unreachable_store_is_unavailable() {
        let store: SharedStore = Arc::new(DownStore);
        let response = health(Method::GET, Extension(store)).await.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn head_has_empty_body() {
        let store: SharedStore = Arc::new(MemoryStore::new());
        let response = health(Method::HEAD, Extension(store)).await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(body.is_empty());
    }
}

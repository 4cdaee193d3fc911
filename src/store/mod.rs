//! Persistence for users (the credential store) and the event catalog.
//!
//! Handlers only see the [`Store`] trait object. `PgStore` backs the running
//! service; `MemoryStore` keeps the same contract in-process.
//!
//! Email uniqueness is a storage invariant: [`UserStore::create`] is a single
//! insert-or-fail and reports [`StoreError::DuplicateEmail`] when the email is
//! already taken. Callers never check for an existing user before inserting.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

mod memory;
mod postgres;
pub mod schema;
pub mod seed;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("a user with this email already exists")]
    DuplicateEmail,
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Stored user record. `password_hash` is always a PHC string.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Fields supplied on signup; id and timestamp are assigned by the store.
#[derive(Clone, Debug)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub date: DateTime<Utc>,
    pub location: String,
    pub category: String,
    pub organizer: String,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A validated event ready to be inserted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewEvent {
    pub title: String,
    pub description: String,
    pub date: DateTime<Utc>,
    pub location: String,
    pub category: String,
    pub organizer: String,
    pub image: Option<String>,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Look up a user by normalized email; absence is `Ok(None)`.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// Insert a new user, failing with [`StoreError::DuplicateEmail`] if the
    /// email is taken.
    async fn create(&self, user: NewUser) -> Result<User, StoreError>;
}

#[async_trait]
pub trait EventStore: Send + Sync {
    /// All events, earliest `date` first.
    async fn list_events(&self) -> Result<Vec<Event>, StoreError>;

    async fn insert_event(&self, event: NewEvent) -> Result<Event, StoreError>;

    async fn count_events(&self) -> Result<i64, StoreError>;

    /// Delete every event and insert `events`, all or nothing.
    async fn replace_events(&self, events: Vec<NewEvent>) -> Result<usize, StoreError>;
}

#[async_trait]
pub trait Store: UserStore + EventStore {
    /// Cheap round-trip used by `/health`.
    async fn ping(&self) -> Result<(), StoreError>;
}

pub type SharedStore = Arc<dyn Store>;

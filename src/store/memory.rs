use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Event, EventStore, NewEvent, NewUser, Store, StoreError, User, UserStore};

#[derive(Debug, Default)]
struct State {
    // keyed by normalized email
    users: HashMap<String, User>,
    events: Vec<Event>,
}

/// In-process store with the same uniqueness and ordering rules as `PgStore`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn materialize(event: NewEvent) -> Event {
    Event {
        id: Uuid::new_v4(),
        title: event.title,
        description: event.description,
        date: event.date,
        location: event.location,
        category: event.category,
        organizer: event.organizer,
        image: event.image,
        created_at: Utc::now(),
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self.state.read().await.users.get(email).cloned())
    }

    async fn create(&self, user: NewUser) -> Result<User, StoreError> {
        // The write lock makes the occupancy check and the insert one step.
        let mut state = self.state.write().await;
        if state.users.contains_key(&user.email) {
            return Err(StoreError::DuplicateEmail);
        }
        let record = User {
            id: Uuid::new_v4(),
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            created_at: Utc::now(),
        };
        state.users.insert(record.email.clone(), record.clone());
        Ok(record)
    }
}

#[async_trait]
impl EventStore for MemoryStore {
    async fn list_events(&self) -> Result<Vec<Event>, StoreError> {
        let mut events = self.state.read().await.events.clone();
        events.sort_by_key(|event| (event.date, event.created_at));
        Ok(events)
    }

    async fn insert_event(&self, event: NewEvent) -> Result<Event, StoreError> {
        let event = materialize(event);
        self.state.write().await.events.push(event.clone());
        Ok(event)
    }

    async fn count_events(&self) -> Result<i64, StoreError> {
        let count = self.state.read().await.events.len();
        Ok(i64::try_from(count).unwrap_or(i64::MAX))
    }

    async fn replace_events(&self, events: Vec<NewEvent>) -> Result<usize, StoreError> {
        let replacement: Vec<Event> = events.into_iter().map(materialize).collect();
        let count = replacement.len();
        self.state.write().await.events = replacement;
        Ok(count)
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

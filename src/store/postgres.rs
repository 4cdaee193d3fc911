use anyhow::Context;
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, postgres::PgRow, Connection, PgPool, Row};
use std::time::Duration;
use tracing::{info_span, Instrument};
use uuid::Uuid;

use super::{Event, EventStore, NewEvent, NewUser, Store, StoreError, User, UserStore};

const USER_COLUMNS: &str = "id, name, email, password_hash, created_at";
const EVENT_COLUMNS: &str =
    "id, title, description, date, location, category, organizer, image, created_at";

/// Postgres-backed store.
#[derive(Clone, Debug)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a connection pool and make sure at least one connection works.
    ///
    /// # Errors
    /// Returns an error if the database is unreachable.
    pub async fn connect(dsn: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .min_connections(1)
            .max_connections(5)
            .max_lifetime(Duration::from_secs(60 * 2))
            .test_before_acquire(true)
            .connect(dsn)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// SQLSTATE 23505 is `unique_violation`.
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

fn user_from_row(row: &PgRow) -> User {
    User {
        id: row.get("id"),
        name: row.get("name"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        created_at: row.get("created_at"),
    }
}

fn event_from_row(row: &PgRow) -> Event {
    Event {
        id: row.get("id"),
        title: row.get("title"),
        description: row.get("description"),
        date: row.get("date"),
        location: row.get("location"),
        category: row.get("category"),
        organizer: row.get("organizer"),
        image: row.get("image"),
        created_at: row.get("created_at"),
    }
}

fn db_span(operation: &'static str, statement: &str) -> tracing::Span {
    info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = operation,
        db.statement = statement
    )
}

#[async_trait]
impl UserStore for PgStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let row = sqlx::query(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .instrument(db_span("SELECT", &query))
            .await
            .context("failed to lookup user by email")?;

        Ok(row.as_ref().map(user_from_row))
    }

    async fn create(&self, user: NewUser) -> Result<User, StoreError> {
        // One statement: the unique index on email decides, not a prior SELECT.
        let query = format!(
            "INSERT INTO users (id, name, email, password_hash) VALUES ($1, $2, $3, $4) RETURNING {USER_COLUMNS}"
        );
        let result = sqlx::query(&query)
            .bind(Uuid::new_v4())
            .bind(&user.name)
            .bind(&user.email)
            .bind(&user.password_hash)
            .fetch_one(&self.pool)
            .instrument(db_span("INSERT", &query))
            .await;

        match result {
            Ok(row) => Ok(user_from_row(&row)),
            Err(err) if is_unique_violation(&err) => Err(StoreError::DuplicateEmail),
            Err(err) => Err(anyhow::Error::new(err)
                .context("failed to insert user")
                .into()),
        }
    }
}

#[async_trait]
impl EventStore for PgStore {
    async fn list_events(&self) -> Result<Vec<Event>, StoreError> {
        let query = format!("SELECT {EVENT_COLUMNS} FROM events ORDER BY date ASC, created_at ASC");
        let rows = sqlx::query(&query)
            .fetch_all(&self.pool)
            .instrument(db_span("SELECT", &query))
            .await
            .context("failed to list events")?;

        Ok(rows.iter().map(event_from_row).collect())
    }

    async fn insert_event(&self, event: NewEvent) -> Result<Event, StoreError> {
        let query = format!(
            "INSERT INTO events (id, title, description, date, location, category, organizer, image)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {EVENT_COLUMNS}"
        );
        let row = sqlx::query(&query)
            .bind(Uuid::new_v4())
            .bind(&event.title)
            .bind(&event.description)
            .bind(event.date)
            .bind(&event.location)
            .bind(&event.category)
            .bind(&event.organizer)
            .bind(&event.image)
            .fetch_one(&self.pool)
            .instrument(db_span("INSERT", &query))
            .await
            .context("failed to insert event")?;

        Ok(event_from_row(&row))
    }

    async fn count_events(&self) -> Result<i64, StoreError> {
        let query = "SELECT COUNT(*) AS count FROM events";
        let row = sqlx::query(query)
            .fetch_one(&self.pool)
            .instrument(db_span("SELECT", query))
            .await
            .context("failed to count events")?;

        Ok(row.get("count"))
    }

    async fn replace_events(&self, events: Vec<NewEvent>) -> Result<usize, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("begin replace events transaction")?;

        let query = "DELETE FROM events";
        sqlx::query(query)
            .execute(&mut *tx)
            .instrument(db_span("DELETE", query))
            .await
            .context("failed to clear events")?;

        let query = "INSERT INTO events (id, title, description, date, location, category, organizer, image)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)";
        for event in &events {
            sqlx::query(query)
                .bind(Uuid::new_v4())
                .bind(&event.title)
                .bind(&event.description)
                .bind(event.date)
                .bind(&event.location)
                .bind(&event.category)
                .bind(&event.organizer)
                .bind(&event.image)
                .execute(&mut *tx)
                .instrument(db_span("INSERT", query))
                .await
                .context("failed to insert event")?;
        }

        tx.commit()
            .await
            .context("commit replace events transaction")?;

        Ok(events.len())
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self
            .pool
            .acquire()
            .instrument(info_span!(
                "db.acquire",
                db.system = "postgresql",
                db.operation = "ACQUIRE"
            ))
            .await
            .context("failed to acquire database connection")?;
        conn.ping()
            .instrument(info_span!(
                "db.ping",
                db.system = "postgresql",
                db.operation = "PING"
            ))
            .await
            .context("failed to ping database")?;
        Ok(())
    }
}

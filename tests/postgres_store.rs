//! Store contract against a live Postgres.
//!
//! Set `MEETMATCH_TEST_DSN` to a disposable database to run these; without it
//! every test returns early.

use anyhow::Result;
use chrono::{TimeZone, Utc};
use meetmatch::store::{
    schema::apply_schema, seed, EventStore, NewEvent, NewUser, PgStore, Store, StoreError,
    UserStore,
};
use uuid::Uuid;

async fn store() -> Result<Option<PgStore>> {
    let Ok(dsn) = std::env::var("MEETMATCH_TEST_DSN") else {
        eprintln!("Skipping test: MEETMATCH_TEST_DSN not set");
        return Ok(None);
    };
    let store = PgStore::connect(&dsn).await?;
    apply_schema(store.pool()).await?;
    Ok(Some(store))
}

fn unique_email() -> String {
    format!("{}@test.meetmatch.dev", Uuid::new_v4().simple())
}

#[tokio::test]
async fn duplicate_email_is_rejected_by_the_database() -> Result<()> {
    let Some(store) = store().await? else {
        return Ok(());
    };
    store.ping().await?;

    let email = unique_email();
    let created = store
        .create(NewUser {
            name: "First".to_string(),
            email: email.clone(),
            password_hash: "$argon2id$stub".to_string(),
        })
        .await?;

    let second = store
        .create(NewUser {
            name: "Second".to_string(),
            email: email.clone(),
            password_hash: "$argon2id$other".to_string(),
        })
        .await;
    assert!(matches!(second, Err(StoreError::DuplicateEmail)));

    let found = store.find_by_email(&email).await?;
    assert_eq!(found.map(|user| user.id), Some(created.id));
    Ok(())
}

#[tokio::test]
async fn events_come_back_in_date_order() -> Result<()> {
    let Some(store) = store().await? else {
        return Ok(());
    };

    let count = seed::reseed(&store).await?;
    assert_eq!(count, 6);

    let event = store
        .insert_event(NewEvent {
            title: "Early Bird".to_string(),
            description: "First of the season".to_string(),
            date: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            location: "Quad".to_string(),
            category: "Social".to_string(),
            organizer: "Student Union".to_string(),
            image: None,
        })
        .await?;

    let events = store.list_events().await?;
    assert_eq!(events.len(), 7);
    assert_eq!(events.first().map(|e| e.id), Some(event.id));
    assert!(events.windows(2).all(|pair| pair[0].date <= pair[1].date));
    assert_eq!(store.count_events().await?, 7);
    Ok(())
}

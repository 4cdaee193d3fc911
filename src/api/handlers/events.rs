//! Event catalog handlers. Every route here sits behind the token gate.

use axum::{extract::Extension, http::StatusCode, Json};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument};
use utoipa::ToSchema;

use super::auth::Principal;
use crate::api::error::{ApiError, ErrorBody};
use crate::store::{seed, Event, EventStore, NewEvent, SharedStore};

#[derive(ToSchema, Serialize, Deserialize, Debug, Default)]
pub struct CreateEventRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// RFC 3339 timestamp or a plain `YYYY-MM-DD` date (midnight UTC).
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub organizer: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct EventCreated {
    pub message: String,
    pub event: Event,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SeedResult {
    pub message: String,
    pub count: usize,
}

fn required(field: &'static str, value: Option<String>) -> Result<String, String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| format!("{field} is required"))
}

pub(crate) fn parse_event_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Check required fields and parse the date. The error names the first bad field.
pub(crate) fn validate_event(request: CreateEventRequest) -> Result<NewEvent, String> {
    let title = required("title", request.title)?;
    let description = required("description", request.description)?;
    let raw_date = required("date", request.date)?;
    let date = parse_event_date(&raw_date)
        .ok_or_else(|| "date must be an RFC 3339 timestamp or YYYY-MM-DD".to_string())?;
    let location = required("location", request.location)?;
    let category = required("category", request.category)?;
    let organizer = required("organizer", request.organizer)?;
    let image = request
        .image
        .map(|image| image.trim().to_string())
        .filter(|image| !image.is_empty());

    Ok(NewEvent {
        title,
        description,
        date,
        location,
        category,
        organizer,
        image,
    })
}

#[utoipa::path(
    get,
    path = "/events",
    responses(
        (status = 200, description = "All events, soonest first", body = [Event]),
        (status = 401, description = "No bearer token", body = ErrorBody),
        (status = 403, description = "Token rejected", body = ErrorBody),
        (status = 500, description = "Events could not be read", body = ErrorBody),
    ),
    security(("bearer_token" = [])),
    tag = "events"
)]
#[instrument(skip(store, principal), fields(user_id = %principal.user_id))]
pub async fn list_events(
    store: Extension<SharedStore>,
    principal: Extension<Principal>,
) -> Result<Json<Vec<Event>>, ApiError> {
    match store.list_events().await {
        Ok(events) => {
            debug!("Listing {} events", events.len());
            Ok(Json(events))
        }
        Err(err) => {
            error!("Failed to list events: {:#}", err);
            Err(ApiError::internal("Error fetching events"))
        }
    }
}

#[utoipa::path(
    post,
    path = "/events",
    request_body = CreateEventRequest,
    responses(
        (status = 201, description = "Event created", body = EventCreated),
        (status = 401, description = "No bearer token", body = ErrorBody),
        (status = 403, description = "Token rejected", body = ErrorBody),
        (status = 500, description = "Event rejected or not stored", body = ErrorBody),
    ),
    security(("bearer_token" = [])),
    tag = "events"
)]
#[instrument(skip(store, principal, payload), fields(user_id = %principal.user_id))]
pub async fn create_event(
    store: Extension<SharedStore>,
    principal: Extension<Principal>,
    payload: Option<Json<CreateEventRequest>>,
) -> Result<(StatusCode, Json<EventCreated>), ApiError> {
    let request = payload.map(|Json(request)| request).unwrap_or_default();

    let event = validate_event(request).map_err(|detail| {
        debug!("Event rejected: {}", detail);
        ApiError::internal_with_detail("Error creating event", detail)
    })?;

    match store.insert_event(event).await {
        Ok(event) => {
            info!(event_id = %event.id, "Event created");
            Ok((
                StatusCode::CREATED,
                Json(EventCreated {
                    message: "Event created successfully".to_string(),
                    event,
                }),
            ))
        }
        Err(err) => {
            error!("Failed to insert event: {:#}", err);
            Err(ApiError::internal("Error creating event"))
        }
    }
}

#[utoipa::path(
    post,
    path = "/events/seed",
    responses(
        (status = 200, description = "Catalog replaced with the sample events", body = SeedResult),
        (status = 401, description = "No bearer token", body = ErrorBody),
        (status = 403, description = "Token rejected", body = ErrorBody),
        (status = 500, description = "Catalog could not be replaced", body = ErrorBody),
    ),
    security(("bearer_token" = [])),
    tag = "events"
)]
#[instrument(skip(store, principal), fields(user_id = %principal.user_id))]
pub async fn seed_events(
    store: Extension<SharedStore>,
    principal: Extension<Principal>,
) -> Result<Json<SeedResult>, ApiError> {
    match seed::reseed(store.0.as_ref()).await {
        Ok(count) => {
            info!("Catalog reseeded with {} sample events", count);
            Ok(Json(SeedResult {
                message: "Sample events created successfully".to_string(),
                count,
            }))
        }
        Err(err) => {
            error!("Failed to seed events: {:#}", err);
            Err(ApiError::internal("Error seeding events"))
        }
    }
}

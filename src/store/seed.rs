//! Sample event catalog loaded into an empty database.

use chrono::{DateTime, NaiveDate, Utc};
use tracing::info;

use super::{EventStore, NewEvent, StoreError};

struct Sample {
    title: &'static str,
    description: &'static str,
    date: (i32, u32, u32),
    location: &'static str,
    category: &'static str,
    organizer: &'static str,
    image: &'static str,
}

const SAMPLES: &[Sample] = &[
    Sample {
        title: "Tech Fest 2025",
        description: "Annual technical festival featuring hackathons, coding competitions, and tech talks",
        date: (2025, 11, 15),
        location: "Main Auditorium",
        category: "Technical",
        organizer: "Tech Club",
        image: "https://images.unsplash.com/photo-1540575467063-178a50c2df87?w=400",
    },
    Sample {
        title: "Cultural Night",
        description: "Showcase of music, dance, and drama performances by students",
        date: (2025, 11, 20),
        location: "Open Air Theatre",
        category: "Cultural",
        organizer: "Cultural Committee",
        image: "https://images.unsplash.com/photo-1514525253161-7a46d19cd819?w=400",
    },
    Sample {
        title: "Sports Meet",
        description: "Inter-college sports competition including cricket, football, and athletics",
        date: (2025, 11, 25),
        location: "Sports Complex",
        category: "Sports",
        organizer: "Sports Department",
        image: "https://images.unsplash.com/photo-1461896836934-ffe607ba8211?w=400",
    },
    Sample {
        title: "Career Fair",
        description: "Meet with top recruiters and explore career opportunities",
        date: (2025, 12, 1),
        location: "Convention Center",
        category: "Career",
        organizer: "Placement Cell",
        image: "https://images.unsplash.com/photo-1521737711867-e3b97375f902?w=400",
    },
    Sample {
        title: "Hackathon 2025",
        description: "24-hour coding marathon to build innovative solutions",
        date: (2025, 12, 5),
        location: "Computer Science Building",
        category: "Technical",
        organizer: "Coding Club",
        image: "https://images.unsplash.com/photo-1504384308090-c894fdcc538d?w=400",
    },
    Sample {
        title: "Art Exhibition",
        description: "Student artwork showcase featuring paintings, sculptures, and digital art",
        date: (2025, 12, 10),
        location: "Art Gallery",
        category: "Cultural",
        organizer: "Fine Arts Department",
        image: "https://images.unsplash.com/photo-1460661419201-fd4cecdf8a8b?w=400",
    },
];

fn midnight_utc((year, month, day): (i32, u32, u32)) -> Option<DateTime<Utc>> {
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// The built-in sample catalog.
#[must_use]
pub fn sample_events() -> Vec<NewEvent> {
    SAMPLES
        .iter()
        .filter_map(|sample| {
            Some(NewEvent {
                title: sample.title.to_string(),
                description: sample.description.to_string(),
                date: midnight_utc(sample.date)?,
                location: sample.location.to_string(),
                category: sample.category.to_string(),
                organizer: sample.organizer.to_string(),
                image: Some(sample.image.to_string()),
            })
        })
        .collect()
}

/// Insert the sample catalog when no events exist yet. Returns how many rows
/// were added.
///
/// # Errors
/// Returns an error if the store cannot be read or written.
pub async fn seed_if_empty<S: EventStore + ?Sized>(store: &S) -> Result<usize, StoreError> {
    if store.count_events().await? > 0 {
        return Ok(0);
    }
    let inserted = store.replace_events(sample_events()).await?;
    info!("Sample events added to database: {}", inserted);
    Ok(inserted)
}

/// Replace the whole catalog with the sample set.
///
/// # Errors
/// Returns an error if the store rejects the replacement.
pub async fn reseed<S: EventStore + ?Sized>(store: &S) -> Result<usize, StoreError> {
    store.replace_events(sample_events()).await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn all_samples_have_valid_dates() {
        let events = sample_events();
        assert_eq!(events.len(), SAMPLES.len());
        assert!(events.windows(2).all(|pair| pair[0].date < pair[1].date));
    }

    #[tokio::test]
    async fn seeds_only_once() {
        let store = MemoryStore::new();
        assert_eq!(seed_if_empty(&store).await.unwrap(), 6);
        assert_eq!(seed_if_empty(&store).await.unwrap(), 0);
        assert_eq!(store.count_events().await.unwrap(), 6);
    }

    #[tokio::test]
    async fn reseed_resets_catalog() {
        let store = MemoryStore::new();
        seed_if_empty(&store).await.unwrap();
        store
            .insert_event(NewEvent {
                title: "Extra".to_string(),
                ..sample_events().remove(0)
            })
            .await
            .unwrap();
        assert_eq!(store.count_events().await.unwrap(), 7);
        assert_eq!(reseed(&store).await.unwrap(), 6);
        assert_eq!(store.count_events().await.unwrap(), 6);
    }
}

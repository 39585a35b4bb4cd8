#![allow(dead_code)]

use std::sync::Arc;

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use uuid::Uuid;

use eventhub_server::clock::FixedClock;
use eventhub_server::models::{Event, Identity, NewEvent, Profile, Role};
use eventhub_server::repository::AppRegistry;
use eventhub_server::state::AppState;

pub fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 9, d).unwrap()
}

/// Services over `registry` that believe it is noon on `date`.
pub fn state_on(registry: &AppRegistry, date: NaiveDate) -> AppState {
    AppState::with_clock(registry.clone(), Arc::new(FixedClock::on(date)))
}

pub async fn seed_profile(registry: &AppRegistry, role: Role) -> Identity {
    let id = Uuid::new_v4();
    let profile = Profile {
        id,
        email: format!("{id}@eventhub.test"),
        full_name: format!("{} {}", role.as_str(), &id.to_string()[..8]),
        role,
        bio: None,
        location: None,
        created_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
    };
    registry
        .profile_repository()
        .create(&profile)
        .await
        .unwrap();
    Identity::from(&profile)
}

pub fn new_event(title: &str, date: NaiveDate, capacity: i32) -> NewEvent {
    serde_json::from_value(serde_json::json!({
        "title": title,
        "date": date,
        "capacity": capacity,
    }))
    .unwrap()
}

/// Publishes an active event as `organizer`.
pub async fn publish(
    state: &AppState,
    organizer: &Identity,
    date: NaiveDate,
    capacity: i32,
) -> Event {
    state
        .catalog()
        .create_event(organizer, new_event("Rust Meetup", date, capacity))
        .await
        .unwrap()
}

pub fn days_after(date: NaiveDate, days: i64) -> NaiveDate {
    date + Duration::days(days)
}

//! Read-side statistics.
//!
//! Every figure here is recomputed from registration and feedback rows on
//! each call; nothing is cached or persisted as a counter.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

use crate::clock::Clock;
use crate::models::{Event, Feedback, Identity, Registration, Role};
use crate::repository::{
    AppRegistry, EventRepository, FeedbackRepository, ProfileRepository, RegistrationRepository,
};
use crate::services::lifecycle::{self, EffectiveStatus};
use crate::utils::error::{AppError, AppResult};

const ALMOST_FULL_RATIO: f64 = 0.8;
const RECENT_LIMIT: usize = 5;

/// Seat-holding registrations in `registrations`.
pub fn confirmed_count(registrations: &[Registration]) -> usize {
    registrations
        .iter()
        .filter(|registration| registration.status.holds_seat())
        .count()
}

fn confirmed_count_for(event_id: Uuid, registrations: &[Registration]) -> usize {
    registrations
        .iter()
        .filter(|registration| registration.event_id == event_id && registration.status.holds_seat())
        .count()
}

/// Unclamped; exceeds 1.0 only if capacity was lowered below the seats taken.
pub fn raw_fill_ratio(confirmed: usize, capacity: i32) -> f64 {
    if capacity < 1 {
        return 0.0;
    }
    confirmed as f64 / f64::from(capacity)
}

/// Fill ratio clamped to `[0, 1]` for display.
pub fn fill_ratio(confirmed: usize, capacity: i32) -> f64 {
    raw_fill_ratio(confirmed, capacity).clamp(0.0, 1.0)
}

pub fn is_almost_full(confirmed: usize, capacity: i32) -> bool {
    raw_fill_ratio(confirmed, capacity) > ALMOST_FULL_RATIO
}

/// Mean rating, `0.0` when there is no feedback.
pub fn average_rating(feedback: &[Feedback]) -> f64 {
    if feedback.is_empty() {
        return 0.0;
    }
    let total: f64 = feedback.iter().map(|row| f64::from(row.rating)).sum();
    total / feedback.len() as f64
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventStats {
    pub event_id: Uuid,
    pub effective_status: EffectiveStatus,
    pub confirmed_count: usize,
    pub fill_ratio: f64,
    pub raw_fill_ratio: f64,
    pub almost_full: bool,
    pub average_rating: f64,
    pub feedback_count: usize,
}

/// `registrations` and `feedback` may span several events; only rows for
/// `event` are counted.
pub fn event_stats(
    event: &Event,
    registrations: &[Registration],
    feedback: &[Feedback],
    today: NaiveDate,
) -> EventStats {
    let confirmed = confirmed_count_for(event.id, registrations);
    let feedback: Vec<Feedback> = feedback
        .iter()
        .filter(|row| row.event_id == event.id)
        .cloned()
        .collect();

    EventStats {
        event_id: event.id,
        effective_status: lifecycle::effective_status(event, today),
        confirmed_count: confirmed,
        fill_ratio: fill_ratio(confirmed, event.capacity),
        raw_fill_ratio: raw_fill_ratio(confirmed, event.capacity),
        almost_full: is_almost_full(confirmed, event.capacity),
        average_rating: average_rating(&feedback),
        feedback_count: feedback.len(),
    }
}

/// An event with its derived figures, as shown on cards and lists.
#[derive(Debug, Clone, Serialize)]
pub struct EventSummary {
    #[serde(flatten)]
    pub event: Event,
    #[serde(flatten)]
    pub stats: EventStats,
}

pub fn summarize(
    event: Event,
    registrations: &[Registration],
    feedback: &[Feedback],
    today: NaiveDate,
) -> EventSummary {
    let stats = event_stats(&event, registrations, feedback, today);
    EventSummary { event, stats }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OrganizerStats {
    pub total_events: usize,
    pub total_registrations: usize,
    pub upcoming_events: usize,
    pub average_rating: f64,
}

/// `events` are the organizer's events. The rating is the mean of per-event
/// averages over events that received feedback.
pub fn organizer_stats(
    events: &[Event],
    registrations: &[Registration],
    feedback: &[Feedback],
    today: NaiveDate,
) -> OrganizerStats {
    let total_registrations = events
        .iter()
        .map(|event| confirmed_count_for(event.id, registrations))
        .sum();

    let upcoming_events = events
        .iter()
        .filter(|event| lifecycle::effective_status(event, today) == EffectiveStatus::Active)
        .count();

    let rated: Vec<f64> = events
        .iter()
        .map(|event| event_stats(event, registrations, feedback, today))
        .filter(|stats| stats.feedback_count > 0)
        .map(|stats| stats.average_rating)
        .collect();
    let average_rating = if rated.is_empty() {
        0.0
    } else {
        rated.iter().sum::<f64>() / rated.len() as f64
    };

    OrganizerStats {
        total_events: events.len(),
        total_registrations,
        upcoming_events,
        average_rating,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UserStats {
    pub total_registrations: usize,
    pub upcoming_events: usize,
}

/// `registrations` are the user's rows; `events` must contain their events.
pub fn user_stats(registrations: &[Registration], events: &[Event], today: NaiveDate) -> UserStats {
    let by_id: HashMap<Uuid, &Event> = events.iter().map(|event| (event.id, event)).collect();
    let active: Vec<&Registration> = registrations
        .iter()
        .filter(|registration| registration.status.is_active())
        .collect();

    let upcoming_events = active
        .iter()
        .filter_map(|registration| by_id.get(&registration.event_id))
        .filter(|event| lifecycle::effective_status(event, today) == EffectiveStatus::Active)
        .count();

    UserStats {
        total_registrations: active.len(),
        upcoming_events,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlatformStats {
    pub total_events: usize,
    pub total_users: u64,
    pub average_rating: f64,
    pub total_registrations: usize,
}

pub fn platform_stats(
    events: &[Event],
    registrations: &[Registration],
    feedback: &[Feedback],
    total_users: u64,
    today: NaiveDate,
) -> PlatformStats {
    PlatformStats {
        total_events: events
            .iter()
            .filter(|event| lifecycle::effective_status(event, today) == EffectiveStatus::Active)
            .count(),
        total_users,
        average_rating: average_rating(feedback),
        total_registrations: registrations
            .iter()
            .filter(|registration| registration.status.is_active())
            .count(),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub event_count: usize,
    pub confirmed_registrations: usize,
    pub events: Vec<EventSummary>,
}

/// Active events between `from` and `to` inclusive, grouped by day.
pub fn calendar(
    events: &[Event],
    registrations: &[Registration],
    feedback: &[Feedback],
    from: NaiveDate,
    to: NaiveDate,
    today: NaiveDate,
) -> Vec<CalendarDay> {
    let mut days: BTreeMap<NaiveDate, Vec<EventSummary>> = BTreeMap::new();

    for event in events {
        if event.date < from || event.date > to {
            continue;
        }
        if lifecycle::effective_status(event, today) != EffectiveStatus::Active {
            continue;
        }
        days.entry(event.date)
            .or_default()
            .push(summarize(event.clone(), registrations, feedback, today));
    }

    days.into_iter()
        .map(|(date, mut events)| {
            events.sort_by(|a, b| a.event.time.cmp(&b.event.time));
            CalendarDay {
                date,
                event_count: events.len(),
                confirmed_registrations: events.iter().map(|s| s.stats.confirmed_count).sum(),
                events,
            }
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Dashboard {
    Organizer {
        stats: OrganizerStats,
        recent_events: Vec<EventSummary>,
    },
    Attendee {
        stats: UserStats,
        recent_events: Vec<EventSummary>,
    },
}

/// Async front for the pure figures above; loads rows and derives.
#[derive(Clone)]
pub struct StatsService {
    events: Arc<dyn EventRepository>,
    registrations: Arc<dyn RegistrationRepository>,
    feedback: Arc<dyn FeedbackRepository>,
    profiles: Arc<dyn ProfileRepository>,
    clock: Arc<dyn Clock>,
}

impl StatsService {
    pub fn new(registry: &AppRegistry, clock: Arc<dyn Clock>) -> Self {
        Self {
            events: registry.event_repository(),
            registrations: registry.registration_repository(),
            feedback: registry.feedback_repository(),
            profiles: registry.profile_repository(),
            clock,
        }
    }

    async fn load_event(&self, event_id: Uuid) -> AppResult<Event> {
        self.events
            .find_by_id(event_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Event '{event_id}' was not found")))
    }

    pub async fn confirmed_count(&self, event_id: Uuid) -> AppResult<usize> {
        self.load_event(event_id).await?;
        let registrations = self.registrations.find_by_event(event_id).await?;
        Ok(confirmed_count(&registrations))
    }

    /// Drafts read as missing unless `viewer` may edit them.
    pub async fn event_stats(
        &self,
        viewer: Option<&Identity>,
        event_id: Uuid,
    ) -> AppResult<EventStats> {
        let event = self.load_event(event_id).await?;
        if !lifecycle::visible_to(&event, viewer, self.clock.today()) {
            return Err(AppError::NotFound(format!("Event '{event_id}' was not found")));
        }
        let registrations = self.registrations.find_by_event(event_id).await?;
        let feedback = self.feedback.find_by_event(event_id).await?;
        Ok(event_stats(&event, &registrations, &feedback, self.clock.today()))
    }

    pub async fn organizer_stats(&self, organizer_id: Uuid) -> AppResult<OrganizerStats> {
        let (events, registrations, feedback) = self.organizer_rows(organizer_id).await?;
        Ok(organizer_stats(&events, &registrations, &feedback, self.clock.today()))
    }

    async fn organizer_rows(
        &self,
        organizer_id: Uuid,
    ) -> AppResult<(Vec<Event>, Vec<Registration>, Vec<Feedback>)> {
        let events = self.events.find_by_organizer(organizer_id).await?;
        let mut registrations = Vec::new();
        let mut feedback = Vec::new();
        for event in &events {
            registrations.extend(self.registrations.find_by_event(event.id).await?);
            feedback.extend(self.feedback.find_by_event(event.id).await?);
        }
        Ok((events, registrations, feedback))
    }

    pub async fn user_stats(&self, user_id: Uuid) -> AppResult<UserStats> {
        let (registrations, events) = self.user_rows(user_id).await?;
        Ok(user_stats(&registrations, &events, self.clock.today()))
    }

    async fn user_rows(&self, user_id: Uuid) -> AppResult<(Vec<Registration>, Vec<Event>)> {
        let registrations = self.registrations.find_by_user(user_id).await?;
        let event_ids: HashSet<Uuid> = registrations.iter().map(|r| r.event_id).collect();
        let mut events = Vec::with_capacity(event_ids.len());
        for event_id in event_ids {
            if let Some(event) = self.events.find_by_id(event_id).await? {
                events.push(event);
            }
        }
        Ok((registrations, events))
    }

    pub async fn platform_stats(&self) -> AppResult<PlatformStats> {
        let events = self.events.find_all().await?;
        let registrations = self.registrations.find_all().await?;
        let feedback = self.feedback.find_all().await?;
        let total_users = self.profiles.count().await?;
        Ok(platform_stats(
            &events,
            &registrations,
            &feedback,
            total_users,
            self.clock.today(),
        ))
    }

    /// Organizers and admins see their events; everyone else their
    /// registrations.
    pub async fn dashboard(&self, identity: &Identity) -> AppResult<Dashboard> {
        let today = self.clock.today();

        match identity.role {
            Role::Organizer | Role::Admin => {
                let (mut events, registrations, feedback) =
                    self.organizer_rows(identity.user_id).await?;
                let stats = organizer_stats(&events, &registrations, &feedback, today);
                events.sort_by(|a, b| b.created_at.cmp(&a.created_at));
                let recent_events = events
                    .into_iter()
                    .take(RECENT_LIMIT)
                    .map(|event| summarize(event, &registrations, &feedback, today))
                    .collect();
                Ok(Dashboard::Organizer {
                    stats,
                    recent_events,
                })
            }
            Role::Consumer => {
                let (mut registrations, events) = self.user_rows(identity.user_id).await?;
                let stats = user_stats(&registrations, &events, today);
                registrations.sort_by(|a, b| b.registered_at.cmp(&a.registered_at));

                let mut recent_events = Vec::new();
                for registration in registrations.iter().take(RECENT_LIMIT) {
                    let Some(event) = events.iter().find(|e| e.id == registration.event_id) else {
                        continue;
                    };
                    let event_registrations =
                        self.registrations.find_by_event(event.id).await?;
                    let feedback = self.feedback.find_by_event(event.id).await?;
                    recent_events.push(summarize(
                        event.clone(),
                        &event_registrations,
                        &feedback,
                        today,
                    ));
                }
                Ok(Dashboard::Attendee {
                    stats,
                    recent_events,
                })
            }
        }
    }
}

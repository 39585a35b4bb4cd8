//! Effective event status.
//!
//! `draft` and `cancelled` are set explicitly by the organizer and always win.
//! `active` and `completed` are derived from the event date on every read;
//! nothing persists the transition.

use chrono::NaiveDate;
use serde::Serialize;

use crate::models::{Event, EventStatus, Identity};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectiveStatus {
    Draft,
    Active,
    Completed,
    Cancelled,
}

pub fn classify(status: EventStatus, date: NaiveDate, today: NaiveDate) -> EffectiveStatus {
    match status {
        EventStatus::Cancelled => EffectiveStatus::Cancelled,
        EventStatus::Draft => EffectiveStatus::Draft,
        EventStatus::Active | EventStatus::Completed if date < today => EffectiveStatus::Completed,
        EventStatus::Active | EventStatus::Completed => EffectiveStatus::Active,
    }
}

pub fn effective_status(event: &Event, today: NaiveDate) -> EffectiveStatus {
    classify(event.status, event.date, today)
}

pub fn accepts_registrations(event: &Event, today: NaiveDate) -> bool {
    effective_status(event, today) == EffectiveStatus::Active
}

pub fn accepts_feedback(event: &Event, today: NaiveDate) -> bool {
    effective_status(event, today) == EffectiveStatus::Completed
}

/// Drafts are only visible to those who may edit them.
pub fn visible_to(event: &Event, viewer: Option<&Identity>, today: NaiveDate) -> bool {
    effective_status(event, today) != EffectiveStatus::Draft
        || viewer.is_some_and(|identity| identity.can_edit_event(event))
}

/// Check-in opens on the day of the event only.
pub fn accepts_check_in(event: &Event, today: NaiveDate) -> bool {
    accepts_registrations(event, today) && event.date == today
}

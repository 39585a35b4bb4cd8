//! Registration ledger: admission control, cancellation and check-in.
//!
//! The admission rule lives in [`check_admission`] and is evaluated by each
//! store inside its own critical section, so the count it sees is the count
//! at commit time.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::clock::Clock;
use crate::models::{
    Admission, Event, Identity, Notification, NotificationKind, Registration, RegistrationStatus,
    StatusTransition,
};
use crate::repository::{
    AppRegistry, EventRepository, NotificationRepository, RegistrationRepository,
};
use crate::services::aggregation::confirmed_count;
use crate::services::lifecycle::{self, EffectiveStatus};
use crate::utils::error::{AppError, AppResult, ConflictKind};

const MAX_TRANSITION_ATTEMPTS: usize = 3;

/// Decides whether `user_id` may take a seat at `event`, given every
/// registration currently stored for that event.
pub fn check_admission(
    event: &Event,
    registrations: &[Registration],
    user_id: Uuid,
    today: NaiveDate,
) -> AppResult<()> {
    if !lifecycle::accepts_registrations(event, today) {
        return Err(AppError::Conflict(ConflictKind::RegistrationClosed));
    }

    let already_registered = registrations
        .iter()
        .any(|registration| registration.user_id == user_id && registration.status.is_active());
    if already_registered {
        return Err(AppError::Conflict(ConflictKind::AlreadyRegistered));
    }

    let capacity = usize::try_from(event.capacity).unwrap_or(0);
    if confirmed_count(registrations) >= capacity {
        return Err(AppError::Conflict(ConflictKind::EventFull));
    }

    Ok(())
}

#[derive(Debug, Clone, Serialize)]
pub struct RegistrationWithEvent {
    #[serde(flatten)]
    pub registration: Registration,
    pub event: Option<Event>,
    pub effective_status: Option<EffectiveStatus>,
}

#[derive(Clone)]
pub struct RegistrationLedger {
    events: Arc<dyn EventRepository>,
    registrations: Arc<dyn RegistrationRepository>,
    notifications: Arc<dyn NotificationRepository>,
    clock: Arc<dyn Clock>,
}

impl RegistrationLedger {
    pub fn new(registry: &AppRegistry, clock: Arc<dyn Clock>) -> Self {
        Self {
            events: registry.event_repository(),
            registrations: registry.registration_repository(),
            notifications: registry.notification_repository(),
            clock,
        }
    }

    /// Takes a confirmed seat for the caller or explains why not.
    pub async fn register(&self, identity: &Identity, event_id: Uuid) -> AppResult<Registration> {
        let admission = Admission {
            event_id,
            user_id: identity.user_id,
            requested_at: self.clock.now(),
        };

        let registration = match self.registrations.admit(admission).await {
            Ok(registration) => registration,
            Err(err) => {
                if let Some(kind) = err.conflict() {
                    info!(%event_id, user_id = %identity.user_id, reason = kind.reason(), "Registration rejected");
                }
                return Err(err);
            }
        };

        info!(
            %event_id,
            user_id = %identity.user_id,
            registration_id = %registration.id,
            "Registration confirmed"
        );
        self.notify_confirmed(&registration).await;

        Ok(registration)
    }

    async fn notify_confirmed(&self, registration: &Registration) {
        let title = match self.events.find_by_id(registration.event_id).await {
            Ok(Some(event)) => event.title,
            Ok(None) => return,
            Err(err) => {
                warn!(error = %err, "Could not load event for confirmation notice");
                return;
            }
        };

        let notification = Notification::new(
            registration.user_id,
            NotificationKind::RegistrationConfirmed,
            "Registration confirmed",
            format!("You are registered for {title}."),
            registration.registered_at,
        );
        if let Err(err) = self.notifications.create(&notification).await {
            warn!(error = %err, registration_id = %registration.id, "Could not queue confirmation notice");
        }
    }

    /// Cancels the caller's own registration. A second cancel is a conflict
    /// and leaves the row untouched; freed seats are not handed to anyone.
    pub async fn cancel(
        &self,
        identity: &Identity,
        registration_id: Uuid,
    ) -> AppResult<Registration> {
        for _ in 0..MAX_TRANSITION_ATTEMPTS {
            let registration = self.owned_registration(identity, registration_id).await?;

            match registration.status {
                RegistrationStatus::Cancelled => {
                    return Err(AppError::Conflict(ConflictKind::AlreadyCancelled))
                }
                RegistrationStatus::CheckedIn => {
                    return Err(AppError::Conflict(ConflictKind::AlreadyCheckedIn))
                }
                RegistrationStatus::Confirmed | RegistrationStatus::Waitlist => {}
            }

            let transition = StatusTransition {
                registration_id,
                from: registration.status,
                to: RegistrationStatus::Cancelled,
                at: self.clock.now(),
            };
            if let Some(cancelled) = self.registrations.transition(transition).await? {
                info!(%registration_id, event_id = %cancelled.event_id, "Registration cancelled");
                return Ok(cancelled);
            }
        }

        Err(AppError::InternalServerError(format!(
            "registration '{registration_id}' kept changing while cancelling"
        )))
    }

    async fn owned_registration(
        &self,
        identity: &Identity,
        registration_id: Uuid,
    ) -> AppResult<Registration> {
        let registration = self
            .registrations
            .find_by_id(registration_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Registration '{registration_id}' was not found"))
            })?;

        if registration.user_id != identity.user_id {
            return Err(AppError::Forbidden(
                "Only the registrant may change this registration".to_string(),
            ));
        }
        Ok(registration)
    }

    /// Self check-in with the event's code, on the day of the event.
    pub async fn check_in(
        &self,
        identity: &Identity,
        event_id: Uuid,
        code: &str,
    ) -> AppResult<Registration> {
        let event = self
            .events
            .find_by_id(event_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Event '{event_id}' was not found")))?;

        if !lifecycle::accepts_check_in(&event, self.clock.today()) {
            return Err(AppError::Conflict(ConflictKind::CheckInClosed));
        }

        if !code.trim().eq_ignore_ascii_case(&event.check_in_code) {
            return Err(AppError::ValidationError("Invalid check-in code".to_string()));
        }

        for _ in 0..MAX_TRANSITION_ATTEMPTS {
            let registration = self
                .registrations
                .find_by_event(event_id)
                .await?
                .into_iter()
                .find(|registration| {
                    registration.user_id == identity.user_id && registration.status.is_active()
                })
                .ok_or_else(|| {
                    AppError::NotFound("No registration for this event".to_string())
                })?;

            match registration.status {
                RegistrationStatus::CheckedIn => {
                    return Err(AppError::Conflict(ConflictKind::AlreadyCheckedIn))
                }
                RegistrationStatus::Confirmed => {}
                RegistrationStatus::Waitlist | RegistrationStatus::Cancelled => {
                    return Err(AppError::NotFound(
                        "No confirmed registration for this event".to_string(),
                    ))
                }
            }

            let transition = StatusTransition {
                registration_id: registration.id,
                from: RegistrationStatus::Confirmed,
                to: RegistrationStatus::CheckedIn,
                at: self.clock.now(),
            };
            if let Some(checked_in) = self.registrations.transition(transition).await? {
                info!(%event_id, user_id = %identity.user_id, "Attendee checked in");
                return Ok(checked_in);
            }
        }

        Err(AppError::InternalServerError(format!(
            "registration for event '{event_id}' kept changing during check-in"
        )))
    }

    /// The caller's registrations, newest first, with their events.
    pub async fn registrations_for_user(
        &self,
        identity: &Identity,
    ) -> AppResult<Vec<RegistrationWithEvent>> {
        let today = self.clock.today();
        let mut registrations = self.registrations.find_by_user(identity.user_id).await?;
        registrations.sort_by(|a, b| b.registered_at.cmp(&a.registered_at));

        let mut result = Vec::with_capacity(registrations.len());
        for registration in registrations {
            let event = self.events.find_by_id(registration.event_id).await?;
            let effective_status = event
                .as_ref()
                .map(|event| lifecycle::effective_status(event, today));
            result.push(RegistrationWithEvent {
                registration,
                event,
                effective_status,
            });
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EventStatus;
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 9, d).unwrap()
    }

    fn event(capacity: i32, date: NaiveDate, status: EventStatus) -> Event {
        let created = Utc.with_ymd_and_hms(2025, 8, 1, 0, 0, 0).unwrap();
        Event {
            id: Uuid::new_v4(),
            title: "Systems Programming Night".to_string(),
            description: None,
            date,
            time: None,
            end_time: None,
            location: None,
            capacity,
            price: Decimal::ZERO,
            currency: "USD".to_string(),
            category_id: None,
            organizer_id: Uuid::new_v4(),
            tags: vec![],
            status,
            is_featured: false,
            check_in_code: "ABC123".to_string(),
            created_at: created,
            updated_at: created,
        }
    }

    fn registration(event: &Event, status: RegistrationStatus) -> Registration {
        Registration {
            status,
            ..Registration::confirmed(event.id, Uuid::new_v4(), event.created_at)
        }
    }

    #[test]
    fn test_admits_while_seats_remain() {
        let event = event(2, day(20), EventStatus::Active);
        let existing = vec![registration(&event, RegistrationStatus::Confirmed)];
        assert!(check_admission(&event, &existing, Uuid::new_v4(), day(10)).is_ok());
    }

    #[test]
    fn test_rejects_when_full() {
        let event = event(1, day(20), EventStatus::Active);
        let existing = vec![registration(&event, RegistrationStatus::Confirmed)];
        let err = check_admission(&event, &existing, Uuid::new_v4(), day(10)).unwrap_err();
        assert_eq!(err.conflict(), Some(ConflictKind::EventFull));
    }

    #[test]
    fn test_checked_in_attendees_keep_their_seat() {
        let event = event(1, day(20), EventStatus::Active);
        let existing = vec![registration(&event, RegistrationStatus::CheckedIn)];
        let err = check_admission(&event, &existing, Uuid::new_v4(), day(10)).unwrap_err();
        assert_eq!(err.conflict(), Some(ConflictKind::EventFull));
    }

    #[test]
    fn test_cancelled_and_waitlisted_rows_free_the_seat() {
        let event = event(1, day(20), EventStatus::Active);
        let existing = vec![
            registration(&event, RegistrationStatus::Cancelled),
            registration(&event, RegistrationStatus::Waitlist),
        ];
        assert!(check_admission(&event, &existing, Uuid::new_v4(), day(10)).is_ok());
    }

    #[test]
    fn test_rejects_duplicate_but_allows_after_cancel() {
        let event = event(5, day(20), EventStatus::Active);
        let mut existing = registration(&event, RegistrationStatus::Confirmed);
        let user = existing.user_id;

        let err = check_admission(&event, &[existing.clone()], user, day(10)).unwrap_err();
        assert_eq!(err.conflict(), Some(ConflictKind::AlreadyRegistered));

        existing.status = RegistrationStatus::Cancelled;
        assert!(check_admission(&event, &[existing], user, day(10)).is_ok());
    }

    #[test]
    fn test_closed_events_reject_registrations() {
        for (status, date) in [
            (EventStatus::Cancelled, day(20)),
            (EventStatus::Draft, day(20)),
            (EventStatus::Active, day(5)),
        ] {
            let event = event(10, date, status);
            let err = check_admission(&event, &[], Uuid::new_v4(), day(10)).unwrap_err();
            assert_eq!(err.conflict(), Some(ConflictKind::RegistrationClosed));
        }
    }
}

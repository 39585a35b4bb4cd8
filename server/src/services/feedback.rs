use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::clock::Clock;
use crate::models::feedback::{MAX_RATING, MIN_RATING};
use crate::models::{Feedback, Identity, NewFeedback};
use crate::repository::{AppRegistry, EventRepository, FeedbackRepository, RegistrationRepository};
use crate::services::lifecycle;
use crate::utils::error::{AppError, AppResult, ConflictKind};

const MAX_COMMENT_LEN: usize = 2000;

pub fn validate_rating(rating: i16) -> AppResult<()> {
    if !(MIN_RATING..=MAX_RATING).contains(&rating) {
        return Err(AppError::ValidationError(format!(
            "Rating must be between {MIN_RATING} and {MAX_RATING}"
        )));
    }
    Ok(())
}

#[derive(Clone)]
pub struct FeedbackDesk {
    events: Arc<dyn EventRepository>,
    registrations: Arc<dyn RegistrationRepository>,
    feedback: Arc<dyn FeedbackRepository>,
    clock: Arc<dyn Clock>,
}

impl FeedbackDesk {
    pub fn new(registry: &AppRegistry, clock: Arc<dyn Clock>) -> Self {
        Self {
            events: registry.event_repository(),
            registrations: registry.registration_repository(),
            feedback: registry.feedback_repository(),
            clock,
        }
    }

    /// Accepted once per attendee, after the event has taken place.
    pub async fn submit(
        &self,
        identity: &Identity,
        event_id: Uuid,
        submission: NewFeedback,
    ) -> AppResult<Feedback> {
        validate_rating(submission.rating)?;
        let comment = submission
            .comment
            .map(|comment| comment.trim().to_string())
            .filter(|comment| !comment.is_empty());
        if comment
            .as_ref()
            .is_some_and(|comment| comment.chars().count() > MAX_COMMENT_LEN)
        {
            return Err(AppError::ValidationError(format!(
                "Comment must be at most {MAX_COMMENT_LEN} characters"
            )));
        }

        let event = self
            .events
            .find_by_id(event_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Event '{event_id}' was not found")))?;

        if !lifecycle::accepts_feedback(&event, self.clock.today()) {
            return Err(AppError::Conflict(ConflictKind::FeedbackClosed));
        }

        let attended = self
            .registrations
            .find_by_event(event_id)
            .await?
            .iter()
            .any(|registration| {
                registration.user_id == identity.user_id && registration.status.holds_seat()
            });
        if !attended {
            return Err(AppError::Forbidden(
                "Only confirmed attendees can leave feedback".to_string(),
            ));
        }

        let feedback = Feedback {
            id: Uuid::new_v4(),
            event_id,
            user_id: identity.user_id,
            rating: submission.rating,
            comment,
            created_at: self.clock.now(),
        };
        self.feedback.create(&feedback).await?;

        info!(%event_id, user_id = %identity.user_id, rating = feedback.rating, "Feedback recorded");
        Ok(feedback)
    }
}

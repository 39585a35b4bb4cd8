use std::sync::Arc;

use chrono::{Days, NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::clock::Clock;
use crate::models::{
    Category, Event, EventFilter, EventStatus, EventUpdate, Feedback, Identity, NewEvent,
    Notification, NotificationKind,
};
use crate::repository::{
    AppRegistry, EventRepository, FeedbackRepository, NotificationRepository, ProfileRepository,
    RegistrationRepository,
};
use crate::services::aggregation::{self, CalendarDay, EventSummary};
use crate::services::lifecycle::{self, EffectiveStatus};
use crate::utils::error::{AppError, AppResult};

const CHECK_IN_CODE_LEN: usize = 6;
const DEFAULT_CALENDAR_DAYS: u64 = 31;
const MAX_TITLE_LEN: usize = 200;

fn generate_check_in_code() -> String {
    Uuid::new_v4()
        .simple()
        .to_string()
        .chars()
        .take(CHECK_IN_CODE_LEN)
        .collect::<String>()
        .to_uppercase()
}

fn validate_title(title: &str) -> AppResult<()> {
    let title = title.trim();
    if title.is_empty() {
        return Err(AppError::ValidationError("Title is required".to_string()));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(AppError::ValidationError(format!(
            "Title must be at most {MAX_TITLE_LEN} characters"
        )));
    }
    Ok(())
}

fn validate_capacity(capacity: i32) -> AppResult<()> {
    if capacity < 1 {
        return Err(AppError::ValidationError(
            "Capacity must be at least 1".to_string(),
        ));
    }
    Ok(())
}

fn validate_price(price: Decimal) -> AppResult<()> {
    if price.is_sign_negative() {
        return Err(AppError::ValidationError(
            "Price cannot be negative".to_string(),
        ));
    }
    Ok(())
}

fn normalize_currency(currency: &str) -> AppResult<String> {
    let currency = currency.trim().to_uppercase();
    if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(AppError::ValidationError(format!(
            "Currency '{currency}' must be a three-letter code"
        )));
    }
    Ok(currency)
}

fn validate_times(time: Option<NaiveTime>, end_time: Option<NaiveTime>) -> AppResult<()> {
    if let (Some(start), Some(end)) = (time, end_time) {
        if end <= start {
            return Err(AppError::ValidationError(
                "End time must be after the start time".to_string(),
            ));
        }
    }
    Ok(())
}

fn clean_tags(tags: Vec<String>) -> Vec<String> {
    let mut cleaned: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim().to_string();
        if !tag.is_empty() && !cleaned.contains(&tag) {
            cleaned.push(tag);
        }
    }
    cleaned
}

#[derive(Debug, Clone, Serialize)]
pub struct FeedbackEntry {
    #[serde(flatten)]
    pub feedback: Feedback,
    pub author_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EventDetail {
    #[serde(flatten)]
    pub summary: EventSummary,
    pub organizer_name: Option<String>,
    pub category: Option<Category>,
    pub feedback: Vec<FeedbackEntry>,
}

#[derive(Clone)]
pub struct EventCatalog {
    events: Arc<dyn EventRepository>,
    registrations: Arc<dyn RegistrationRepository>,
    feedback: Arc<dyn FeedbackRepository>,
    profiles: Arc<dyn ProfileRepository>,
    notifications: Arc<dyn NotificationRepository>,
    clock: Arc<dyn Clock>,
}

impl EventCatalog {
    pub fn new(registry: &AppRegistry, clock: Arc<dyn Clock>) -> Self {
        Self {
            events: registry.event_repository(),
            registrations: registry.registration_repository(),
            feedback: registry.feedback_repository(),
            profiles: registry.profile_repository(),
            notifications: registry.notification_repository(),
            clock,
        }
    }

    async fn load_event(&self, event_id: Uuid) -> AppResult<Event> {
        self.events
            .find_by_id(event_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Event '{event_id}' was not found")))
    }

    async fn ensure_category(&self, category_id: Option<Uuid>) -> AppResult<()> {
        let Some(category_id) = category_id else {
            return Ok(());
        };
        let known = self
            .events
            .categories()
            .await?
            .iter()
            .any(|category| category.id == category_id);
        if !known {
            return Err(AppError::ValidationError(format!(
                "Category '{category_id}' does not exist"
            )));
        }
        Ok(())
    }

    pub async fn create_event(&self, identity: &Identity, new_event: NewEvent) -> AppResult<Event> {
        if !identity.can_create_event() {
            return Err(AppError::Forbidden(
                "Only organizers can create events".to_string(),
            ));
        }

        validate_title(&new_event.title)?;
        validate_capacity(new_event.capacity)?;
        validate_price(new_event.price)?;
        validate_times(new_event.time, new_event.end_time)?;
        let currency = normalize_currency(&new_event.currency)?;
        self.ensure_category(new_event.category_id).await?;

        let now = self.clock.now();
        let event = Event {
            id: Uuid::new_v4(),
            title: new_event.title.trim().to_string(),
            description: new_event.description,
            date: new_event.date,
            time: new_event.time,
            end_time: new_event.end_time,
            location: new_event.location,
            capacity: new_event.capacity,
            price: new_event.price,
            currency,
            category_id: new_event.category_id,
            organizer_id: identity.user_id,
            tags: clean_tags(new_event.tags),
            status: if new_event.draft {
                EventStatus::Draft
            } else {
                EventStatus::Active
            },
            is_featured: new_event.is_featured,
            check_in_code: generate_check_in_code(),
            created_at: now,
            updated_at: now,
        };

        self.events.create(&event).await?;
        info!(event_id = %event.id, organizer_id = %identity.user_id, capacity = event.capacity, "Event created");
        Ok(event)
    }

    pub async fn update_event(
        &self,
        identity: &Identity,
        event_id: Uuid,
        update: EventUpdate,
    ) -> AppResult<Event> {
        let mut event = self.load_event(event_id).await?;
        if !identity.can_edit_event(&event) {
            return Err(AppError::Forbidden(
                "Only the organizer or an admin can edit this event".to_string(),
            ));
        }

        let previous_status = event.status;

        if let Some(title) = update.title {
            validate_title(&title)?;
            event.title = title.trim().to_string();
        }
        if let Some(description) = update.description {
            event.description = Some(description);
        }
        if let Some(date) = update.date {
            event.date = date;
        }
        if let Some(time) = update.time {
            event.time = Some(time);
        }
        if let Some(end_time) = update.end_time {
            event.end_time = Some(end_time);
        }
        validate_times(event.time, event.end_time)?;
        if let Some(location) = update.location {
            event.location = Some(location);
        }
        if let Some(capacity) = update.capacity {
            validate_capacity(capacity)?;
            event.capacity = capacity;
        }
        if let Some(price) = update.price {
            validate_price(price)?;
            event.price = price;
        }
        if let Some(currency) = update.currency {
            event.currency = normalize_currency(&currency)?;
        }
        if let Some(category_id) = update.category_id {
            self.ensure_category(Some(category_id)).await?;
            event.category_id = Some(category_id);
        }
        if let Some(tags) = update.tags {
            event.tags = clean_tags(tags);
        }
        if let Some(is_featured) = update.is_featured {
            event.is_featured = is_featured;
        }
        if let Some(status) = update.status {
            if status == EventStatus::Completed {
                return Err(AppError::ValidationError(
                    "Completion follows the event date and cannot be set".to_string(),
                ));
            }
            event.status = status;
        }

        event.updated_at = self.clock.now();
        self.events.update(&event).await?;
        info!(%event_id, status = %event.status, "Event updated");

        if event.status == EventStatus::Cancelled && previous_status != EventStatus::Cancelled {
            self.notify_cancellation(&event).await;
        }

        Ok(event)
    }

    async fn notify_cancellation(&self, event: &Event) {
        let registrations = match self.registrations.find_by_event(event.id).await {
            Ok(registrations) => registrations,
            Err(err) => {
                warn!(error = %err, event_id = %event.id, "Could not load registrants to notify");
                return;
            }
        };

        let now = self.clock.now();
        for registration in registrations.iter().filter(|r| r.status.holds_seat()) {
            let notification = Notification::new(
                registration.user_id,
                NotificationKind::Warning,
                "Event cancelled",
                format!("{} on {} has been cancelled.", event.title, event.date),
                now,
            );
            if let Err(err) = self.notifications.create(&notification).await {
                warn!(error = %err, user_id = %registration.user_id, "Could not queue cancellation notice");
            }
        }
    }

    /// Drafts are only visible to those who may edit them.
    pub async fn get_event(
        &self,
        viewer: Option<&Identity>,
        event_id: Uuid,
    ) -> AppResult<EventDetail> {
        let event = self.load_event(event_id).await?;
        let today = self.clock.today();

        if !lifecycle::visible_to(&event, viewer, today) {
            return Err(AppError::NotFound(format!("Event '{event_id}' was not found")));
        }

        let registrations = self.registrations.find_by_event(event_id).await?;
        let mut feedback = self.feedback.find_by_event(event_id).await?;
        feedback.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let organizer_name = self
            .profiles
            .find_by_id(event.organizer_id)
            .await?
            .map(|profile| profile.full_name);
        let category = match event.category_id {
            Some(category_id) => self
                .events
                .categories()
                .await?
                .into_iter()
                .find(|category| category.id == category_id),
            None => None,
        };

        let mut entries = Vec::with_capacity(feedback.len());
        for row in &feedback {
            let author_name = self
                .profiles
                .find_by_id(row.user_id)
                .await?
                .map(|profile| profile.full_name);
            entries.push(FeedbackEntry {
                feedback: row.clone(),
                author_name,
            });
        }

        Ok(EventDetail {
            summary: aggregation::summarize(event, &registrations, &feedback, today),
            organizer_name,
            category,
            feedback: entries,
        })
    }

    /// Upcoming active events matching the filter, soonest first.
    pub async fn search(&self, filter: &EventFilter) -> AppResult<Vec<EventSummary>> {
        let today = self.clock.today();
        let query = filter
            .q
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty());

        let mut events: Vec<Event> = self
            .events
            .find_all()
            .await?
            .into_iter()
            .filter(|event| lifecycle::effective_status(event, today) == EffectiveStatus::Active)
            .filter(|event| filter.category_id.map_or(true, |id| event.category_id == Some(id)))
            .filter(|event| filter.organizer_id.map_or(true, |id| event.organizer_id == id))
            .filter(|event| !filter.featured.unwrap_or(false) || event.is_featured)
            .filter(|event| query.map_or(true, |q| event.matches_query(q)))
            .collect();

        events.sort_by(|a, b| (a.date, a.time).cmp(&(b.date, b.time)));
        if let Some(limit) = filter.limit {
            events.truncate(limit);
        }

        let mut summaries = Vec::with_capacity(events.len());
        for event in events {
            let registrations = self.registrations.find_by_event(event.id).await?;
            let feedback = self.feedback.find_by_event(event.id).await?;
            summaries.push(aggregation::summarize(event, &registrations, &feedback, today));
        }
        Ok(summaries)
    }

    pub async fn categories(&self) -> AppResult<Vec<Category>> {
        self.events.categories().await
    }

    /// Defaults to the next month starting today.
    pub async fn calendar(
        &self,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> AppResult<Vec<CalendarDay>> {
        let today = self.clock.today();
        let from = from.unwrap_or(today);
        let to = match to {
            Some(to) => to,
            None => from
                .checked_add_days(Days::new(DEFAULT_CALENDAR_DAYS))
                .ok_or_else(|| {
                    AppError::ValidationError(format!("Calendar cannot start on {from}"))
                })?,
        };
        if to < from {
            return Err(AppError::ValidationError(
                "Calendar range ends before it starts".to_string(),
            ));
        }

        let events: Vec<Event> = self
            .events
            .find_all()
            .await?
            .into_iter()
            .filter(|event| event.date >= from && event.date <= to)
            .collect();

        let mut registrations = Vec::new();
        let mut feedback = Vec::new();
        for event in &events {
            registrations.extend(self.registrations.find_by_event(event.id).await?);
            feedback.extend(self.feedback.find_by_event(event.id).await?);
        }

        Ok(aggregation::calendar(
            &events,
            &registrations,
            &feedback,
            from,
            to,
            today,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_in_code_shape() {
        let code = generate_check_in_code();
        assert_eq!(code.len(), CHECK_IN_CODE_LEN);
        assert!(code
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
    }

    #[test]
    fn test_capacity_must_be_positive() {
        assert!(validate_capacity(0).is_err());
        assert!(validate_capacity(-3).is_err());
        assert!(validate_capacity(1).is_ok());
    }

    #[test]
    fn test_currency_is_normalized() {
        assert_eq!(normalize_currency(" eur ").unwrap(), "EUR");
        assert!(normalize_currency("EURO").is_err());
        assert!(normalize_currency("U$D").is_err());
    }

    #[test]
    fn test_end_time_must_follow_start() {
        let nine = NaiveTime::from_hms_opt(9, 0, 0);
        let five = NaiveTime::from_hms_opt(17, 0, 0);
        assert!(validate_times(nine, five).is_ok());
        assert!(validate_times(five, nine).is_err());
        assert!(validate_times(None, nine).is_ok());
    }

    #[test]
    fn test_tags_are_trimmed_and_deduplicated() {
        let tags = clean_tags(vec![
            " rust ".to_string(),
            "rust".to_string(),
            String::new(),
            "async".to_string(),
        ]);
        assert_eq!(tags, vec!["rust".to_string(), "async".to_string()]);
    }

    #[test]
    fn test_negative_price_is_rejected() {
        assert!(validate_price(Decimal::new(-1, 0)).is_err());
        assert!(validate_price(Decimal::ZERO).is_ok());
    }
}

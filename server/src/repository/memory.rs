use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    EventRepository, FeedbackRepository, NotificationRepository, ProfileRepository,
    RegistrationRepository,
};
use crate::models::{
    Admission, Category, Event, Feedback, Notification, Profile, Registration,
    RegistrationStatus, StatusTransition,
};
use crate::services::ledger;
use crate::utils::error::{AppError, AppResult, ConflictKind};

/// The eight categories every fresh store starts with; the SQL migration seeds
/// the same ids.
pub fn default_categories() -> Vec<Category> {
    [
        ("Technology", "Tech conferences, workshops, and meetups", "#3B82F6", "laptop"),
        ("Music", "Concerts, festivals, and music events", "#EF4444", "music"),
        ("Sports", "Sports events, tournaments, and fitness", "#10B981", "trophy"),
        ("Food & Drink", "Food festivals, wine tastings, and culinary events", "#F59E0B", "utensils"),
        ("Business", "Networking, conferences, and professional events", "#8B5CF6", "briefcase"),
        ("Arts & Culture", "Art exhibitions, theater, and cultural events", "#EC4899", "palette"),
        ("Education", "Workshops, seminars, and learning events", "#06B6D4", "book-open"),
        ("Health & Wellness", "Fitness, yoga, and wellness events", "#84CC16", "heart"),
    ]
    .into_iter()
    .enumerate()
    .map(|(index, (name, description, color, icon))| Category {
        id: Uuid::from_u128(index as u128 + 1),
        name: name.to_string(),
        description: Some(description.to_string()),
        color: color.to_string(),
        icon: icon.to_string(),
    })
    .collect()
}

#[derive(Default)]
struct Tables {
    events: HashMap<Uuid, Event>,
    registrations: Vec<Registration>,
    feedback: Vec<Feedback>,
    profiles: HashMap<Uuid, Profile>,
    notifications: Vec<Notification>,
    categories: Vec<Category>,
}

/// Process-local store. Every write takes the single table lock, which makes
/// it the serialization point for admissions.
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables {
                categories: default_categories(),
                ..Tables::default()
            }),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventRepository for InMemoryStore {
    async fn create(&self, event: &Event) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        tables.events.insert(event.id, event.clone());
        Ok(())
    }

    async fn update(&self, event: &Event) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        match tables.events.get_mut(&event.id) {
            Some(stored) => {
                *stored = event.clone();
                Ok(())
            }
            None => Err(AppError::NotFound(format!("Event '{}' was not found", event.id))),
        }
    }

    async fn find_by_id(&self, event_id: Uuid) -> AppResult<Option<Event>> {
        Ok(self.tables.read().await.events.get(&event_id).cloned())
    }

    async fn find_all(&self) -> AppResult<Vec<Event>> {
        Ok(self.tables.read().await.events.values().cloned().collect())
    }

    async fn find_by_organizer(&self, organizer_id: Uuid) -> AppResult<Vec<Event>> {
        let tables = self.tables.read().await;
        Ok(tables
            .events
            .values()
            .filter(|event| event.organizer_id == organizer_id)
            .cloned()
            .collect())
    }

    async fn categories(&self) -> AppResult<Vec<Category>> {
        Ok(self.tables.read().await.categories.clone())
    }
}

#[async_trait]
impl RegistrationRepository for InMemoryStore {
    async fn admit(&self, admission: Admission) -> AppResult<Registration> {
        let mut tables = self.tables.write().await;

        let event = tables.events.get(&admission.event_id).ok_or_else(|| {
            AppError::NotFound(format!("Event '{}' was not found", admission.event_id))
        })?;

        let for_event: Vec<Registration> = tables
            .registrations
            .iter()
            .filter(|registration| registration.event_id == admission.event_id)
            .cloned()
            .collect();

        ledger::check_admission(
            event,
            &for_event,
            admission.user_id,
            admission.requested_at.date_naive(),
        )?;

        let registration =
            Registration::confirmed(admission.event_id, admission.user_id, admission.requested_at);
        tables.registrations.push(registration.clone());
        Ok(registration)
    }

    async fn transition(&self, transition: StatusTransition) -> AppResult<Option<Registration>> {
        let mut tables = self.tables.write().await;
        let Some(registration) = tables
            .registrations
            .iter_mut()
            .find(|registration| registration.id == transition.registration_id)
        else {
            return Ok(None);
        };

        if registration.status != transition.from {
            return Ok(None);
        }

        registration.status = transition.to;
        if transition.to == RegistrationStatus::CheckedIn {
            registration.checked_in_at = Some(transition.at);
        }
        Ok(Some(registration.clone()))
    }

    async fn find_by_id(&self, registration_id: Uuid) -> AppResult<Option<Registration>> {
        let tables = self.tables.read().await;
        Ok(tables
            .registrations
            .iter()
            .find(|registration| registration.id == registration_id)
            .cloned())
    }

    async fn find_by_event(&self, event_id: Uuid) -> AppResult<Vec<Registration>> {
        let tables = self.tables.read().await;
        Ok(tables
            .registrations
            .iter()
            .filter(|registration| registration.event_id == event_id)
            .cloned()
            .collect())
    }

    async fn find_by_user(&self, user_id: Uuid) -> AppResult<Vec<Registration>> {
        let tables = self.tables.read().await;
        Ok(tables
            .registrations
            .iter()
            .filter(|registration| registration.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn find_all(&self) -> AppResult<Vec<Registration>> {
        Ok(self.tables.read().await.registrations.clone())
    }
}

#[async_trait]
impl FeedbackRepository for InMemoryStore {
    async fn create(&self, feedback: &Feedback) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        let exists = tables
            .feedback
            .iter()
            .any(|row| row.event_id == feedback.event_id && row.user_id == feedback.user_id);
        if exists {
            return Err(AppError::Conflict(ConflictKind::FeedbackExists));
        }
        tables.feedback.push(feedback.clone());
        Ok(())
    }

    async fn find_by_event(&self, event_id: Uuid) -> AppResult<Vec<Feedback>> {
        let tables = self.tables.read().await;
        Ok(tables
            .feedback
            .iter()
            .filter(|row| row.event_id == event_id)
            .cloned()
            .collect())
    }

    async fn find_all(&self) -> AppResult<Vec<Feedback>> {
        Ok(self.tables.read().await.feedback.clone())
    }
}

#[async_trait]
impl ProfileRepository for InMemoryStore {
    async fn create(&self, profile: &Profile) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        let taken = tables
            .profiles
            .values()
            .any(|row| row.email.eq_ignore_ascii_case(&profile.email));
        if taken {
            return Err(AppError::Conflict(ConflictKind::EmailTaken));
        }
        tables.profiles.insert(profile.id, profile.clone());
        Ok(())
    }

    async fn update(&self, profile: &Profile) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        match tables.profiles.get_mut(&profile.id) {
            Some(stored) => {
                *stored = profile.clone();
                Ok(())
            }
            None => Err(AppError::NotFound(format!("User '{}' was not found", profile.id))),
        }
    }

    async fn find_by_id(&self, user_id: Uuid) -> AppResult<Option<Profile>> {
        Ok(self.tables.read().await.profiles.get(&user_id).cloned())
    }

    async fn count(&self) -> AppResult<u64> {
        Ok(self.tables.read().await.profiles.len() as u64)
    }
}

#[async_trait]
impl NotificationRepository for InMemoryStore {
    async fn create(&self, notification: &Notification) -> AppResult<()> {
        self.tables.write().await.notifications.push(notification.clone());
        Ok(())
    }

    async fn find_by_id(&self, notification_id: Uuid) -> AppResult<Option<Notification>> {
        let tables = self.tables.read().await;
        Ok(tables
            .notifications
            .iter()
            .find(|notification| notification.id == notification_id)
            .cloned())
    }

    async fn find_by_user(&self, user_id: Uuid) -> AppResult<Vec<Notification>> {
        let tables = self.tables.read().await;
        Ok(tables
            .notifications
            .iter()
            .filter(|notification| notification.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn mark_read(&self, notification_id: Uuid) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        if let Some(notification) = tables
            .notifications
            .iter_mut()
            .find(|notification| notification.id == notification_id)
        {
            notification.read = true;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_categories_have_stable_ids() {
        let categories = default_categories();
        assert_eq!(categories.len(), 8);
        assert_eq!(categories[0].id, Uuid::from_u128(1));
        assert_eq!(categories[7].name, "Health & Wellness");
    }

    #[tokio::test]
    async fn test_admit_unknown_event_is_not_found() {
        let store = InMemoryStore::new();
        let result = store
            .admit(Admission {
                event_id: Uuid::new_v4(),
                user_id: Uuid::new_v4(),
                requested_at: chrono::Utc::now(),
            })
            .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
        assert!(RegistrationRepository::find_all(&store).await.unwrap().is_empty());
    }
}

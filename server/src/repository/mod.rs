use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{
    Admission, Category, Event, Feedback, Notification, Profile, Registration, StatusTransition,
};
use crate::utils::error::AppResult;

pub mod memory;
pub mod postgres;

pub use memory::InMemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait EventRepository: Send + Sync {
    async fn create(&self, event: &Event) -> AppResult<()>;
    async fn update(&self, event: &Event) -> AppResult<()>;
    async fn find_by_id(&self, event_id: Uuid) -> AppResult<Option<Event>>;
    async fn find_all(&self) -> AppResult<Vec<Event>>;
    async fn find_by_organizer(&self, organizer_id: Uuid) -> AppResult<Vec<Event>>;
    async fn categories(&self) -> AppResult<Vec<Category>>;
}

#[async_trait]
pub trait RegistrationRepository: Send + Sync {
    /// Seat admission. Looking up the event, checking it with
    /// `ledger::check_admission` and inserting the confirmed row happen as one
    /// atomic step with respect to other admissions for the same event.
    async fn admit(&self, admission: Admission) -> AppResult<Registration>;
    /// Applies the transition only if the row is still in `from`. Returns the
    /// updated row, or `None` when the row has moved on.
    async fn transition(&self, transition: StatusTransition) -> AppResult<Option<Registration>>;
    async fn find_by_id(&self, registration_id: Uuid) -> AppResult<Option<Registration>>;
    async fn find_by_event(&self, event_id: Uuid) -> AppResult<Vec<Registration>>;
    async fn find_by_user(&self, user_id: Uuid) -> AppResult<Vec<Registration>>;
    async fn find_all(&self) -> AppResult<Vec<Registration>>;
}

#[async_trait]
pub trait FeedbackRepository: Send + Sync {
    /// Fails with `Conflict(FeedbackExists)` if the pair already has a row.
    async fn create(&self, feedback: &Feedback) -> AppResult<()>;
    async fn find_by_event(&self, event_id: Uuid) -> AppResult<Vec<Feedback>>;
    async fn find_all(&self) -> AppResult<Vec<Feedback>>;
}

#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// Fails with `ConflictKind::EmailTaken` when the email is in use.
    async fn create(&self, profile: &Profile) -> AppResult<()>;
    async fn update(&self, profile: &Profile) -> AppResult<()>;
    async fn find_by_id(&self, user_id: Uuid) -> AppResult<Option<Profile>>;
    async fn count(&self) -> AppResult<u64>;
}

#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn create(&self, notification: &Notification) -> AppResult<()>;
    async fn find_by_id(&self, notification_id: Uuid) -> AppResult<Option<Notification>>;
    async fn find_by_user(&self, user_id: Uuid) -> AppResult<Vec<Notification>>;
    async fn mark_read(&self, notification_id: Uuid) -> AppResult<()>;
}

#[derive(Clone)]
pub struct AppRegistry {
    event_repository: Arc<dyn EventRepository>,
    registration_repository: Arc<dyn RegistrationRepository>,
    feedback_repository: Arc<dyn FeedbackRepository>,
    profile_repository: Arc<dyn ProfileRepository>,
    notification_repository: Arc<dyn NotificationRepository>,
}

impl AppRegistry {
    pub fn postgres(pool: PgPool) -> Self {
        Self::from_store(Arc::new(PgStore::new(pool)))
    }

    pub fn in_memory() -> Self {
        Self::from_store(Arc::new(InMemoryStore::new()))
    }

    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: EventRepository
            + RegistrationRepository
            + FeedbackRepository
            + ProfileRepository
            + NotificationRepository
            + 'static,
    {
        Self {
            event_repository: store.clone(),
            registration_repository: store.clone(),
            feedback_repository: store.clone(),
            profile_repository: store.clone(),
            notification_repository: store,
        }
    }

    pub fn event_repository(&self) -> Arc<dyn EventRepository> {
        self.event_repository.clone()
    }

    pub fn registration_repository(&self) -> Arc<dyn RegistrationRepository> {
        self.registration_repository.clone()
    }

    pub fn feedback_repository(&self) -> Arc<dyn FeedbackRepository> {
        self.feedback_repository.clone()
    }

    pub fn profile_repository(&self) -> Arc<dyn ProfileRepository> {
        self.profile_repository.clone()
    }

    pub fn notification_repository(&self) -> Arc<dyn NotificationRepository> {
        self.notification_repository.clone()
    }
}

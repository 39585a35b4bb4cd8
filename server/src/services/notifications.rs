use std::sync::Arc;

use uuid::Uuid;

use crate::models::{Identity, Notification};
use crate::repository::{AppRegistry, NotificationRepository};
use crate::utils::error::{AppError, AppResult};

#[derive(Clone)]
pub struct Inbox {
    notifications: Arc<dyn NotificationRepository>,
}

impl Inbox {
    pub fn new(registry: &AppRegistry) -> Self {
        Self {
            notifications: registry.notification_repository(),
        }
    }

    /// Newest first.
    pub async fn list(&self, identity: &Identity) -> AppResult<Vec<Notification>> {
        let mut notifications = self.notifications.find_by_user(identity.user_id).await?;
        notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(notifications)
    }

    pub async fn mark_read(&self, identity: &Identity, notification_id: Uuid) -> AppResult<()> {
        let notification = self
            .notifications
            .find_by_id(notification_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Notification '{notification_id}' was not found"))
            })?;

        if notification.user_id != identity.user_id {
            return Err(AppError::Forbidden(
                "Notifications can only be read by their recipient".to_string(),
            ));
        }

        self.notifications.mark_read(notification_id).await
    }
}

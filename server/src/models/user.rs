use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::event::Event;
use crate::utils::error::AppError;

/// Closed set of account roles. Stored as `user`, `organizer` or `admin`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "user")]
    Consumer,
    #[serde(rename = "organizer")]
    Organizer,
    #[serde(rename = "admin")]
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Consumer => "user",
            Role::Organizer => "organizer",
            Role::Admin => "admin",
        }
    }

    pub fn can_create_event(&self) -> bool {
        matches!(self, Role::Organizer | Role::Admin)
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::Consumer),
            "organizer" => Ok(Role::Organizer),
            "admin" => Ok(Role::Admin),
            other => Err(AppError::InternalServerError(format!(
                "unknown role '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub created_at: DateTime<Utc>,
}

fn default_role() -> Role {
    Role::Consumer
}

/// Sign-up form. Admins are never self-registered.
#[derive(Debug, Clone, Deserialize)]
pub struct NewProfile {
    pub email: String,
    pub full_name: String,
    #[serde(default = "default_role")]
    pub role: Role,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    pub full_name: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
}

/// The caller of a single request, resolved from the identity provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub user_id: Uuid,
    pub role: Role,
}

impl Identity {
    pub fn new(user_id: Uuid, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn can_create_event(&self) -> bool {
        self.role.can_create_event()
    }

    /// Organizers edit their own events; admins edit any.
    pub fn can_edit_event(&self, event: &Event) -> bool {
        match self.role {
            Role::Admin => true,
            Role::Organizer => event.organizer_id == self.user_id,
            Role::Consumer => false,
        }
    }
}

impl From<&Profile> for Identity {
    fn from(profile: &Profile) -> Self {
        Self::new(profile.id, profile.role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_consumers_cannot_create_events() {
        assert!(!Role::Consumer.can_create_event());
        assert!(Role::Organizer.can_create_event());
        assert!(Role::Admin.can_create_event());
    }

    #[test]
    fn test_role_uses_storage_names() {
        assert_eq!(serde_json::to_string(&Role::Consumer).unwrap(), "\"user\"");
        assert_eq!("organizer".parse::<Role>().unwrap(), Role::Organizer);
        assert!("guest".parse::<Role>().is_err());
    }
}

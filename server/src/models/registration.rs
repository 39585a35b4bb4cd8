use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::utils::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStatus {
    Confirmed,
    Cancelled,
    Waitlist,
    CheckedIn,
}

impl RegistrationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegistrationStatus::Confirmed => "confirmed",
            RegistrationStatus::Cancelled => "cancelled",
            RegistrationStatus::Waitlist => "waitlist",
            RegistrationStatus::CheckedIn => "checked_in",
        }
    }

    /// Whether the registration occupies a seat counted against capacity.
    pub fn holds_seat(&self) -> bool {
        matches!(
            self,
            RegistrationStatus::Confirmed | RegistrationStatus::CheckedIn
        )
    }

    pub fn is_active(&self) -> bool {
        !matches!(self, RegistrationStatus::Cancelled)
    }
}

impl fmt::Display for RegistrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RegistrationStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "confirmed" => Ok(RegistrationStatus::Confirmed),
            "cancelled" => Ok(RegistrationStatus::Cancelled),
            "waitlist" => Ok(RegistrationStatus::Waitlist),
            "checked_in" => Ok(RegistrationStatus::CheckedIn),
            other => Err(AppError::InternalServerError(format!(
                "unknown registration status '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Registration {
    pub id: Uuid,
    pub event_id: Uuid,
    pub user_id: Uuid,
    pub status: RegistrationStatus,
    pub registered_at: DateTime<Utc>,
    pub checked_in_at: Option<DateTime<Utc>>,
}

impl Registration {
    pub fn confirmed(event_id: Uuid, user_id: Uuid, registered_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_id,
            user_id,
            status: RegistrationStatus::Confirmed,
            registered_at,
            checked_in_at: None,
        }
    }
}

/// A request to take a seat, evaluated atomically by the store.
#[derive(Debug, Clone, Copy)]
pub struct Admission {
    pub event_id: Uuid,
    pub user_id: Uuid,
    pub requested_at: DateTime<Utc>,
}

/// A compare-and-set on a registration's status.
#[derive(Debug, Clone, Copy)]
pub struct StatusTransition {
    pub registration_id: Uuid,
    pub from: RegistrationStatus,
    pub to: RegistrationStatus,
    pub at: DateTime<Utc>,
}

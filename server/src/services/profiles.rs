use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::clock::Clock;
use crate::models::{Identity, NewProfile, Profile, ProfileUpdate, Role};
use crate::repository::{AppRegistry, ProfileRepository};
use crate::utils::error::{AppError, AppResult};

const MAX_EMAIL_LEN: usize = 254;

fn normalize_email(email: &str) -> AppResult<String> {
    let email = email.trim().to_lowercase();
    let well_formed = email.len() <= MAX_EMAIL_LEN
        && email
            .split_once('@')
            .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if !well_formed {
        return Err(AppError::ValidationError(format!(
            "'{email}' is not a valid email address"
        )));
    }
    Ok(email)
}

fn clean_full_name(full_name: &str) -> AppResult<String> {
    let full_name = full_name.trim();
    if full_name.is_empty() {
        return Err(AppError::ValidationError(
            "Full name cannot be empty".to_string(),
        ));
    }
    Ok(full_name.to_string())
}

#[derive(Clone)]
pub struct Profiles {
    profiles: Arc<dyn ProfileRepository>,
    clock: Arc<dyn Clock>,
}

impl Profiles {
    pub fn new(registry: &AppRegistry, clock: Arc<dyn Clock>) -> Self {
        Self {
            profiles: registry.profile_repository(),
            clock,
        }
    }

    /// Creates an account. Emails are unique regardless of case.
    pub async fn sign_up(&self, new_profile: NewProfile) -> AppResult<Profile> {
        if new_profile.role == Role::Admin {
            return Err(AppError::Forbidden(
                "Admin accounts cannot be self-registered".to_string(),
            ));
        }

        let profile = Profile {
            id: Uuid::new_v4(),
            email: normalize_email(&new_profile.email)?,
            full_name: clean_full_name(&new_profile.full_name)?,
            role: new_profile.role,
            bio: None,
            location: None,
            created_at: self.clock.now(),
        };
        self.profiles.create(&profile).await?;

        info!(user_id = %profile.id, role = profile.role.as_str(), "Profile created");
        Ok(profile)
    }

    pub async fn find(&self, user_id: Uuid) -> AppResult<Option<Profile>> {
        self.profiles.find_by_id(user_id).await
    }

    pub async fn me(&self, identity: &Identity) -> AppResult<Profile> {
        self.find(identity.user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User '{}' was not found", identity.user_id)))
    }

    /// Role and email are owned by the identity provider and never change here.
    pub async fn update_me(&self, identity: &Identity, update: ProfileUpdate) -> AppResult<Profile> {
        let mut profile = self.me(identity).await?;

        if let Some(full_name) = update.full_name {
            profile.full_name = clean_full_name(&full_name)?;
        }
        if let Some(bio) = update.bio {
            profile.bio = Some(bio).filter(|bio| !bio.trim().is_empty());
        }
        if let Some(location) = update.location {
            profile.location = Some(location).filter(|location| !location.trim().is_empty());
        }

        self.profiles.update(&profile).await?;
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emails_are_lowercased() {
        assert_eq!(
            normalize_email(" Ada@Example.COM ").unwrap(),
            "ada@example.com"
        );
    }

    #[test]
    fn test_malformed_emails_are_rejected() {
        for email in ["", "ada", "@example.com", "ada@localhost"] {
            assert!(normalize_email(email).is_err(), "{email}");
        }
    }
}

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Json, Path, State};
use axum::response::Response;
use uuid::Uuid;

use super::{json_body, path_param, CurrentUser};
use crate::models::{NewProfile, ProfileUpdate};
use crate::state::AppState;
use crate::utils::error::AppResult;
use crate::utils::response::{created, empty_success, success};

/// Public sign-up. The returned id is what callers send as their identity.
pub async fn sign_up(
    State(state): State<AppState>,
    payload: Result<Json<NewProfile>, JsonRejection>,
) -> AppResult<Response> {
    let new_profile = json_body(payload)?;
    let profile = state.profiles().sign_up(new_profile).await?;
    Ok(created(profile, "Profile created successfully"))
}

pub async fn get_profile(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
) -> AppResult<Response> {
    let profile = state.profiles().me(&identity).await?;
    Ok(success(profile, "Profile retrieved successfully"))
}

pub async fn update_profile(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    payload: Result<Json<ProfileUpdate>, JsonRejection>,
) -> AppResult<Response> {
    let update = json_body(payload)?;
    let profile = state.profiles().update_me(&identity, update).await?;
    Ok(success(profile, "Profile updated successfully"))
}

/// Organizers see their events, everyone else their attendance.
pub async fn dashboard(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
) -> AppResult<Response> {
    let dashboard = state.stats().dashboard(&identity).await?;
    Ok(success(dashboard, "Dashboard retrieved successfully"))
}

pub async fn notifications(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
) -> AppResult<Response> {
    let notifications = state.inbox().list(&identity).await?;
    Ok(success(notifications, "Notifications retrieved successfully"))
}

pub async fn mark_notification_read(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    path: Result<Path<Uuid>, PathRejection>,
) -> AppResult<Response> {
    let notification_id = path_param(path)?;
    state.inbox().mark_read(&identity, notification_id).await?;
    Ok(empty_success("Notification marked as read"))
}

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Json, Path, State};
use axum::response::Response;
use serde::Deserialize;
use uuid::Uuid;

use super::{json_body, path_param, CurrentUser};
use crate::state::AppState;
use crate::utils::error::AppResult;
use crate::utils::response::{created, success};

#[derive(Debug, Deserialize)]
pub struct CheckInRequest {
    pub code: String,
}

pub async fn register(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    path: Result<Path<Uuid>, PathRejection>,
) -> AppResult<Response> {
    let event_id = path_param(path)?;
    let registration = state.ledger().register(&identity, event_id).await?;
    Ok(created(registration, "Registration confirmed"))
}

pub async fn cancel_registration(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    path: Result<Path<Uuid>, PathRejection>,
) -> AppResult<Response> {
    let registration_id = path_param(path)?;
    let registration = state.ledger().cancel(&identity, registration_id).await?;
    Ok(success(registration, "Registration cancelled"))
}

pub async fn check_in(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<CheckInRequest>, JsonRejection>,
) -> AppResult<Response> {
    let event_id = path_param(path)?;
    let request = json_body(payload)?;
    let registration = state
        .ledger()
        .check_in(&identity, event_id, request.code.trim())
        .await?;
    Ok(success(registration, "Checked in successfully"))
}

pub async fn my_registrations(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
) -> AppResult<Response> {
    let registrations = state.ledger().registrations_for_user(&identity).await?;
    Ok(success(registrations, "Registrations retrieved successfully"))
}

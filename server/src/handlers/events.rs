use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Json, Path, Query, State};
use axum::response::Response;
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use super::{json_body, path_param, query_params, CurrentUser, Viewer};
use crate::models::{EventFilter, EventUpdate, NewEvent, NewFeedback};
use crate::state::AppState;
use crate::utils::error::AppResult;
use crate::utils::response::{created, success};

#[derive(Debug, Default, Deserialize)]
pub struct CalendarQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

pub async fn list_events(
    State(state): State<AppState>,
    query: Result<Query<EventFilter>, QueryRejection>,
) -> AppResult<Response> {
    let filter = query_params(query)?;
    let events = state.catalog().search(&filter).await?;
    Ok(success(events, "Events retrieved successfully"))
}

pub async fn create_event(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    payload: Result<Json<NewEvent>, JsonRejection>,
) -> AppResult<Response> {
    let new_event = json_body(payload)?;
    let event = state.catalog().create_event(&identity, new_event).await?;
    Ok(created(event, "Event created successfully"))
}

pub async fn get_event(
    State(state): State<AppState>,
    Viewer(viewer): Viewer,
    path: Result<Path<Uuid>, PathRejection>,
) -> AppResult<Response> {
    let event_id = path_param(path)?;
    let detail = state.catalog().get_event(viewer.as_ref(), event_id).await?;
    Ok(success(detail, "Event retrieved successfully"))
}

pub async fn update_event(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<EventUpdate>, JsonRejection>,
) -> AppResult<Response> {
    let event_id = path_param(path)?;
    let update = json_body(payload)?;
    let event = state
        .catalog()
        .update_event(&identity, event_id, update)
        .await?;
    Ok(success(event, "Event updated successfully"))
}

pub async fn event_stats(
    State(state): State<AppState>,
    Viewer(viewer): Viewer,
    path: Result<Path<Uuid>, PathRejection>,
) -> AppResult<Response> {
    let event_id = path_param(path)?;
    let stats = state.stats().event_stats(viewer.as_ref(), event_id).await?;
    Ok(success(stats, "Event statistics retrieved successfully"))
}

pub async fn calendar(
    State(state): State<AppState>,
    query: Result<Query<CalendarQuery>, QueryRejection>,
) -> AppResult<Response> {
    let range = query_params(query)?;
    let days = state.catalog().calendar(range.from, range.to).await?;
    Ok(success(days, "Calendar retrieved successfully"))
}

pub async fn list_categories(State(state): State<AppState>) -> AppResult<Response> {
    let categories = state.catalog().categories().await?;
    Ok(success(categories, "Categories retrieved successfully"))
}

pub async fn submit_feedback(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<NewFeedback>, JsonRejection>,
) -> AppResult<Response> {
    let event_id = path_param(path)?;
    let submission = json_body(payload)?;
    let feedback = state
        .feedback()
        .submit(&identity, event_id, submission)
        .await?;
    Ok(created(feedback, "Feedback submitted successfully"))
}

pub async fn platform_stats(State(state): State<AppState>) -> AppResult<Response> {
    let stats = state.stats().platform_stats().await?;
    Ok(success(stats, "Platform statistics retrieved successfully"))
}

use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::config::{create_cors_layer, create_security_headers_layer, Config};
use crate::handlers::{events, health_check, me, registrations};
use crate::state::AppState;

fn event_routes() -> Router<AppState> {
    Router::new()
        .route("/events", get(events::list_events).post(events::create_event))
        .route("/events/calendar", get(events::calendar))
        .route(
            "/events/:id",
            get(events::get_event).patch(events::update_event),
        )
        .route("/events/:id/stats", get(events::event_stats))
        .route("/events/:id/registrations", post(registrations::register))
        .route("/events/:id/check-in", post(registrations::check_in))
        .route("/events/:id/feedback", post(events::submit_feedback))
        .route(
            "/registrations/:id",
            delete(registrations::cancel_registration),
        )
}

fn me_routes() -> Router<AppState> {
    Router::new()
        .route("/me", get(me::get_profile).patch(me::update_profile))
        .route("/me/registrations", get(registrations::my_registrations))
        .route("/me/dashboard", get(me::dashboard))
        .route("/me/notifications", get(me::notifications))
        .route(
            "/me/notifications/:id/read",
            post(me::mark_notification_read),
        )
}

pub fn create_routes(state: AppState, config: &Config) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/categories", get(events::list_categories))
        .route("/stats", get(events::platform_stats))
        .route("/profiles", post(me::sign_up))
        .merge(event_routes())
        .merge(me_routes())
        .with_state(state)
        .layer(create_security_headers_layer(config.production))
        .layer(create_cors_layer(&config.allowed_origins))
        .layer(TraceLayer::new_for_http())
}

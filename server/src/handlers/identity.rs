use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

use crate::models::Identity;
use crate::state::AppState;
use crate::utils::error::AppError;

/// Set by the identity provider in front of this service.
pub const USER_ID_HEADER: &str = "x-user-id";

/// The authenticated caller of this request.
pub struct CurrentUser(pub Identity);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .ok_or_else(|| AppError::AuthError("Missing user identity".to_string()))?;

        let user_id = raw
            .to_str()
            .ok()
            .and_then(|value| Uuid::parse_str(value.trim()).ok())
            .ok_or_else(|| AppError::AuthError("Malformed user identity".to_string()))?;

        let profile = state
            .profiles()
            .find(user_id)
            .await?
            .ok_or_else(|| AppError::AuthError("Unknown user".to_string()))?;

        Ok(CurrentUser(Identity::from(&profile)))
    }
}

/// The caller if one identified itself. A missing or unrecognised identity
/// reads as anonymous; store failures still fail the request.
pub struct Viewer(pub Option<Identity>);

#[async_trait]
impl FromRequestParts<AppState> for Viewer {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match CurrentUser::from_request_parts(parts, state).await {
            Ok(CurrentUser(identity)) => Ok(Viewer(Some(identity))),
            Err(AppError::AuthError(_)) => Ok(Viewer(None)),
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::http::Request;
    use sqlx::postgres::PgPoolOptions;

    use super::*;
    use crate::repository::AppRegistry;

    fn parts_with_user(user_id: Uuid) -> Parts {
        let (parts, _) = Request::builder()
            .uri("/events")
            .header(USER_ID_HEADER, user_id.to_string())
            .body(())
            .unwrap()
            .into_parts();
        parts
    }

    #[tokio::test]
    async fn test_viewer_treats_unknown_user_as_anonymous() {
        let state = AppState::new(AppRegistry::in_memory());
        let mut parts = parts_with_user(Uuid::new_v4());

        let Viewer(viewer) = Viewer::from_request_parts(&mut parts, &state).await.unwrap();
        assert!(viewer.is_none());
    }

    #[tokio::test]
    async fn test_viewer_surfaces_store_failures() {
        let pool = PgPoolOptions::new()
            .acquire_timeout(Duration::from_millis(200))
            .connect_lazy("postgres://eventhub@127.0.0.1:1/eventhub")
            .unwrap();
        let state = AppState::new(AppRegistry::postgres(pool));
        let mut parts = parts_with_user(Uuid::new_v4());

        let result = Viewer::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(AppError::DatabaseError(_))));
    }
}

mod common;

use serde_json::json;
use uuid::Uuid;

use common::{day, publish, seed_profile, state_on};
use eventhub_server::models::{
    Event, EventFilter, EventStatus, EventUpdate, Identity, NewEvent, Notification,
    NotificationKind, Role,
};
use eventhub_server::repository::AppRegistry;
use eventhub_server::state::AppState;
use eventhub_server::utils::{AppError, ConflictKind};

fn draft_event(title: &str) -> NewEvent {
    serde_json::from_value(json!({
        "title": title,
        "date": day(20),
        "capacity": 10,
        "draft": true,
    }))
    .unwrap()
}

async fn create(state: &AppState, organizer: &Identity, body: serde_json::Value) -> Event {
    let new_event: NewEvent = serde_json::from_value(body).unwrap();
    state
        .catalog()
        .create_event(organizer, new_event)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_only_owner_or_admin_may_update() {
    let registry = AppRegistry::in_memory();
    let state = state_on(&registry, day(1));
    let owner = seed_profile(&registry, Role::Organizer).await;
    let rival = seed_profile(&registry, Role::Organizer).await;
    let attendee = seed_profile(&registry, Role::Consumer).await;
    let admin = seed_profile(&registry, Role::Admin).await;
    let event = publish(&state, &owner, day(10), 10).await;

    let rename = || EventUpdate {
        title: Some("Renamed".to_string()),
        ..EventUpdate::default()
    };

    for outsider in [&rival, &attendee] {
        let err = state
            .catalog()
            .update_event(outsider, event.id, rename())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    let updated = state
        .catalog()
        .update_event(&admin, event.id, rename())
        .await
        .unwrap();
    assert_eq!(updated.title, "Renamed");
}

#[tokio::test]
async fn test_completed_status_cannot_be_set() {
    let registry = AppRegistry::in_memory();
    let state = state_on(&registry, day(1));
    let owner = seed_profile(&registry, Role::Organizer).await;
    let event = publish(&state, &owner, day(10), 10).await;

    let err = state
        .catalog()
        .update_event(
            &owner,
            event.id,
            EventUpdate {
                status: Some(EventStatus::Completed),
                ..EventUpdate::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ValidationError(_)));

    let detail = state.catalog().get_event(None, event.id).await.unwrap();
    assert_eq!(detail.summary.event.status, EventStatus::Active);
}

#[tokio::test]
async fn test_cancelling_notifies_seat_holders_and_closes_registration() {
    let registry = AppRegistry::in_memory();
    let state = state_on(&registry, day(1));
    let owner = seed_profile(&registry, Role::Organizer).await;
    let alice = seed_profile(&registry, Role::Consumer).await;
    let bob = seed_profile(&registry, Role::Consumer).await;
    let carol = seed_profile(&registry, Role::Consumer).await;
    let event = publish(&state, &owner, day(10), 10).await;

    state.ledger().register(&alice, event.id).await.unwrap();
    let bobs = state.ledger().register(&bob, event.id).await.unwrap();
    state.ledger().cancel(&bob, bobs.id).await.unwrap();

    state
        .catalog()
        .update_event(
            &owner,
            event.id,
            EventUpdate {
                status: Some(EventStatus::Cancelled),
                ..EventUpdate::default()
            },
        )
        .await
        .unwrap();

    let warnings = |inbox: Vec<Notification>| {
        inbox
            .into_iter()
            .filter(|notification| notification.kind == NotificationKind::Warning)
            .count()
    };
    assert_eq!(warnings(state.inbox().list(&alice).await.unwrap()), 1);
    assert_eq!(warnings(state.inbox().list(&bob).await.unwrap()), 0);

    let err = state.ledger().register(&carol, event.id).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(ConflictKind::RegistrationClosed)));
}

#[tokio::test]
async fn test_drafts_are_visible_to_editors_only() {
    let registry = AppRegistry::in_memory();
    let state = state_on(&registry, day(1));
    let owner = seed_profile(&registry, Role::Organizer).await;
    let rival = seed_profile(&registry, Role::Organizer).await;
    let admin = seed_profile(&registry, Role::Admin).await;
    let draft = state
        .catalog()
        .create_event(&owner, draft_event("Secret Launch"))
        .await
        .unwrap();

    for viewer in [None, Some(&rival)] {
        let err = state.catalog().get_event(viewer, draft.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let err = state.stats().event_stats(viewer, draft.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    for editor in [&owner, &admin] {
        assert!(state.catalog().get_event(Some(editor), draft.id).await.is_ok());
        assert!(state.stats().event_stats(Some(editor), draft.id).await.is_ok());
    }

    let listed = state
        .catalog()
        .search(&EventFilter {
            organizer_id: Some(owner.user_id),
            ..EventFilter::default()
        })
        .await
        .unwrap();
    assert!(listed.is_empty());
}

#[tokio::test]
async fn test_search_filters_and_orders_by_date() {
    let registry = AppRegistry::in_memory();
    let state = state_on(&registry, day(5));
    let owner = seed_profile(&registry, Role::Organizer).await;
    let other = seed_profile(&registry, Role::Organizer).await;
    let technology = Uuid::from_u128(1);
    let music = Uuid::from_u128(2);

    create(
        &state,
        &owner,
        json!({
            "title": "Rust Conf",
            "date": day(12),
            "capacity": 100,
            "category_id": technology,
            "is_featured": true,
        }),
    )
    .await;
    create(
        &state,
        &owner,
        json!({
            "title": "Jazz Night",
            "date": day(10),
            "capacity": 40,
            "category_id": music,
            "tags": ["music", "live"],
        }),
    )
    .await;
    create(
        &state,
        &other,
        json!({ "title": "Board Games", "date": day(15), "capacity": 12 }),
    )
    .await;
    create(
        &state,
        &owner,
        json!({ "title": "Last Week's Meetup", "date": day(3), "capacity": 12 }),
    )
    .await;
    state
        .catalog()
        .create_event(&owner, draft_event("Unannounced"))
        .await
        .unwrap();

    let search = |filter: EventFilter| {
        let state = state.clone();
        async move {
            let summaries = state.catalog().search(&filter).await.unwrap();
            summaries
                .into_iter()
                .map(|summary| summary.event.title)
                .collect::<Vec<_>>()
        }
    };

    assert_eq!(
        search(EventFilter::default()).await,
        vec!["Jazz Night", "Rust Conf", "Board Games"]
    );
    assert_eq!(
        search(EventFilter {
            q: Some("RUST".to_string()),
            ..EventFilter::default()
        })
        .await,
        vec!["Rust Conf"]
    );
    assert_eq!(
        search(EventFilter {
            q: Some("live".to_string()),
            ..EventFilter::default()
        })
        .await,
        vec!["Jazz Night"]
    );
    assert_eq!(
        search(EventFilter {
            category_id: Some(music),
            ..EventFilter::default()
        })
        .await,
        vec!["Jazz Night"]
    );
    assert_eq!(
        search(EventFilter {
            featured: Some(true),
            ..EventFilter::default()
        })
        .await,
        vec!["Rust Conf"]
    );
    assert_eq!(
        search(EventFilter {
            organizer_id: Some(other.user_id),
            ..EventFilter::default()
        })
        .await,
        vec!["Board Games"]
    );
    assert_eq!(
        search(EventFilter {
            limit: Some(2),
            ..EventFilter::default()
        })
        .await,
        vec!["Jazz Night", "Rust Conf"]
    );
}

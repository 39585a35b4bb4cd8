mod common;

use common::{day, publish, seed_profile, state_on};
use eventhub_server::models::{NewFeedback, RegistrationStatus, Role};
use eventhub_server::repository::AppRegistry;
use eventhub_server::services::lifecycle::EffectiveStatus;
use eventhub_server::utils::{AppError, ConflictKind};

#[tokio::test]
async fn test_last_seat_goes_to_first_registrant() {
    let registry = AppRegistry::in_memory();
    let state = state_on(&registry, day(1));
    let organizer = seed_profile(&registry, Role::Organizer).await;
    let alice = seed_profile(&registry, Role::Consumer).await;
    let bob = seed_profile(&registry, Role::Consumer).await;
    let event = publish(&state, &organizer, day(10), 1).await;

    let first = state.ledger().register(&alice, event.id).await.unwrap();
    assert_eq!(first.status, RegistrationStatus::Confirmed);

    let err = state.ledger().register(&bob, event.id).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(ConflictKind::EventFull)));

    // A freed seat is not handed out automatically.
    state.ledger().cancel(&alice, first.id).await.unwrap();
    assert_eq!(state.stats().confirmed_count(event.id).await.unwrap(), 0);

    let second = state.ledger().register(&bob, event.id).await.unwrap();
    assert_eq!(second.status, RegistrationStatus::Confirmed);
    assert_eq!(state.stats().confirmed_count(event.id).await.unwrap(), 1);
}

#[tokio::test]
async fn test_concurrent_registrations_never_overfill() {
    let registry = AppRegistry::in_memory();
    let state = state_on(&registry, day(1));
    let organizer = seed_profile(&registry, Role::Organizer).await;
    let event = publish(&state, &organizer, day(10), 3).await;

    let mut attendees = Vec::new();
    for _ in 0..12 {
        attendees.push(seed_profile(&registry, Role::Consumer).await);
    }

    let event_id = event.id;
    let handles: Vec<_> = attendees
        .into_iter()
        .map(|attendee| {
            let state = state.clone();
            tokio::spawn(async move { state.ledger().register(&attendee, event_id).await })
        })
        .collect();

    let mut admitted = 0;
    let mut full = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => admitted += 1,
            Err(AppError::Conflict(ConflictKind::EventFull)) => full += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(admitted, 3);
    assert_eq!(full, 9);
    assert_eq!(state.stats().confirmed_count(event.id).await.unwrap(), 3);
}

#[tokio::test]
async fn test_duplicate_registration_is_rejected() {
    let registry = AppRegistry::in_memory();
    let state = state_on(&registry, day(1));
    let organizer = seed_profile(&registry, Role::Organizer).await;
    let alice = seed_profile(&registry, Role::Consumer).await;
    let event = publish(&state, &organizer, day(10), 10).await;

    state.ledger().register(&alice, event.id).await.unwrap();
    let err = state.ledger().register(&alice, event.id).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(ConflictKind::AlreadyRegistered)));
}

#[tokio::test]
async fn test_cancel_twice_conflicts() {
    let registry = AppRegistry::in_memory();
    let state = state_on(&registry, day(1));
    let organizer = seed_profile(&registry, Role::Organizer).await;
    let alice = seed_profile(&registry, Role::Consumer).await;
    let mallory = seed_profile(&registry, Role::Consumer).await;
    let event = publish(&state, &organizer, day(10), 10).await;

    let registration = state.ledger().register(&alice, event.id).await.unwrap();

    let err = state
        .ledger()
        .cancel(&mallory, registration.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let cancelled = state.ledger().cancel(&alice, registration.id).await.unwrap();
    assert_eq!(cancelled.status, RegistrationStatus::Cancelled);

    let err = state
        .ledger()
        .cancel(&alice, registration.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(ConflictKind::AlreadyCancelled)));
}

#[tokio::test]
async fn test_past_event_closes_registration() {
    let registry = AppRegistry::in_memory();
    let organizer = seed_profile(&registry, Role::Organizer).await;
    let alice = seed_profile(&registry, Role::Consumer).await;
    let event = publish(&state_on(&registry, day(1)), &organizer, day(5), 10).await;

    let later = state_on(&registry, day(6));
    let err = later.ledger().register(&alice, event.id).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(ConflictKind::RegistrationClosed)));

    let stats = later.stats().event_stats(None, event.id).await.unwrap();
    assert_eq!(stats.effective_status, EffectiveStatus::Completed);
}

#[tokio::test]
async fn test_check_in_on_event_day() {
    let registry = AppRegistry::in_memory();
    let organizer = seed_profile(&registry, Role::Organizer).await;
    let alice = seed_profile(&registry, Role::Consumer).await;
    let before = state_on(&registry, day(1));
    let event = publish(&before, &organizer, day(5), 10).await;
    let registration = before.ledger().register(&alice, event.id).await.unwrap();

    let err = before
        .ledger()
        .check_in(&alice, event.id, &event.check_in_code)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(ConflictKind::CheckInClosed)));

    let on_the_day = state_on(&registry, day(5));
    let err = on_the_day
        .ledger()
        .check_in(&alice, event.id, "WRONG1")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ValidationError(_)));

    let checked_in = on_the_day
        .ledger()
        .check_in(&alice, event.id, &event.check_in_code.to_lowercase())
        .await
        .unwrap();
    assert_eq!(checked_in.status, RegistrationStatus::CheckedIn);
    assert!(checked_in.checked_in_at.is_some());

    let err = on_the_day
        .ledger()
        .cancel(&alice, registration.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(ConflictKind::AlreadyCheckedIn)));

    // Checked-in attendees still hold their seat.
    assert_eq!(on_the_day.stats().confirmed_count(event.id).await.unwrap(), 1);
}

#[tokio::test]
async fn test_feedback_once_after_event() {
    let registry = AppRegistry::in_memory();
    let organizer = seed_profile(&registry, Role::Organizer).await;
    let alice = seed_profile(&registry, Role::Consumer).await;
    let stranger = seed_profile(&registry, Role::Consumer).await;
    let before = state_on(&registry, day(1));
    let event = publish(&before, &organizer, day(5), 10).await;
    before.ledger().register(&alice, event.id).await.unwrap();

    let review = || NewFeedback {
        rating: 4,
        comment: Some("Great talks".to_string()),
    };

    let err = before
        .feedback()
        .submit(&alice, event.id, review())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(ConflictKind::FeedbackClosed)));

    let after = state_on(&registry, day(6));
    let err = after
        .feedback()
        .submit(&stranger, event.id, review())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let feedback = after
        .feedback()
        .submit(&alice, event.id, review())
        .await
        .unwrap();
    assert_eq!(feedback.rating, 4);

    let err = after
        .feedback()
        .submit(&alice, event.id, review())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(ConflictKind::FeedbackExists)));

    let stats = after.stats().event_stats(None, event.id).await.unwrap();
    assert_eq!(stats.feedback_count, 1);
    assert!((stats.average_rating - 4.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_organizer_stats_across_events() {
    let registry = AppRegistry::in_memory();
    let state = state_on(&registry, day(1));
    let organizer = seed_profile(&registry, Role::Organizer).await;

    let mut attendees = Vec::new();
    for _ in 0..15 {
        attendees.push(seed_profile(&registry, Role::Consumer).await);
    }

    let small = publish(&state, &organizer, day(10), 5).await;
    let _empty = publish(&state, &organizer, day(11), 20).await;
    let large = publish(&state, &organizer, day(12), 10).await;

    for attendee in &attendees[..5] {
        state.ledger().register(attendee, small.id).await.unwrap();
    }
    for attendee in &attendees[5..] {
        state.ledger().register(attendee, large.id).await.unwrap();
    }

    let stats = state.stats().organizer_stats(organizer.user_id).await.unwrap();
    assert_eq!(stats.total_events, 3);
    assert_eq!(stats.total_registrations, 15);
    assert_eq!(stats.upcoming_events, 3);
}

#[tokio::test]
async fn test_registration_sends_notification() {
    let registry = AppRegistry::in_memory();
    let state = state_on(&registry, day(1));
    let organizer = seed_profile(&registry, Role::Organizer).await;
    let alice = seed_profile(&registry, Role::Consumer).await;
    let event = publish(&state, &organizer, day(10), 10).await;

    state.ledger().register(&alice, event.id).await.unwrap();

    let inbox = state.inbox().list(&alice).await.unwrap();
    assert_eq!(inbox.len(), 1);
    assert!(!inbox[0].read);

    state.inbox().mark_read(&alice, inbox[0].id).await.unwrap();
    let inbox = state.inbox().list(&alice).await.unwrap();
    assert!(inbox[0].read);
}

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use pretty_assertions::assert_eq;
use uuid::Uuid;

use bookline_core::clock::ManualClock;
use bookline_core::engine::ReservationEngine;
use bookline_core::errors::ReservationError;
use bookline_core::models::booking::BookingStatus;
use bookline_core::models::principal::Principal;
use bookline_core::models::slot::{Slot, SlotCategory};
use bookline_core::notify::{BookingEvent, EventKind, NotificationPort, RecordingNotifier};
use bookline_core::store::{BookingStore, SlotStore};
use bookline_db::memory::MemoryStore;

type TestEngine = ReservationEngine<MemoryStore, ManualClock, RecordingNotifier>;

struct Fixture {
    store: MemoryStore,
    clock: ManualClock,
    notifier: RecordingNotifier,
    engine: TestEngine,
    provider: Principal,
    slot: Slot,
}

/// Slot on 2025-01-10 09:00-09:30 UTC, clock at 08:00 the same morning.
async fn fixture() -> Fixture {
    let store = MemoryStore::new();
    let clock = ManualClock::new(Utc.with_ymd_and_hms(2025, 1, 10, 8, 0, 0).unwrap());
    let notifier = RecordingNotifier::new();
    let engine = ReservationEngine::new(store.clone(), clock.clone(), notifier.clone());

    let provider = Principal::provider(Uuid::new_v4());
    let slot = engine
        .create_slot(
            &provider,
            NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(),
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
            SlotCategory::Consultation,
        )
        .await
        .expect("failed to seed slot");

    Fixture {
        store,
        clock,
        notifier,
        engine,
        provider,
        slot,
    }
}

#[tokio::test]
async fn test_book_flips_slot_and_confirms_booking() {
    let f = fixture().await;
    let requester = Principal::requester(Uuid::new_v4());

    let booking = f
        .engine
        .book(f.slot.id, &requester, Some("first visit".to_string()))
        .await
        .unwrap();

    assert_eq!(booking.slot_id, f.slot.id);
    assert_eq!(booking.requester_id, requester.id);
    assert_eq!(booking.status, BookingStatus::Confirmed);
    assert_eq!(booking.notes.as_deref(), Some("first visit"));

    let slot = f.store.find_slot(f.slot.id).await.unwrap().unwrap();
    assert!(slot.booked);

    let events = f.notifier.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, EventKind::BookingConfirmed);
    assert_eq!(events[0].booking_id, booking.id);
    assert_eq!(events[0].slot_id, f.slot.id);
    assert_eq!(events[0].provider_id, f.provider.id);
}

#[test_log::test(tokio::test)]
async fn test_no_double_booking_under_concurrent_requests() {
    let f = fixture().await;
    let engine = Arc::new(f.engine);

    let mut handles = Vec::new();
    for _ in 0..8 {
        let engine = Arc::clone(&engine);
        let slot_id = f.slot.id;
        handles.push(tokio::spawn(async move {
            let requester = Principal::requester(Uuid::new_v4());
            engine.book(slot_id, &requester, None).await
        }));
    }

    let mut confirmed = 0;
    let mut unavailable = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(booking) => {
                assert_eq!(booking.status, BookingStatus::Confirmed);
                confirmed += 1;
            }
            Err(ReservationError::SlotUnavailable(id)) => {
                assert_eq!(id, f.slot.id);
                unavailable += 1;
            }
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(confirmed, 1);
    assert_eq!(unavailable, 7);
    assert!(f.store.find_slot(f.slot.id).await.unwrap().unwrap().booked);
}

#[tokio::test]
async fn test_booked_slot_is_unavailable() {
    let f = fixture().await;
    let requester = Principal::requester(Uuid::new_v4());
    f.engine.book(f.slot.id, &requester, None).await.unwrap();

    let late_requester = Principal::requester(Uuid::new_v4());
    let result = f.engine.book(f.slot.id, &late_requester, None).await;

    assert!(matches!(
        result,
        Err(ReservationError::SlotUnavailable(id)) if id == f.slot.id
    ));
}

#[tokio::test]
async fn test_cancel_then_rebook() {
    let f = fixture().await;
    let first = Principal::requester(Uuid::new_v4());
    let booking = f.engine.book(f.slot.id, &first, None).await.unwrap();

    f.engine.cancel(booking.id, &first).await.unwrap();

    let slot = f.store.find_slot(f.slot.id).await.unwrap().unwrap();
    assert!(!slot.booked);
    let cancelled = f.store.find_booking(booking.id).await.unwrap().unwrap();
    assert_eq!(cancelled.status, BookingStatus::Cancelled);

    let second = Principal::requester(Uuid::new_v4());
    let rebooked = f.engine.book(f.slot.id, &second, None).await.unwrap();

    assert_ne!(rebooked.id, booking.id);
    assert_eq!(rebooked.status, BookingStatus::Confirmed);
    assert!(f.store.find_slot(f.slot.id).await.unwrap().unwrap().booked);
}

#[tokio::test]
async fn test_cancel_on_cancelled_booking_is_invalid_transition() {
    let f = fixture().await;
    let requester = Principal::requester(Uuid::new_v4());
    let booking = f.engine.book(f.slot.id, &requester, None).await.unwrap();

    f.engine.cancel(booking.id, &requester).await.unwrap();
    let result = f.engine.cancel(booking.id, &requester).await;

    assert!(matches!(
        result,
        Err(ReservationError::InvalidTransition {
            from: BookingStatus::Cancelled
        })
    ));
}

#[tokio::test]
async fn test_past_slot_is_rejected_even_when_unbooked() {
    let f = fixture().await;
    let requester = Principal::requester(Uuid::new_v4());

    // Advance past the slot's start; the booked flag is still false.
    f.clock.set(f.slot.starts_at() + Duration::minutes(1));

    let result = f.engine.book(f.slot.id, &requester, None).await;
    assert!(matches!(
        result,
        Err(ReservationError::SlotUnavailable(id)) if id == f.slot.id
    ));
}

#[tokio::test]
async fn test_slot_starting_exactly_now_is_rejected() {
    let f = fixture().await;
    let requester = Principal::requester(Uuid::new_v4());

    f.clock.set(f.slot.starts_at());

    let result = f.engine.book(f.slot.id, &requester, None).await;
    assert!(matches!(result, Err(ReservationError::SlotUnavailable(_))));
}

#[tokio::test]
async fn test_third_party_cancel_is_forbidden_and_leaves_state_unchanged() {
    let f = fixture().await;
    let requester = Principal::requester(Uuid::new_v4());
    let booking = f.engine.book(f.slot.id, &requester, None).await.unwrap();

    let stranger = Principal::requester(Uuid::new_v4());
    let result = f.engine.cancel(booking.id, &stranger).await;

    assert!(matches!(result, Err(ReservationError::Forbidden(_))));
    assert!(f.store.find_slot(f.slot.id).await.unwrap().unwrap().booked);
    let unchanged = f.store.find_booking(booking.id).await.unwrap().unwrap();
    assert_eq!(unchanged.status, BookingStatus::Confirmed);
}

#[tokio::test]
async fn test_provider_may_cancel_a_booking_on_their_slot() {
    let f = fixture().await;
    let requester = Principal::requester(Uuid::new_v4());
    let booking = f.engine.book(f.slot.id, &requester, None).await.unwrap();

    f.engine.cancel(booking.id, &f.provider).await.unwrap();

    assert!(!f.store.find_slot(f.slot.id).await.unwrap().unwrap().booked);
}

#[tokio::test]
async fn test_commit_failure_leaves_no_partial_state() {
    let f = fixture().await;
    let requester = Principal::requester(Uuid::new_v4());

    f.store.fail_next_commit();
    let result = f.engine.book(f.slot.id, &requester, None).await;
    assert!(matches!(result, Err(ReservationError::Store(_))));

    // Neither the booking insert nor the flag flip survived.
    let slot = f.store.find_slot(f.slot.id).await.unwrap().unwrap();
    assert!(!slot.booked);
    let bookings = f
        .store
        .list_bookings_for_requester(requester.id)
        .await
        .unwrap();
    assert!(bookings.is_empty());
    assert!(f.notifier.events().is_empty());

    // A fresh attempt behaves as if nothing had happened.
    let booking = f.engine.book(f.slot.id, &requester, None).await.unwrap();
    assert_eq!(booking.status, BookingStatus::Confirmed);
}

#[test_log::test(tokio::test)]
async fn test_concurrent_cancels_only_one_wins() {
    let f = fixture().await;
    let requester = Principal::requester(Uuid::new_v4());
    let booking = f.engine.book(f.slot.id, &requester, None).await.unwrap();

    let engine = Arc::new(f.engine);
    let mut handles = Vec::new();
    for caller in [requester, f.provider] {
        let engine = Arc::clone(&engine);
        let booking_id = booking.id;
        handles.push(tokio::spawn(async move {
            engine.cancel(booking_id, &caller).await
        }));
    }

    let mut cancelled = 0;
    let mut rejected = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(()) => cancelled += 1,
            Err(ReservationError::InvalidTransition {
                from: BookingStatus::Cancelled,
            }) => rejected += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(cancelled, 1);
    assert_eq!(rejected, 1);
    assert!(!f.store.find_slot(f.slot.id).await.unwrap().unwrap().booked);
}

#[tokio::test]
async fn test_provider_cannot_book_own_slot() {
    let f = fixture().await;

    // Same identity, requester capability: still rejected.
    let requester = Principal::requester(f.provider.id);
    let result = f.engine.book(f.slot.id, &requester, None).await;
    assert!(matches!(result, Err(ReservationError::InvalidRequester(_))));

    // Provider capability is rejected before any store access.
    let result = f.engine.book(f.slot.id, &f.provider, None).await;
    assert!(matches!(result, Err(ReservationError::InvalidRequester(_))));
}

#[tokio::test]
async fn test_booking_unknown_slot_is_not_found() {
    let f = fixture().await;
    let requester = Principal::requester(Uuid::new_v4());
    let missing = Uuid::new_v4();

    let result = f.engine.book(missing, &requester, None).await;
    assert!(matches!(
        result,
        Err(ReservationError::SlotNotFound(id)) if id == missing
    ));
}

#[tokio::test]
async fn test_cancel_unknown_booking_is_not_found() {
    let f = fixture().await;
    let missing = Uuid::new_v4();

    let result = f
        .engine
        .cancel(missing, &Principal::requester(Uuid::new_v4()))
        .await;
    assert!(matches!(
        result,
        Err(ReservationError::BookingNotFound(id)) if id == missing
    ));
}

/// A port whose publish always fails; bookings must not notice.
struct FailingNotifier;

#[async_trait]
impl NotificationPort for FailingNotifier {
    async fn publish(&self, _event: BookingEvent) -> eyre::Result<()> {
        Err(eyre::eyre!("notification endpoint unreachable"))
    }
}

#[tokio::test]
async fn test_notification_failure_never_fails_the_reservation() {
    let store = MemoryStore::new();
    let clock = ManualClock::new(Utc.with_ymd_and_hms(2025, 1, 10, 8, 0, 0).unwrap());
    let engine = ReservationEngine::new(store.clone(), clock, FailingNotifier);

    let provider = Principal::provider(Uuid::new_v4());
    let slot = engine
        .create_slot(
            &provider,
            NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(),
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
            SlotCategory::FollowUp,
        )
        .await
        .unwrap();

    let requester = Principal::requester(Uuid::new_v4());
    let booking = engine.book(slot.id, &requester, None).await.unwrap();

    // The commit stood even though the event was never delivered.
    assert_eq!(booking.status, BookingStatus::Confirmed);
    assert!(store.find_slot(slot.id).await.unwrap().unwrap().booked);

    engine.cancel(booking.id, &requester).await.unwrap();
    assert!(!store.find_slot(slot.id).await.unwrap().unwrap().booked);
}

#[tokio::test]
async fn test_cancel_emits_cancellation_event() {
    let f = fixture().await;
    let requester = Principal::requester(Uuid::new_v4());
    let booking = f.engine.book(f.slot.id, &requester, None).await.unwrap();

    f.engine.cancel(booking.id, &requester).await.unwrap();

    let kinds: Vec<EventKind> = f.notifier.events().iter().map(|e| e.kind).collect();
    assert_eq!(
        kinds,
        vec![EventKind::BookingConfirmed, EventKind::BookingCancelled]
    );
}

#[tokio::test]
async fn test_attach_calendar_event() {
    let f = fixture().await;
    let requester = Principal::requester(Uuid::new_v4());
    let booking = f.engine.book(f.slot.id, &requester, None).await.unwrap();

    f.engine
        .attach_calendar_event(booking.id, &requester, "gcal-event-42")
        .await
        .unwrap();

    let stored = f.store.find_booking(booking.id).await.unwrap().unwrap();
    assert_eq!(stored.calendar_event_ref.as_deref(), Some("gcal-event-42"));

    let stranger = Principal::requester(Uuid::new_v4());
    let result = f
        .engine
        .attach_calendar_event(booking.id, &stranger, "gcal-event-43")
        .await;
    assert!(matches!(result, Err(ReservationError::Forbidden(_))));
}

#[tokio::test]
async fn test_create_slot_rejects_inverted_window() {
    let f = fixture().await;

    let result = f
        .engine
        .create_slot(
            &f.provider,
            NaiveDate::from_ymd_opt(2025, 1, 11).unwrap(),
            NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            SlotCategory::Consultation,
        )
        .await;

    assert!(matches!(result, Err(ReservationError::Validation(_))));
}

#[tokio::test]
async fn test_create_slot_requires_provider_capability() {
    let f = fixture().await;
    let requester = Principal::requester(Uuid::new_v4());

    let result = f
        .engine
        .create_slot(
            &requester,
            NaiveDate::from_ymd_opt(2025, 1, 11).unwrap(),
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
            SlotCategory::Consultation,
        )
        .await;

    assert!(matches!(result, Err(ReservationError::InvalidRequester(_))));
}

#[tokio::test]
async fn test_delete_slot_rules() {
    let f = fixture().await;
    let requester = Principal::requester(Uuid::new_v4());
    let booking = f.engine.book(f.slot.id, &requester, None).await.unwrap();

    // Not the owner.
    let other_provider = Principal::provider(Uuid::new_v4());
    let result = f.engine.delete_slot(f.slot.id, &other_provider).await;
    assert!(matches!(result, Err(ReservationError::Forbidden(_))));

    // Owner, but an active booking references the slot.
    let result = f.engine.delete_slot(f.slot.id, &f.provider).await;
    assert!(matches!(result, Err(ReservationError::Store(_))));

    // Released slots can be deleted.
    f.engine.cancel(booking.id, &requester).await.unwrap();
    f.engine.delete_slot(f.slot.id, &f.provider).await.unwrap();
    assert!(f.store.find_slot(f.slot.id).await.unwrap().is_none());
}

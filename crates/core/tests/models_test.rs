use chrono::{Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use pretty_assertions::assert_eq;
use rstest::rstest;
use serde_json::{from_str, to_string};
use uuid::Uuid;

use bookline_core::models::{
    booking::{BookSlotRequest, Booking, BookingResponse, BookingStatus},
    principal::{Principal, Role},
    slot::{Slot, SlotCategory, SlotResponse},
};

fn sample_slot() -> Slot {
    Slot {
        id: Uuid::new_v4(),
        provider_id: Uuid::new_v4(),
        date: NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(),
        start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
        end_time: NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
        category: SlotCategory::Consultation,
        booked: false,
        created_at: Utc::now(),
    }
}

#[test]
fn test_slot_serialization() {
    let slot = sample_slot();

    let json = to_string(&slot).expect("Failed to serialize slot");
    let deserialized: Slot = from_str(&json).expect("Failed to deserialize slot");

    assert_eq!(deserialized.id, slot.id);
    assert_eq!(deserialized.provider_id, slot.provider_id);
    assert_eq!(deserialized.date, slot.date);
    assert_eq!(deserialized.start_time, slot.start_time);
    assert_eq!(deserialized.end_time, slot.end_time);
    assert_eq!(deserialized.category, slot.category);
    assert_eq!(deserialized.booked, slot.booked);
}

#[test]
fn test_slot_starts_at_is_utc_instant() {
    let slot = sample_slot();

    let expected = Utc.with_ymd_and_hms(2025, 1, 10, 9, 0, 0).unwrap();
    assert_eq!(slot.starts_at(), expected);
}

#[test]
fn test_slot_expiry_is_derived_from_now() {
    let slot = sample_slot();
    let start = slot.starts_at();

    assert!(!slot.is_expired(start - Duration::minutes(1)));
    assert!(slot.is_expired(start));
    assert!(slot.is_expired(start + Duration::minutes(1)));
}

#[test]
fn test_slot_is_open() {
    let mut slot = sample_slot();
    let before_start = slot.starts_at() - Duration::hours(1);

    assert!(slot.is_open(before_start));

    slot.booked = true;
    assert!(!slot.is_open(before_start));

    slot.booked = false;
    assert!(!slot.is_open(slot.starts_at() + Duration::hours(1)));
}

#[rstest]
#[case(SlotCategory::Consultation, "consultation")]
#[case(SlotCategory::FollowUp, "follow_up")]
#[case(SlotCategory::Emergency, "emergency")]
fn test_slot_category_round_trip(#[case] category: SlotCategory, #[case] text: &str) {
    assert_eq!(category.to_string(), text);
    assert_eq!(text.parse::<SlotCategory>().unwrap(), category);

    let json = to_string(&category).unwrap();
    assert_eq!(json, format!("\"{text}\""));
}

#[test]
fn test_unknown_slot_category_rejected() {
    assert!("walk_in".parse::<SlotCategory>().is_err());
}

#[rstest]
#[case(BookingStatus::Confirmed, "confirmed", false)]
#[case(BookingStatus::Completed, "completed", true)]
#[case(BookingStatus::Cancelled, "cancelled", true)]
#[case(BookingStatus::NoShow, "no_show", true)]
fn test_booking_status_text_and_terminality(
    #[case] status: BookingStatus,
    #[case] text: &str,
    #[case] terminal: bool,
) {
    assert_eq!(status.to_string(), text);
    assert_eq!(text.parse::<BookingStatus>().unwrap(), status);
    assert_eq!(status.is_terminal(), terminal);
}

#[test]
fn test_booking_is_active() {
    let mut booking = Booking {
        id: Uuid::new_v4(),
        slot_id: Uuid::new_v4(),
        requester_id: Uuid::new_v4(),
        status: BookingStatus::Confirmed,
        notes: Some("first visit".to_string()),
        calendar_event_ref: None,
        created_at: Utc::now(),
    };

    assert!(booking.is_active());

    booking.status = BookingStatus::Cancelled;
    assert!(!booking.is_active());
}

#[test]
fn test_booking_response_from_booking() {
    let booking = Booking {
        id: Uuid::new_v4(),
        slot_id: Uuid::new_v4(),
        requester_id: Uuid::new_v4(),
        status: BookingStatus::Confirmed,
        notes: None,
        calendar_event_ref: Some("gcal-event-42".to_string()),
        created_at: Utc::now(),
    };

    let response = BookingResponse::from(booking.clone());

    assert_eq!(response.id, booking.id);
    assert_eq!(response.slot_id, booking.slot_id);
    assert_eq!(response.requester_id, booking.requester_id);
    assert_eq!(response.status, booking.status);
    assert_eq!(response.calendar_event_ref, booking.calendar_event_ref);
}

#[test]
fn test_slot_response_from_slot() {
    let slot = sample_slot();
    let response = SlotResponse::from(slot.clone());

    assert_eq!(response.id, slot.id);
    assert_eq!(response.provider_id, slot.provider_id);
    assert_eq!(response.booked, slot.booked);
    assert_eq!(response.category, slot.category);
}

#[test]
fn test_book_slot_request_deserialization() {
    let requester_id = Uuid::new_v4();
    let json = format!(
        r#"{{"requester_id":"{requester_id}","role":"requester","notes":"recurring back pain"}}"#
    );

    let request: BookSlotRequest = from_str(&json).expect("Failed to deserialize book request");

    assert_eq!(request.requester_id, requester_id);
    assert_eq!(request.role, Role::Requester);
    assert_eq!(request.notes.as_deref(), Some("recurring back pain"));
}

#[test]
fn test_principal_constructors() {
    let id = Uuid::new_v4();

    assert_eq!(Principal::provider(id).role, Role::Provider);
    assert_eq!(Principal::requester(id).role, Role::Requester);
    assert_eq!(Principal::provider(id).id, id);
}

#[rstest]
#[case(Role::Provider, "\"provider\"")]
#[case(Role::Requester, "\"requester\"")]
fn test_role_serialization(#[case] role: Role, #[case] json: &str) {
    assert_eq!(to_string(&role).unwrap(), json);
    assert_eq!(from_str::<Role>(json).unwrap(), role);
}

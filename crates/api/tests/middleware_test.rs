use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use rstest::rstest;
use uuid::Uuid;

use bookline_api::middleware::error_handling::map_error;
use bookline_core::errors::{ReservationError, StoreError};
use bookline_core::models::booking::BookingStatus;

#[rstest]
#[case::slot_not_found(ReservationError::SlotNotFound(Uuid::nil()), StatusCode::NOT_FOUND)]
#[case::booking_not_found(ReservationError::BookingNotFound(Uuid::nil()), StatusCode::NOT_FOUND)]
#[case::slot_unavailable(ReservationError::SlotUnavailable(Uuid::nil()), StatusCode::CONFLICT)]
#[case::already_booked(ReservationError::AlreadyBooked(Uuid::nil()), StatusCode::CONFLICT)]
#[case::invalid_transition(
    ReservationError::InvalidTransition { from: BookingStatus::Cancelled },
    StatusCode::CONFLICT
)]
#[case::store_conflict(
    ReservationError::Store(StoreError::Conflict("duplicate slot".to_string())),
    StatusCode::CONFLICT
)]
#[case::forbidden(
    ReservationError::Forbidden("not a party to the booking".to_string()),
    StatusCode::FORBIDDEN
)]
#[case::invalid_requester(
    ReservationError::InvalidRequester("only requesters may book slots".to_string()),
    StatusCode::FORBIDDEN
)]
#[case::validation(
    ReservationError::Validation("slot must end after it starts".to_string()),
    StatusCode::BAD_REQUEST
)]
fn test_error_status_mapping(#[case] error: ReservationError, #[case] expected: StatusCode) {
    let response = map_error(error);

    assert_eq!(response.status(), expected);
}

#[test]
fn test_infrastructure_errors_map_to_500() {
    let error = ReservationError::Store(StoreError::Database(eyre::eyre!("connection refused")));

    let response = map_error(error);

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

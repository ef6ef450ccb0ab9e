//! # Booking Handlers
//!
//! Handlers for the reservation protocol: booking a slot, cancelling a
//! booking, attaching an external-calendar reference, and listing bookings.
//! Each handler builds a `Principal` from the identity and role asserted in
//! the request and hands it to the engine; the engine decides authorization
//! against the slot and booking rows alone.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use bookline_core::models::booking::{
    AttachCalendarRefRequest, BookSlotRequest, BookingResponse, CancelBookingRequest,
};
use bookline_core::models::principal::Principal;

use crate::{middleware::error_handling::AppError, ApiState};

#[axum::debug_handler]
pub async fn book_slot(
    State(state): State<Arc<ApiState>>,
    Path(slot_id): Path<Uuid>,
    Json(payload): Json<BookSlotRequest>,
) -> Result<Json<BookingResponse>, AppError> {
    let requester = Principal {
        id: payload.requester_id,
        role: payload.role,
    };

    let booking = state
        .engine
        .book(slot_id, &requester, payload.notes)
        .await?;

    Ok(Json(booking.into()))
}

#[axum::debug_handler]
pub async fn cancel_booking(
    State(state): State<Arc<ApiState>>,
    Path(booking_id): Path<Uuid>,
    Json(payload): Json<CancelBookingRequest>,
) -> Result<StatusCode, AppError> {
    let caller = Principal {
        id: payload.caller_id,
        role: payload.role,
    };

    state.engine.cancel(booking_id, &caller).await?;

    Ok(StatusCode::NO_CONTENT)
}

#[axum::debug_handler]
pub async fn attach_calendar_ref(
    State(state): State<Arc<ApiState>>,
    Path(booking_id): Path<Uuid>,
    Json(payload): Json<AttachCalendarRefRequest>,
) -> Result<StatusCode, AppError> {
    let caller = Principal {
        id: payload.caller_id,
        role: payload.role,
    };

    state
        .engine
        .attach_calendar_event(booking_id, &caller, &payload.event_ref)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

#[axum::debug_handler]
pub async fn requester_bookings(
    State(state): State<Arc<ApiState>>,
    Path(requester_id): Path<Uuid>,
) -> Result<Json<Vec<BookingResponse>>, AppError> {
    let bookings = state.engine.bookings_for_requester(requester_id).await?;

    Ok(Json(
        bookings.into_iter().map(BookingResponse::from).collect(),
    ))
}

#[axum::debug_handler]
pub async fn provider_bookings(
    State(state): State<Arc<ApiState>>,
    Path(provider_id): Path<Uuid>,
) -> Result<Json<Vec<BookingResponse>>, AppError> {
    let bookings = state.engine.bookings_for_provider(provider_id).await?;

    Ok(Json(
        bookings.into_iter().map(BookingResponse::from).collect(),
    ))
}

use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;

use crate::{handlers, ApiState};

pub fn routes() -> Router<Arc<ApiState>> {
    Router::new()
        .route("/api/slots/:id/book", post(handlers::bookings::book_slot))
        .route(
            "/api/bookings/:id/cancel",
            post(handlers::bookings::cancel_booking),
        )
        .route(
            "/api/bookings/:id/calendar-ref",
            put(handlers::bookings::attach_calendar_ref),
        )
        .route(
            "/api/requesters/:id/bookings",
            get(handlers::bookings::requester_bookings),
        )
        .route(
            "/api/providers/:id/bookings",
            get(handlers::bookings::provider_bookings),
        )
}

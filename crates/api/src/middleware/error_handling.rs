//! # Error Handling Middleware
//!
//! This module provides a standardized way to handle errors in the Bookline
//! API. It maps the reservation engine's error taxonomy to appropriate HTTP
//! status codes and JSON error responses: not-found errors to 404, conflict
//! errors (an unavailable slot, a lost booking race, a bad status
//! transition) to 409, authorization failures to 403, validation failures
//! to 400, and infrastructure failures to 500 so callers can key retry
//! policy off the status class.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use bookline_core::errors::{ReservationError, StoreError};
use serde_json::json;

/// Application error wrapper that provides HTTP status code mapping
///
/// `AppError` wraps domain-specific `ReservationError` instances and
/// implements `IntoResponse` to convert them into HTTP responses with
/// appropriate status codes and JSON payloads.
#[derive(Debug)]
pub struct AppError(pub ReservationError);

/// Converts application errors to HTTP responses
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Map error types to HTTP status codes
        let status = match &self.0 {
            ReservationError::SlotNotFound(_) | ReservationError::BookingNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            ReservationError::SlotUnavailable(_)
            | ReservationError::AlreadyBooked(_)
            | ReservationError::InvalidTransition { .. } => StatusCode::CONFLICT,
            ReservationError::InvalidRequester(_) | ReservationError::Forbidden(_) => {
                StatusCode::FORBIDDEN
            }
            ReservationError::Validation(_) => StatusCode::BAD_REQUEST,
            ReservationError::Store(StoreError::Conflict(_)) => StatusCode::CONFLICT,
            ReservationError::Store(StoreError::Database(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // Get the error message and format as JSON
        let message = self.0.to_string();
        let body = Json(json!({ "error": message }));

        // Combine status code and JSON body into a response
        (status, body).into_response()
    }
}

/// Automatic conversion from ReservationError to AppError
///
/// This implementation allows using `?` operator with functions that return
/// `Result<T, ReservationError>` in handler functions that return
/// `Result<T, AppError>`.
impl From<ReservationError> for AppError {
    fn from(err: ReservationError) -> Self {
        AppError(err)
    }
}

/// Maps a ReservationError to an HTTP response
pub fn map_error(err: ReservationError) -> Response {
    AppError(err).into_response()
}

use thiserror::Error;
use uuid::Uuid;

use crate::models::booking::BookingStatus;

/// Errors surfaced by the reservation engine.
///
/// Conflict-shaped variants (`SlotUnavailable`, `AlreadyBooked`,
/// `InvalidTransition`) mean the transaction was rolled back cleanly and no
/// partial state survives. `Store` carries infrastructure failures so the
/// caller can apply its own retry policy; the engine itself never retries.
#[derive(Error, Debug)]
pub enum ReservationError {
    #[error("Slot not found: {0}")]
    SlotNotFound(Uuid),

    #[error("Slot is not available: {0}")]
    SlotUnavailable(Uuid),

    #[error("Slot already has an active booking: {0}")]
    AlreadyBooked(Uuid),

    #[error("Invalid requester: {0}")]
    InvalidRequester(String),

    #[error("Booking not found: {0}")]
    BookingNotFound(Uuid),

    #[error("Not allowed: {0}")]
    Forbidden(String),

    #[error("Cannot transition booking out of {from}")]
    InvalidTransition { from: BookingStatus },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type ReservationResult<T> = Result<T, ReservationError>;

/// Failures originating in the storage layer, kept distinct from the domain
/// taxonomy so transport-level retry policy can key off them.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Conflicting write: {0}")]
    Conflict(String),

    #[error("Storage error: {0}")]
    Database(#[from] eyre::Report),
}

pub type StoreResult<T> = Result<T, StoreError>;

//! Storage seams consumed by the reservation engine.
//!
//! The engine is written against these traits only; `bookline-db` provides a
//! PostgreSQL implementation (row locks via `SELECT ... FOR UPDATE`) and an
//! in-memory implementation (per-slot mutexes) with identical blocking
//! semantics.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::errors::StoreResult;
use crate::models::booking::{Booking, BookingStatus};
use crate::models::slot::Slot;

/// Durable storage for slots.
#[async_trait]
pub trait SlotStore {
    /// Insert a new slot. Fails with `StoreError::Conflict` when another
    /// slot already occupies the same (provider, date, start_time).
    async fn insert_slot(&self, slot: &Slot) -> StoreResult<()>;

    async fn find_slot(&self, id: Uuid) -> StoreResult<Option<Slot>>;

    /// Unbooked slots for a provider whose start instant is strictly after
    /// `now`, ordered by date then start time. Expired slots never appear.
    async fn list_open_slots(&self, provider_id: Uuid, now: DateTime<Utc>)
        -> StoreResult<Vec<Slot>>;

    /// Delete a slot. Fails with `StoreError::Conflict` while a confirmed
    /// booking references it.
    async fn delete_slot(&self, id: Uuid) -> StoreResult<()>;
}

/// Durable storage for bookings.
#[async_trait]
pub trait BookingStore {
    async fn find_booking(&self, id: Uuid) -> StoreResult<Option<Booking>>;

    /// Bookings made by a requester, newest first.
    async fn list_bookings_for_requester(&self, requester_id: Uuid)
        -> StoreResult<Vec<Booking>>;

    /// Bookings against a provider's slots, newest first.
    async fn list_bookings_for_provider(&self, provider_id: Uuid)
        -> StoreResult<Vec<Booking>>;

    async fn set_calendar_event_ref(&self, booking_id: Uuid, event_ref: &str) -> StoreResult<()>;
}

/// A transactional store: slot and booking storage plus the ability to open
/// one atomic unit of work.
#[async_trait]
pub trait ReservationStore: SlotStore + BookingStore + Send + Sync {
    type Tx: ReservationTx + Send;

    async fn begin(&self) -> StoreResult<Self::Tx>;
}

/// One atomic unit of work over slots and bookings.
///
/// Dropping an uncommitted transaction rolls it back and releases any slot
/// lock it holds.
#[async_trait]
pub trait ReservationTx {
    /// Acquire the slot exclusively and return its current row. Blocks until
    /// any other transaction holding this slot commits or rolls back; no
    /// other transaction may read-for-update or mutate the slot until this
    /// one ends. Returns `None` if the slot does not exist.
    async fn lock_slot(&mut self, id: Uuid) -> StoreResult<Option<Slot>>;

    async fn get_booking(&mut self, id: Uuid) -> StoreResult<Option<Booking>>;

    /// The confirmed booking referencing a slot, if any.
    async fn active_booking_for_slot(&mut self, slot_id: Uuid) -> StoreResult<Option<Booking>>;

    async fn insert_booking(&mut self, booking: &Booking) -> StoreResult<()>;

    async fn set_booking_status(&mut self, id: Uuid, status: BookingStatus) -> StoreResult<()>;

    async fn set_slot_booked(&mut self, id: Uuid, booked: bool) -> StoreResult<()>;

    /// Make all writes durable. Lock release happens atomically with commit.
    async fn commit(self) -> StoreResult<()>;

    async fn rollback(self) -> StoreResult<()>;
}

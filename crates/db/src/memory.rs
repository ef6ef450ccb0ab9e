//! In-memory implementation of the core storage traits.
//!
//! Stands in for the relational store where no `SELECT ... FOR UPDATE`
//! primitive exists: a lock table keyed by slot id hands out one
//! `tokio::sync::Mutex` per slot, held for the duration of the transaction's
//! check-and-flip sequence with the same blocking semantics as the row lock.
//! Writes are staged in the transaction value and applied atomically at
//! commit; dropping the transaction discards them and releases the lock.
//!
//! Used by the engine's integration tests and available to embedders that
//! want the reservation protocol without a database.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use bookline_core::errors::{StoreError, StoreResult};
use bookline_core::models::booking::{Booking, BookingStatus};
use bookline_core::models::slot::Slot;
use bookline_core::store::{BookingStore, ReservationStore, ReservationTx, SlotStore};

#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    data: Mutex<Tables>,
    slot_locks: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
    fail_next_commit: AtomicBool,
}

#[derive(Default)]
struct Tables {
    slots: HashMap<Uuid, Slot>,
    bookings: HashMap<Uuid, Booking>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Test hook: make the next `commit` fail after its lock was acquired,
    /// discarding all staged writes.
    pub fn fail_next_commit(&self) {
        self.inner.fail_next_commit.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl SlotStore for MemoryStore {
    async fn insert_slot(&self, slot: &Slot) -> StoreResult<()> {
        let mut data = self.inner.data.lock().await;
        let duplicate = data.slots.values().any(|existing| {
            existing.provider_id == slot.provider_id
                && existing.date == slot.date
                && existing.start_time == slot.start_time
        });
        if duplicate {
            return Err(StoreError::Conflict(format!(
                "provider {} already has a slot at {} {}",
                slot.provider_id, slot.date, slot.start_time
            )));
        }
        data.slots.insert(slot.id, slot.clone());
        Ok(())
    }

    async fn find_slot(&self, id: Uuid) -> StoreResult<Option<Slot>> {
        let data = self.inner.data.lock().await;
        Ok(data.slots.get(&id).cloned())
    }

    async fn list_open_slots(
        &self,
        provider_id: Uuid,
        now: DateTime<Utc>,
    ) -> StoreResult<Vec<Slot>> {
        let data = self.inner.data.lock().await;
        let mut slots: Vec<Slot> = data
            .slots
            .values()
            .filter(|slot| slot.provider_id == provider_id && slot.is_open(now))
            .cloned()
            .collect();
        slots.sort_by_key(|slot| (slot.date, slot.start_time));
        Ok(slots)
    }

    async fn delete_slot(&self, id: Uuid) -> StoreResult<()> {
        let mut data = self.inner.data.lock().await;
        let referenced = data
            .bookings
            .values()
            .any(|booking| booking.slot_id == id && booking.is_active());
        if referenced {
            return Err(StoreError::Conflict(format!(
                "slot {id} has an active booking"
            )));
        }
        data.slots.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl BookingStore for MemoryStore {
    async fn find_booking(&self, id: Uuid) -> StoreResult<Option<Booking>> {
        let data = self.inner.data.lock().await;
        Ok(data.bookings.get(&id).cloned())
    }

    async fn list_bookings_for_requester(&self, requester_id: Uuid) -> StoreResult<Vec<Booking>> {
        let data = self.inner.data.lock().await;
        let mut bookings: Vec<Booking> = data
            .bookings
            .values()
            .filter(|booking| booking.requester_id == requester_id)
            .cloned()
            .collect();
        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(bookings)
    }

    async fn list_bookings_for_provider(&self, provider_id: Uuid) -> StoreResult<Vec<Booking>> {
        let data = self.inner.data.lock().await;
        let mut bookings: Vec<Booking> = data
            .bookings
            .values()
            .filter(|booking| {
                data.slots
                    .get(&booking.slot_id)
                    .is_some_and(|slot| slot.provider_id == provider_id)
            })
            .cloned()
            .collect();
        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(bookings)
    }

    async fn set_calendar_event_ref(&self, booking_id: Uuid, event_ref: &str) -> StoreResult<()> {
        let mut data = self.inner.data.lock().await;
        let booking = data
            .bookings
            .get_mut(&booking_id)
            .ok_or_else(|| StoreError::Database(eyre::eyre!("Booking not found: {booking_id}")))?;
        booking.calendar_event_ref = Some(event_ref.to_string());
        Ok(())
    }
}

#[async_trait]
impl ReservationStore for MemoryStore {
    type Tx = MemoryTx;

    async fn begin(&self) -> StoreResult<MemoryTx> {
        Ok(MemoryTx {
            inner: Arc::clone(&self.inner),
            guards: Vec::new(),
            staged: Vec::new(),
        })
    }
}

enum Write {
    InsertBooking(Booking),
    SetBookingStatus(Uuid, BookingStatus),
    SetSlotBooked(Uuid, bool),
}

/// A unit of work over the in-memory tables. Slot locks acquired through
/// `lock_slot` are held until the transaction value is consumed or dropped.
pub struct MemoryTx {
    inner: Arc<Inner>,
    guards: Vec<OwnedMutexGuard<()>>,
    staged: Vec<Write>,
}

#[async_trait]
impl ReservationTx for MemoryTx {
    async fn lock_slot(&mut self, id: Uuid) -> StoreResult<Option<Slot>> {
        let lock = {
            let mut locks = self.inner.slot_locks.lock().await;
            Arc::clone(locks.entry(id).or_default())
        };
        // Blocks until any transaction holding this slot commits or rolls
        // back. The read below therefore observes committed state.
        let guard = lock.lock_owned().await;
        self.guards.push(guard);

        let data = self.inner.data.lock().await;
        Ok(data.slots.get(&id).cloned())
    }

    async fn get_booking(&mut self, id: Uuid) -> StoreResult<Option<Booking>> {
        let mut booking = {
            let data = self.inner.data.lock().await;
            data.bookings.get(&id).cloned()
        };
        for write in &self.staged {
            match write {
                Write::InsertBooking(b) if b.id == id => booking = Some(b.clone()),
                Write::SetBookingStatus(bid, status) if *bid == id => {
                    if let Some(b) = booking.as_mut() {
                        b.status = *status;
                    }
                }
                _ => {}
            }
        }
        Ok(booking)
    }

    async fn active_booking_for_slot(&mut self, slot_id: Uuid) -> StoreResult<Option<Booking>> {
        let mut active = {
            let data = self.inner.data.lock().await;
            data.bookings
                .values()
                .find(|b| b.slot_id == slot_id && b.is_active())
                .cloned()
        };
        for write in &self.staged {
            match write {
                Write::InsertBooking(b) if b.slot_id == slot_id && b.is_active() => {
                    active = Some(b.clone());
                }
                Write::SetBookingStatus(id, status) => {
                    if active.as_ref().is_some_and(|b| b.id == *id)
                        && *status != BookingStatus::Confirmed
                    {
                        active = None;
                    }
                }
                _ => {}
            }
        }
        Ok(active)
    }

    async fn insert_booking(&mut self, booking: &Booking) -> StoreResult<()> {
        self.staged.push(Write::InsertBooking(booking.clone()));
        Ok(())
    }

    async fn set_booking_status(&mut self, id: Uuid, status: BookingStatus) -> StoreResult<()> {
        self.staged.push(Write::SetBookingStatus(id, status));
        Ok(())
    }

    async fn set_slot_booked(&mut self, id: Uuid, booked: bool) -> StoreResult<()> {
        self.staged.push(Write::SetSlotBooked(id, booked));
        Ok(())
    }

    async fn commit(mut self) -> StoreResult<()> {
        if self.inner.fail_next_commit.swap(false, Ordering::SeqCst) {
            // Staged writes die with the transaction value.
            return Err(StoreError::Database(eyre::eyre!("injected commit failure")));
        }

        let mut data = self.inner.data.lock().await;
        for write in self.staged.drain(..) {
            match write {
                Write::InsertBooking(booking) => {
                    data.bookings.insert(booking.id, booking);
                }
                Write::SetBookingStatus(id, status) => {
                    if let Some(booking) = data.bookings.get_mut(&id) {
                        booking.status = status;
                    }
                }
                Write::SetSlotBooked(id, booked) => {
                    if let Some(slot) = data.slots.get_mut(&id) {
                        slot.booked = booked;
                    }
                }
            }
        }
        Ok(())
        // Slot locks release when `self.guards` drops, after the writes
        // above are visible to the next lock holder.
    }

    async fn rollback(self) -> StoreResult<()> {
        Ok(())
    }
}

//! The reservation engine.
//!
//! All slot and booking mutation flows through this type. `book` and
//! `cancel` run their check-and-flip sequence inside one transaction that
//! holds an exclusive lock on the target slot, which is what makes
//! concurrent booking attempts on the same slot safe: the first caller to
//! acquire the lock wins, and every later caller observes the committed
//! `booked` flag and fails with `SlotUnavailable`.

use chrono::{NaiveDate, NaiveTime};
use uuid::Uuid;

use crate::clock::Clock;
use crate::errors::{ReservationError, ReservationResult};
use crate::models::booking::{Booking, BookingStatus};
use crate::models::principal::{Principal, Role};
use crate::models::slot::{Slot, SlotCategory};
use crate::notify::{BookingEvent, EventKind, NotificationPort};
use crate::store::{BookingStore, ReservationStore, ReservationTx, SlotStore};

pub struct ReservationEngine<S, C, N> {
    store: S,
    clock: C,
    notifier: N,
}

impl<S, C, N> ReservationEngine<S, C, N>
where
    S: ReservationStore,
    C: Clock,
    N: NotificationPort,
{
    pub fn new(store: S, clock: C, notifier: N) -> Self {
        Self {
            store,
            clock,
            notifier,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Publish a new slot for a provider.
    pub async fn create_slot(
        &self,
        provider: &Principal,
        date: NaiveDate,
        start_time: NaiveTime,
        end_time: NaiveTime,
        category: SlotCategory,
    ) -> ReservationResult<Slot> {
        if provider.role != Role::Provider {
            return Err(ReservationError::InvalidRequester(
                "only providers may publish slots".to_string(),
            ));
        }
        if start_time >= end_time {
            return Err(ReservationError::Validation(format!(
                "slot must end after it starts ({start_time}..{end_time})"
            )));
        }

        let slot = Slot {
            id: Uuid::new_v4(),
            provider_id: provider.id,
            date,
            start_time,
            end_time,
            category,
            booked: false,
            created_at: self.clock.now(),
        };
        self.store.insert_slot(&slot).await?;
        tracing::debug!(slot_id = %slot.id, provider_id = %provider.id, "slot created");
        Ok(slot)
    }

    /// Remove a slot. Only the owning provider may delete, and the store
    /// refuses while a confirmed booking still references the slot.
    pub async fn delete_slot(&self, slot_id: Uuid, provider: &Principal) -> ReservationResult<()> {
        let slot = self
            .store
            .find_slot(slot_id)
            .await?
            .ok_or(ReservationError::SlotNotFound(slot_id))?;
        if slot.provider_id != provider.id {
            return Err(ReservationError::Forbidden(
                "only the owning provider may delete a slot".to_string(),
            ));
        }
        self.store.delete_slot(slot_id).await?;
        tracing::debug!(slot_id = %slot_id, "slot deleted");
        Ok(())
    }

    /// Book a slot for a requester.
    ///
    /// The pre-lock reads here are untrusted; availability is decided solely
    /// from the row re-read under the exclusive slot lock.
    pub async fn book(
        &self,
        slot_id: Uuid,
        requester: &Principal,
        notes: Option<String>,
    ) -> ReservationResult<Booking> {
        if requester.role != Role::Requester {
            return Err(ReservationError::InvalidRequester(
                "only requesters may book slots".to_string(),
            ));
        }
        let slot = self
            .store
            .find_slot(slot_id)
            .await?
            .ok_or(ReservationError::SlotNotFound(slot_id))?;
        if slot.provider_id == requester.id {
            return Err(ReservationError::InvalidRequester(
                "a provider cannot book their own slot".to_string(),
            ));
        }

        let mut tx = self.store.begin().await?;
        let slot = match tx.lock_slot(slot_id).await? {
            Some(slot) => slot,
            None => {
                tx.rollback().await?;
                return Err(ReservationError::SlotNotFound(slot_id));
            }
        };

        let now = self.clock.now();
        if slot.booked || slot.is_expired(now) {
            tx.rollback().await?;
            return Err(ReservationError::SlotUnavailable(slot_id));
        }
        // Unreachable if the booked flag is consistent; guards against drift
        // between the flag and the bookings table.
        if tx.active_booking_for_slot(slot_id).await?.is_some() {
            tx.rollback().await?;
            return Err(ReservationError::AlreadyBooked(slot_id));
        }

        let booking = Booking {
            id: Uuid::new_v4(),
            slot_id,
            requester_id: requester.id,
            status: BookingStatus::Confirmed,
            notes,
            calendar_event_ref: None,
            created_at: now,
        };
        tx.insert_booking(&booking).await?;
        tx.set_slot_booked(slot_id, true).await?;
        tx.commit().await?;

        tracing::info!(
            booking_id = %booking.id,
            slot_id = %slot_id,
            requester_id = %requester.id,
            "slot booked"
        );
        self.emit(EventKind::BookingConfirmed, &booking, &slot).await;
        Ok(booking)
    }

    /// Cancel a confirmed booking, releasing its slot.
    ///
    /// Authorized for the booking's requester and the slot's provider only.
    pub async fn cancel(&self, booking_id: Uuid, caller: &Principal) -> ReservationResult<()> {
        let booking = self
            .store
            .find_booking(booking_id)
            .await?
            .ok_or(ReservationError::BookingNotFound(booking_id))?;
        let slot = self
            .store
            .find_slot(booking.slot_id)
            .await?
            .ok_or(ReservationError::SlotNotFound(booking.slot_id))?;
        if caller.id != booking.requester_id && caller.id != slot.provider_id {
            return Err(ReservationError::Forbidden(
                "only the requester or the slot's provider may cancel".to_string(),
            ));
        }
        if booking.status != BookingStatus::Confirmed {
            return Err(ReservationError::InvalidTransition {
                from: booking.status,
            });
        }

        let mut tx = self.store.begin().await?;
        if tx.lock_slot(slot.id).await?.is_none() {
            tx.rollback().await?;
            return Err(ReservationError::SlotNotFound(slot.id));
        }
        // The status may have changed between the pre-check and lock
        // acquisition; of two racing cancels, the loser must fail here.
        let booking = match tx.get_booking(booking_id).await? {
            Some(b) if b.status == BookingStatus::Confirmed => b,
            Some(b) => {
                tx.rollback().await?;
                return Err(ReservationError::InvalidTransition { from: b.status });
            }
            None => {
                tx.rollback().await?;
                return Err(ReservationError::BookingNotFound(booking_id));
            }
        };
        tx.set_booking_status(booking_id, BookingStatus::Cancelled)
            .await?;
        tx.set_slot_booked(slot.id, false).await?;
        tx.commit().await?;

        tracing::info!(booking_id = %booking_id, slot_id = %slot.id, "booking cancelled");
        self.emit(EventKind::BookingCancelled, &booking, &slot).await;
        Ok(())
    }

    /// Record an external-calendar handle on a confirmed booking.
    pub async fn attach_calendar_event(
        &self,
        booking_id: Uuid,
        caller: &Principal,
        event_ref: &str,
    ) -> ReservationResult<()> {
        let booking = self
            .store
            .find_booking(booking_id)
            .await?
            .ok_or(ReservationError::BookingNotFound(booking_id))?;
        let slot = self
            .store
            .find_slot(booking.slot_id)
            .await?
            .ok_or(ReservationError::SlotNotFound(booking.slot_id))?;
        if caller.id != booking.requester_id && caller.id != slot.provider_id {
            return Err(ReservationError::Forbidden(
                "only a party to the booking may attach a calendar event".to_string(),
            ));
        }
        if booking.status != BookingStatus::Confirmed {
            return Err(ReservationError::InvalidTransition {
                from: booking.status,
            });
        }
        self.store
            .set_calendar_event_ref(booking_id, event_ref)
            .await?;
        Ok(())
    }

    /// Slots a requester could book right now: unbooked and not yet started.
    pub async fn open_slots(&self, provider_id: Uuid) -> ReservationResult<Vec<Slot>> {
        let slots = self
            .store
            .list_open_slots(provider_id, self.clock.now())
            .await?;
        Ok(slots)
    }

    pub async fn bookings_for_requester(
        &self,
        requester_id: Uuid,
    ) -> ReservationResult<Vec<Booking>> {
        Ok(self.store.list_bookings_for_requester(requester_id).await?)
    }

    pub async fn bookings_for_provider(
        &self,
        provider_id: Uuid,
    ) -> ReservationResult<Vec<Booking>> {
        Ok(self.store.list_bookings_for_provider(provider_id).await?)
    }

    /// Post-commit, best-effort. A failing notifier is logged and ignored;
    /// it never rolls back or fails the reservation.
    async fn emit(&self, kind: EventKind, booking: &Booking, slot: &Slot) {
        let event = BookingEvent {
            kind,
            booking_id: booking.id,
            slot_id: slot.id,
            provider_id: slot.provider_id,
            requester_id: booking.requester_id,
            occurred_at: self.clock.now(),
        };
        if let Err(err) = self.notifier.publish(event).await {
            tracing::warn!(kind = %kind, booking_id = %booking.id, "notification publish failed: {err:#}");
        }
    }
}

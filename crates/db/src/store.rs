//! PostgreSQL implementation of the core storage traits.
//!
//! Exclusive slot acquisition is `SELECT ... FOR UPDATE` inside a sqlx
//! transaction: two concurrent booking attempts on the same slot serialize
//! at the row lock, and the loser re-reads `booked = true` after the winner
//! commits. Locks are per-row, so contention on one slot never blocks
//! bookings against other slots.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use bookline_core::errors::{StoreError, StoreResult};
use bookline_core::models::booking::{Booking, BookingStatus};
use bookline_core::models::slot::Slot;
use bookline_core::store::{BookingStore, ReservationStore, ReservationTx, SlotStore};

use crate::models::{DbBooking, DbSlot};
use crate::repositories;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn map_sqlx_err(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() || db_err.is_foreign_key_violation() {
            return StoreError::Conflict(db_err.to_string());
        }
    }
    StoreError::Database(err.into())
}

#[async_trait]
impl SlotStore for PgStore {
    async fn insert_slot(&self, slot: &Slot) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO slots (id, provider_id, date, start_time, end_time, category, booked, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(slot.id)
        .bind(slot.provider_id)
        .bind(slot.date)
        .bind(slot.start_time)
        .bind(slot.end_time)
        .bind(slot.category.to_string())
        .bind(slot.booked)
        .bind(slot.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(())
    }

    async fn find_slot(&self, id: Uuid) -> StoreResult<Option<Slot>> {
        let row = repositories::slot::get_slot_by_id(&self.pool, id)
            .await
            .map_err(StoreError::Database)?;
        row.map(Slot::try_from)
            .transpose()
            .map_err(StoreError::Database)
    }

    async fn list_open_slots(
        &self,
        provider_id: Uuid,
        now: DateTime<Utc>,
    ) -> StoreResult<Vec<Slot>> {
        let rows = repositories::slot::list_open_slots(&self.pool, provider_id, now)
            .await
            .map_err(StoreError::Database)?;
        rows.into_iter()
            .map(Slot::try_from)
            .collect::<Result<Vec<_>, _>>()
            .map_err(StoreError::Database)
    }

    async fn delete_slot(&self, id: Uuid) -> StoreResult<()> {
        let active = repositories::slot::has_active_booking(&self.pool, id)
            .await
            .map_err(StoreError::Database)?;
        if active {
            return Err(StoreError::Conflict(format!(
                "slot {id} has an active booking"
            )));
        }

        sqlx::query("DELETE FROM slots WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_err)?;

        Ok(())
    }
}

#[async_trait]
impl BookingStore for PgStore {
    async fn find_booking(&self, id: Uuid) -> StoreResult<Option<Booking>> {
        let row = repositories::booking::get_booking_by_id(&self.pool, id)
            .await
            .map_err(StoreError::Database)?;
        row.map(Booking::try_from)
            .transpose()
            .map_err(StoreError::Database)
    }

    async fn list_bookings_for_requester(&self, requester_id: Uuid) -> StoreResult<Vec<Booking>> {
        let rows = repositories::booking::list_bookings_by_requester(&self.pool, requester_id)
            .await
            .map_err(StoreError::Database)?;
        rows.into_iter()
            .map(Booking::try_from)
            .collect::<Result<Vec<_>, _>>()
            .map_err(StoreError::Database)
    }

    async fn list_bookings_for_provider(&self, provider_id: Uuid) -> StoreResult<Vec<Booking>> {
        let rows = repositories::booking::list_bookings_by_provider(&self.pool, provider_id)
            .await
            .map_err(StoreError::Database)?;
        rows.into_iter()
            .map(Booking::try_from)
            .collect::<Result<Vec<_>, _>>()
            .map_err(StoreError::Database)
    }

    async fn set_calendar_event_ref(&self, booking_id: Uuid, event_ref: &str) -> StoreResult<()> {
        repositories::booking::set_calendar_event_ref(&self.pool, booking_id, event_ref)
            .await
            .map_err(StoreError::Database)
    }
}

#[async_trait]
impl ReservationStore for PgStore {
    type Tx = PgTx;

    async fn begin(&self) -> StoreResult<PgTx> {
        let tx = self.pool.begin().await.map_err(map_sqlx_err)?;
        Ok(PgTx { tx })
    }
}

/// One reservation transaction. Dropping it without `commit` rolls back.
pub struct PgTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl ReservationTx for PgTx {
    async fn lock_slot(&mut self, id: Uuid) -> StoreResult<Option<Slot>> {
        let row = sqlx::query_as::<_, DbSlot>(
            r#"
            SELECT id, provider_id, date, start_time, end_time, category, booked, created_at
            FROM slots
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(map_sqlx_err)?;

        row.map(Slot::try_from)
            .transpose()
            .map_err(StoreError::Database)
    }

    async fn get_booking(&mut self, id: Uuid) -> StoreResult<Option<Booking>> {
        let row = sqlx::query_as::<_, DbBooking>(
            r#"
            SELECT id, slot_id, requester_id, status, notes, calendar_event_ref, created_at
            FROM bookings
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(map_sqlx_err)?;

        row.map(Booking::try_from)
            .transpose()
            .map_err(StoreError::Database)
    }

    async fn active_booking_for_slot(&mut self, slot_id: Uuid) -> StoreResult<Option<Booking>> {
        let row = sqlx::query_as::<_, DbBooking>(
            r#"
            SELECT id, slot_id, requester_id, status, notes, calendar_event_ref, created_at
            FROM bookings
            WHERE slot_id = $1 AND status = 'confirmed'
            "#,
        )
        .bind(slot_id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(map_sqlx_err)?;

        row.map(Booking::try_from)
            .transpose()
            .map_err(StoreError::Database)
    }

    async fn insert_booking(&mut self, booking: &Booking) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO bookings (id, slot_id, requester_id, status, notes, calendar_event_ref, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(booking.id)
        .bind(booking.slot_id)
        .bind(booking.requester_id)
        .bind(booking.status.to_string())
        .bind(booking.notes.as_deref())
        .bind(booking.calendar_event_ref.as_deref())
        .bind(booking.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(map_sqlx_err)?;

        Ok(())
    }

    async fn set_booking_status(&mut self, id: Uuid, status: BookingStatus) -> StoreResult<()> {
        sqlx::query("UPDATE bookings SET status = $2 WHERE id = $1")
            .bind(id)
            .bind(status.to_string())
            .execute(&mut *self.tx)
            .await
            .map_err(map_sqlx_err)?;

        Ok(())
    }

    async fn set_slot_booked(&mut self, id: Uuid, booked: bool) -> StoreResult<()> {
        sqlx::query("UPDATE slots SET booked = $2 WHERE id = $1")
            .bind(id)
            .bind(booked)
            .execute(&mut *self.tx)
            .await
            .map_err(map_sqlx_err)?;

        Ok(())
    }

    async fn commit(self) -> StoreResult<()> {
        self.tx.commit().await.map_err(map_sqlx_err)
    }

    async fn rollback(self) -> StoreResult<()> {
        self.tx.rollback().await.map_err(map_sqlx_err)
    }
}

use crate::models::DbBooking;
use eyre::{eyre, Result};
use sqlx::{Pool, Postgres};
use uuid::Uuid;

pub async fn get_booking_by_id(pool: &Pool<Postgres>, id: Uuid) -> Result<Option<DbBooking>> {
    let booking = sqlx::query_as::<_, DbBooking>(
        r#"
        SELECT id, slot_id, requester_id, status, notes, calendar_event_ref, created_at
        FROM bookings
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(booking)
}

pub async fn list_bookings_by_requester(
    pool: &Pool<Postgres>,
    requester_id: Uuid,
) -> Result<Vec<DbBooking>> {
    let bookings = sqlx::query_as::<_, DbBooking>(
        r#"
        SELECT id, slot_id, requester_id, status, notes, calendar_event_ref, created_at
        FROM bookings
        WHERE requester_id = $1
        ORDER BY created_at DESC
        "#,
    )
    .bind(requester_id)
    .fetch_all(pool)
    .await?;

    Ok(bookings)
}

pub async fn list_bookings_by_provider(
    pool: &Pool<Postgres>,
    provider_id: Uuid,
) -> Result<Vec<DbBooking>> {
    let bookings = sqlx::query_as::<_, DbBooking>(
        r#"
        SELECT b.id, b.slot_id, b.requester_id, b.status, b.notes, b.calendar_event_ref, b.created_at
        FROM bookings b
        JOIN slots s ON s.id = b.slot_id
        WHERE s.provider_id = $1
        ORDER BY b.created_at DESC
        "#,
    )
    .bind(provider_id)
    .fetch_all(pool)
    .await?;

    Ok(bookings)
}

pub async fn set_calendar_event_ref(
    pool: &Pool<Postgres>,
    booking_id: Uuid,
    event_ref: &str,
) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE bookings
        SET calendar_event_ref = $2
        WHERE id = $1
        "#,
    )
    .bind(booking_id)
    .bind(event_ref)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(eyre!("Booking not found: {booking_id}"));
    }

    Ok(())
}

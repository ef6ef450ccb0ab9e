use crate::models::DbSlot;
use chrono::{DateTime, Utc};
use eyre::Result;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

pub async fn get_slot_by_id(pool: &Pool<Postgres>, id: Uuid) -> Result<Option<DbSlot>> {
    let slot = sqlx::query_as::<_, DbSlot>(
        r#"
        SELECT id, provider_id, date, start_time, end_time, category, booked, created_at
        FROM slots
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(slot)
}

/// Unbooked slots whose start instant lies strictly after `now`. Slots that
/// have expired while still open are filtered out here, not flagged in
/// storage.
pub async fn list_open_slots(
    pool: &Pool<Postgres>,
    provider_id: Uuid,
    now: DateTime<Utc>,
) -> Result<Vec<DbSlot>> {
    tracing::debug!("Listing open slots: provider_id={}", provider_id);

    let slots = sqlx::query_as::<_, DbSlot>(
        r#"
        SELECT id, provider_id, date, start_time, end_time, category, booked, created_at
        FROM slots
        WHERE provider_id = $1
          AND booked = FALSE
          AND (date + start_time) AT TIME ZONE 'UTC' > $2
        ORDER BY date ASC, start_time ASC
        "#,
    )
    .bind(provider_id)
    .bind(now)
    .fetch_all(pool)
    .await?;

    Ok(slots)
}

/// Whether a confirmed booking currently references the slot.
pub async fn has_active_booking(pool: &Pool<Postgres>, slot_id: Uuid) -> Result<bool> {
    let exists = sqlx::query_scalar::<_, bool>(
        r#"
        SELECT EXISTS (
            SELECT 1
            FROM bookings
            WHERE slot_id = $1 AND status = 'confirmed'
        );
        "#,
    )
    .bind(slot_id)
    .fetch_one(pool)
    .await?;

    Ok(exists)
}

use eyre::Result;
use sqlx::{Pool, Postgres};
use tracing::info;

pub async fn initialize_database(pool: &Pool<Postgres>) -> Result<()> {
    info!("Initializing database schema...");

    // Create slots table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS slots (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            provider_id UUID NOT NULL,
            date DATE NOT NULL,
            start_time TIME NOT NULL,
            end_time TIME NOT NULL,
            category VARCHAR(32) NOT NULL,
            booked BOOLEAN NOT NULL DEFAULT FALSE,
            created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
            CONSTRAINT valid_time_range CHECK (end_time > start_time),
            CONSTRAINT unique_provider_slot_start UNIQUE (provider_id, date, start_time)
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Create bookings table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS bookings (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            slot_id UUID NOT NULL REFERENCES slots(id),
            requester_id UUID NOT NULL,
            status VARCHAR(16) NOT NULL,
            notes TEXT NULL,
            calendar_event_ref VARCHAR(255) NULL,
            created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
        );
        "#,
    )
    .execute(pool)
    .await?;

    // At most one confirmed booking may reference a slot; backstop for the
    // engine's booked-flag protocol.
    sqlx::query(
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS idx_bookings_active_slot
            ON bookings(slot_id) WHERE status = 'confirmed';
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes
    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_slots_provider_id ON slots(provider_id);
        CREATE INDEX IF NOT EXISTS idx_slots_date ON slots(date);
        CREATE INDEX IF NOT EXISTS idx_slots_booked ON slots(booked);
        CREATE INDEX IF NOT EXISTS idx_bookings_slot_id ON bookings(slot_id);
        CREATE INDEX IF NOT EXISTS idx_bookings_requester_id ON bookings(requester_id);
        CREATE INDEX IF NOT EXISTS idx_bookings_status ON bookings(status);
        "#,
    )
    .execute(pool)
    .await?;

    info!("Database schema initialized successfully.");
    Ok(())
}

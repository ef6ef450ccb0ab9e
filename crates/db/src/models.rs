use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use bookline_core::models::booking::Booking;
use bookline_core::models::slot::Slot;

/// Row shape of the `slots` table. Category is stored as text and parsed on
/// the way out.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbSlot {
    pub id: Uuid,
    pub provider_id: Uuid,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub category: String,
    pub booked: bool,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<DbSlot> for Slot {
    type Error = eyre::Report;

    fn try_from(row: DbSlot) -> Result<Self, Self::Error> {
        Ok(Slot {
            id: row.id,
            provider_id: row.provider_id,
            date: row.date,
            start_time: row.start_time,
            end_time: row.end_time,
            category: row.category.parse()?,
            booked: row.booked,
            created_at: row.created_at,
        })
    }
}

/// Row shape of the `bookings` table.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbBooking {
    pub id: Uuid,
    pub slot_id: Uuid,
    pub requester_id: Uuid,
    pub status: String,
    pub notes: Option<String>,
    pub calendar_event_ref: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<DbBooking> for Booking {
    type Error = eyre::Report;

    fn try_from(row: DbBooking) -> Result<Self, Self::Error> {
        Ok(Booking {
            id: row.id,
            slot_id: row.slot_id,
            requester_id: row.requester_id,
            status: row.status.parse()?,
            notes: row.notes,
            calendar_event_ref: row.calendar_event_ref,
            created_at: row.created_at,
        })
    }
}

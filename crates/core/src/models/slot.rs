use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One bookable time window belonging to a single provider.
///
/// The `booked` flag is the source of truth for availability; whether the
/// slot has expired is always derived from the current time, never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Slot {
    pub id: Uuid,
    pub provider_id: Uuid,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub category: SlotCategory,
    pub booked: bool,
    pub created_at: DateTime<Utc>,
}

impl Slot {
    /// The UTC instant at which the slot begins.
    pub fn starts_at(&self) -> DateTime<Utc> {
        self.date.and_time(self.start_time).and_utc()
    }

    /// A slot whose start instant has passed cannot be booked, even if its
    /// `booked` flag is still false.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.starts_at() <= now
    }

    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        !self.booked && !self.is_expired(now)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotCategory {
    Consultation,
    FollowUp,
    Emergency,
}

impl fmt::Display for SlotCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotCategory::Consultation => write!(f, "consultation"),
            SlotCategory::FollowUp => write!(f, "follow_up"),
            SlotCategory::Emergency => write!(f, "emergency"),
        }
    }
}

impl FromStr for SlotCategory {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "consultation" => Ok(SlotCategory::Consultation),
            "follow_up" => Ok(SlotCategory::FollowUp),
            "emergency" => Ok(SlotCategory::Emergency),
            other => Err(eyre::eyre!("unknown slot category: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSlotRequest {
    pub provider_id: Uuid,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub category: SlotCategory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotResponse {
    pub id: Uuid,
    pub provider_id: Uuid,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub category: SlotCategory,
    pub booked: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Slot> for SlotResponse {
    fn from(slot: Slot) -> Self {
        Self {
            id: slot.id,
            provider_id: slot.provider_id,
            date: slot.date,
            start_time: slot.start_time,
            end_time: slot.end_time,
            category: slot.category,
            booked: slot.booked,
            created_at: slot.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenSlotsResponse {
    pub provider_id: Uuid,
    pub slots: Vec<SlotResponse>,
}

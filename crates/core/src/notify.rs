//! Outbound booking events.
//!
//! Events are published after the reservation transaction commits, on a
//! best-effort basis: a failing or slow notification collaborator must never
//! surface as an error to the caller of `book`/`cancel`, and never triggers
//! a compensating rollback.

use std::fmt;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use eyre::Result;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    BookingConfirmed,
    BookingCancelled,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::BookingConfirmed => write!(f, "booking_confirmed"),
            EventKind::BookingCancelled => write!(f, "booking_cancelled"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingEvent {
    pub kind: EventKind,
    pub booking_id: Uuid,
    pub slot_id: Uuid,
    pub provider_id: Uuid,
    pub requester_id: Uuid,
    pub occurred_at: DateTime<Utc>,
}

#[async_trait]
pub trait NotificationPort: Send + Sync {
    async fn publish(&self, event: BookingEvent) -> Result<()>;
}

/// Default port: emits the event to the log stream and nothing else.
/// Downstream delivery (email, webhooks) belongs to a separate collaborator.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl NotificationPort for LogNotifier {
    async fn publish(&self, event: BookingEvent) -> Result<()> {
        tracing::info!(
            kind = %event.kind,
            booking_id = %event.booking_id,
            slot_id = %event.slot_id,
            "booking event"
        );
        Ok(())
    }
}

/// Captures published events in memory. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    events: Arc<Mutex<Vec<BookingEvent>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<BookingEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationPort for RecordingNotifier {
    async fn publish(&self, event: BookingEvent) -> Result<()> {
        self.events.lock().unwrap().push(event);
        Ok(())
    }
}

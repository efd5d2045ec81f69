//! Internal event bus for domain notifications
//!
//! Services publish what happened (a booking was confirmed, a milestone is
//! due, escrow was released) and never wait on who listens. Subscribers are
//! the notification SSE stream and the event logger.
//!
//! ```text
//! BookingService ──┐
//! PaymentService ──┼──▶ EventBus::publish() ──▶ broadcast ──▶ SSE subscribers
//! Scheduler ───────┘                                       ──▶ event logger
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Generic mutations of catalog and platform entities
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum EntityEvent {
    Created {
        entity_type: String,
        entity_id: Uuid,
        /// The user the record is addressed to, when there is one
        recipient_id: Option<Uuid>,
    },
    Updated {
        entity_type: String,
        entity_id: Uuid,
        recipient_id: Option<Uuid>,
    },
    Deleted {
        entity_type: String,
        entity_id: Uuid,
    },
}

/// Booking lifecycle events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum BookingEvent {
    Created {
        booking_id: Uuid,
        booking_number: String,
        user_id: Uuid,
        hotel_id: Uuid,
        total: f64,
    },
    Updated {
        booking_id: Uuid,
        user_id: Uuid,
        hotel_id: Uuid,
        price_difference: f64,
    },
    Confirmed {
        booking_id: Uuid,
        user_id: Uuid,
        hotel_id: Uuid,
    },
    Cancelled {
        booking_id: Uuid,
        user_id: Uuid,
        hotel_id: Uuid,
        refund_amount: f64,
    },
    Rejected {
        booking_id: Uuid,
        user_id: Uuid,
        hotel_id: Uuid,
        reason: String,
    },
    Completed {
        booking_id: Uuid,
        user_id: Uuid,
        hotel_id: Uuid,
    },
}

/// Payment and escrow events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PaymentEvent {
    Captured {
        transaction_id: String,
        booking_id: Uuid,
        user_id: Uuid,
        hotel_id: Uuid,
        amount: f64,
        payment_type: String,
    },
    Failed {
        transaction_id: String,
        booking_id: Uuid,
        user_id: Uuid,
        hotel_id: Uuid,
        reason: String,
    },
    Refunded {
        booking_id: Uuid,
        user_id: Uuid,
        hotel_id: Uuid,
        amount: f64,
    },
    EscrowReleased {
        booking_id: Uuid,
        user_id: Uuid,
        hotel_id: Uuid,
        amount: f64,
    },
}

/// Reminders emitted by the scheduler
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ReminderEvent {
    MilestoneDue {
        booking_id: Uuid,
        user_id: Uuid,
        hotel_id: Uuid,
        milestone: u8,
        due_date: NaiveDate,
        amount: f64,
    },
    CheckIn {
        booking_id: Uuid,
        user_id: Uuid,
        hotel_id: Uuid,
        check_in: NaiveDate,
    },
}

/// Top-level event published on the bus
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlatformEvent {
    Entity(EntityEvent),
    Booking(BookingEvent),
    Payment(PaymentEvent),
    Reminder(ReminderEvent),
}

impl PlatformEvent {
    pub fn event_kind(&self) -> &str {
        match self {
            PlatformEvent::Entity(_) => "entity",
            PlatformEvent::Booking(_) => "booking",
            PlatformEvent::Payment(_) => "payment",
            PlatformEvent::Reminder(_) => "reminder",
        }
    }

    /// Get the action name (created, confirmed, escrow_released, ...)
    pub fn action(&self) -> &str {
        match self {
            PlatformEvent::Entity(e) => match e {
                EntityEvent::Created { .. } => "created",
                EntityEvent::Updated { .. } => "updated",
                EntityEvent::Deleted { .. } => "deleted",
            },
            PlatformEvent::Booking(e) => match e {
                BookingEvent::Created { .. } => "created",
                BookingEvent::Updated { .. } => "updated",
                BookingEvent::Confirmed { .. } => "confirmed",
                BookingEvent::Cancelled { .. } => "cancelled",
                BookingEvent::Rejected { .. } => "rejected",
                BookingEvent::Completed { .. } => "completed",
            },
            PlatformEvent::Payment(e) => match e {
                PaymentEvent::Captured { .. } => "captured",
                PaymentEvent::Failed { .. } => "failed",
                PaymentEvent::Refunded { .. } => "refunded",
                PaymentEvent::EscrowReleased { .. } => "escrow_released",
            },
            PlatformEvent::Reminder(e) => match e {
                ReminderEvent::MilestoneDue { .. } => "milestone_due",
                ReminderEvent::CheckIn { .. } => "check_in",
            },
        }
    }

    /// The user this event is addressed to
    pub fn user_id(&self) -> Option<Uuid> {
        match self {
            PlatformEvent::Entity(
                EntityEvent::Created { recipient_id, .. }
                | EntityEvent::Updated { recipient_id, .. },
            ) => *recipient_id,
            PlatformEvent::Entity(EntityEvent::Deleted { .. }) => None,
            PlatformEvent::Booking(
                BookingEvent::Created { user_id, .. }
                | BookingEvent::Updated { user_id, .. }
                | BookingEvent::Confirmed { user_id, .. }
                | BookingEvent::Cancelled { user_id, .. }
                | BookingEvent::Rejected { user_id, .. }
                | BookingEvent::Completed { user_id, .. },
            ) => Some(*user_id),
            PlatformEvent::Payment(
                PaymentEvent::Captured { user_id, .. }
                | PaymentEvent::Failed { user_id, .. }
                | PaymentEvent::Refunded { user_id, .. }
                | PaymentEvent::EscrowReleased { user_id, .. },
            ) => Some(*user_id),
            PlatformEvent::Reminder(
                ReminderEvent::MilestoneDue { user_id, .. } | ReminderEvent::CheckIn { user_id, .. },
            ) => Some(*user_id),
        }
    }

    /// The hotel (tenant) this event belongs to
    pub fn hotel_id(&self) -> Option<Uuid> {
        match self {
            PlatformEvent::Entity(_) => None,
            PlatformEvent::Booking(
                BookingEvent::Created { hotel_id, .. }
                | BookingEvent::Updated { hotel_id, .. }
                | BookingEvent::Confirmed { hotel_id, .. }
                | BookingEvent::Cancelled { hotel_id, .. }
                | BookingEvent::Rejected { hotel_id, .. }
                | BookingEvent::Completed { hotel_id, .. },
            ) => Some(*hotel_id),
            PlatformEvent::Payment(
                PaymentEvent::Captured { hotel_id, .. }
                | PaymentEvent::Failed { hotel_id, .. }
                | PaymentEvent::Refunded { hotel_id, .. }
                | PaymentEvent::EscrowReleased { hotel_id, .. },
            ) => Some(*hotel_id),
            PlatformEvent::Reminder(
                ReminderEvent::MilestoneDue { hotel_id, .. }
                | ReminderEvent::CheckIn { hotel_id, .. },
            ) => Some(*hotel_id),
        }
    }
}

/// Envelope wrapping an event with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub event: PlatformEvent,
}

impl EventEnvelope {
    pub fn new(event: PlatformEvent) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            event,
        }
    }
}

/// Broadcast-based event bus
///
/// Cheap to clone. Slow receivers get `Lagged` instead of blocking publishers.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<EventEnvelope>,
}

impl EventBus {
    /// Create a new EventBus buffering up to `capacity` events per receiver
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish an event to all subscribers
    ///
    /// Never fails. Returns the number of receivers that will get the event.
    pub fn publish(&self, event: impl Into<PlatformEvent>) -> usize {
        let envelope = EventEnvelope::new(event.into());
        self.sender.send(envelope).unwrap_or(0)
    }

    /// Events published before this call are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.sender.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl From<EntityEvent> for PlatformEvent {
    fn from(event: EntityEvent) -> Self {
        PlatformEvent::Entity(event)
    }
}

impl From<BookingEvent> for PlatformEvent {
    fn from(event: BookingEvent) -> Self {
        PlatformEvent::Booking(event)
    }
}

impl From<PaymentEvent> for PlatformEvent {
    fn from(event: PaymentEvent) -> Self {
        PlatformEvent::Payment(event)
    }
}

impl From<ReminderEvent> for PlatformEvent {
    fn from(event: ReminderEvent) -> Self {
        PlatformEvent::Reminder(event)
    }
}

/// Log every event on the bus until the bus is dropped
pub async fn log_events(bus: EventBus) {
    let mut rx = bus.subscribe();
    loop {
        match rx.recv().await {
            Ok(envelope) => tracing::info!(
                event_id = %envelope.id,
                kind = envelope.event.event_kind(),
                action = envelope.event.action(),
                user = ?envelope.event.user_id(),
                hotel = ?envelope.event.hotel_id(),
                "domain event"
            ),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "event logger lagged behind");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn confirmed(user_id: Uuid, hotel_id: Uuid) -> BookingEvent {
        BookingEvent::Confirmed {
            booking_id: Uuid::new_v4(),
            user_id,
            hotel_id,
        }
    }

    #[test]
    fn test_booking_event_serialization() {
        let event = PlatformEvent::from(confirmed(Uuid::new_v4(), Uuid::new_v4()));
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "booking");
        assert_eq!(json["action"], "confirmed");
    }

    #[test]
    fn test_event_addressing() {
        let user = Uuid::new_v4();
        let hotel = Uuid::new_v4();
        let event = PlatformEvent::from(confirmed(user, hotel));
        assert_eq!(event.user_id(), Some(user));
        assert_eq!(event.hotel_id(), Some(hotel));

        let deleted = PlatformEvent::from(EntityEvent::Deleted {
            entity_type: "tour".to_string(),
            entity_id: Uuid::new_v4(),
        });
        assert_eq!(deleted.user_id(), None);
        assert_eq!(deleted.action(), "deleted");
    }

    #[tokio::test]
    async fn test_event_bus_publish_subscribe() {
        let bus = EventBus::new(16);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        let receivers = bus.publish(ReminderEvent::CheckIn {
            booking_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            hotel_id: Uuid::new_v4(),
            check_in: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
        });
        assert_eq!(receivers, 2);

        let e1 = rx1.recv().await.unwrap();
        let e2 = rx2.recv().await.unwrap();
        assert_eq!(e1.id, e2.id);
        assert_eq!(e1.event.action(), "check_in");
    }

    #[test]
    fn test_event_bus_publish_without_subscribers() {
        let bus = EventBus::default();
        assert_eq!(bus.publish(confirmed(Uuid::new_v4(), Uuid::new_v4())), 0);
    }
}

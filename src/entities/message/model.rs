//! Messages exchanged between a guest and the hotel about a booking

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SenderType {
    Tourist,
    HotelAdmin,
}

pub const UNREAD: &str = "unread";
pub const READ: &str = "read";

// `status` is `unread` or `read`; `name` holds the booking number
crate::impl_data_entity!(Message, "message", "messages", tenant: hotel_id, ["booking_id", "recipient_id"], {
    booking_id: Uuid,
    hotel_id: Uuid,
    sender_id: Uuid,
    sender_type: SenderType,
    recipient_id: Uuid,
    message: String,
    #[serde(default)]
    attachments: Vec<String>,
    is_read: bool,
    read_at: Option<DateTime<Utc>>,
});

impl Message {
    pub fn mark_read(&mut self, at: DateTime<Utc>) {
        if !self.is_read {
            self.is_read = true;
            self.read_at = Some(at);
            self.set_status(READ);
        }
    }
}

//! Room types offered by a hotel

use crate::core::entity::{Data, Entity};
use crate::core::field::FieldValue;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A room type; `total_rooms` identical units share one inventory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub entity_type: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,

    pub hotel_id: Uuid,
    pub room_type: String,
    pub description: String,
    /// Guests per unit
    pub capacity: u32,
    pub bed_type: String,
    pub size_sqm: Option<f64>,
    pub price_per_night: f64,
    pub discount_percentage: f64,
    #[serde(default)]
    pub amenities: Vec<String>,
    #[serde(default)]
    pub images: Vec<String>,
    pub total_rooms: u32,
    pub is_active: bool,
}

impl Room {
    pub fn is_bookable(&self) -> bool {
        self.is_active && self.deleted_at.is_none()
    }

    /// Nightly rate after the room discount
    pub fn discounted_rate(&self) -> f64 {
        crate::booking::pricing::round_cents(
            self.price_per_night * (1.0 - self.discount_percentage / 100.0),
        )
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

impl Entity for Room {
    fn resource_name() -> &'static str {
        "rooms"
    }

    fn resource_name_singular() -> &'static str {
        "room"
    }

    fn id(&self) -> Uuid {
        self.id
    }

    fn entity_type(&self) -> &str {
        &self.entity_type
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }

    fn status(&self) -> &str {
        if self.is_active { "active" } else { "inactive" }
    }

    fn tenant_id(&self) -> Option<Uuid> {
        Some(self.hotel_id)
    }
}

impl Data for Room {
    fn name(&self) -> &str {
        &self.room_type
    }

    fn indexed_fields() -> &'static [&'static str] {
        &["hotel_id"]
    }

    fn field_value(&self, field: &str) -> Option<FieldValue> {
        match field {
            "hotel_id" => Some(FieldValue::Uuid(self.hotel_id)),
            "room_type" => Some(FieldValue::String(self.room_type.clone())),
            "capacity" => Some(FieldValue::Integer(self.capacity as i64)),
            "price_per_night" => Some(FieldValue::Float(self.price_per_night)),
            "total_rooms" => Some(FieldValue::Integer(self.total_rooms as i64)),
            "is_active" => Some(FieldValue::Boolean(self.is_active)),
            _ => None,
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn room(hotel_id: Uuid, price_per_night: f64, total_rooms: u32) -> Room {
        let now = Utc::now();
        Room {
            id: Uuid::new_v4(),
            entity_type: "room".to_string(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
            hotel_id,
            room_type: "Deluxe Double".to_string(),
            description: "River view".to_string(),
            capacity: 2,
            bed_type: "queen".to_string(),
            size_sqm: Some(28.0),
            price_per_night,
            discount_percentage: 0.0,
            amenities: vec!["air_conditioning".to_string()],
            images: Vec::new(),
            total_rooms,
            is_active: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discounted_rate() {
        let mut room = fixtures::room(Uuid::new_v4(), 80.0, 3);
        assert_eq!(room.discounted_rate(), 80.0);
        room.discount_percentage = 15.0;
        assert_eq!(room.discounted_rate(), 68.0);
        assert_eq!(room.tenant_id(), Some(room.hotel_id));
    }
}

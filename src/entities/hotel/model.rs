//! Hotels, the tenants of the platform

use crate::core::entity::{Data, Entity};
use crate::core::field::FieldValue;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum HotelStatus {
    #[default]
    PendingApproval,
    Active,
    Inactive,
    Rejected,
}

impl HotelStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HotelStatus::PendingApproval => "pending_approval",
            HotelStatus::Active => "active",
            HotelStatus::Inactive => "inactive",
            HotelStatus::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default, Validate)]
pub struct Location {
    #[validate(length(min = 1, max = 500))]
    pub address: String,
    #[validate(length(min = 1, max = 100))]
    pub city: String,
    #[validate(length(min = 1, max = 100))]
    pub province: String,
    #[serde(default = "default_country")]
    pub country: String,
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
}

fn default_country() -> String {
    "Cambodia".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default, Validate)]
pub struct Contact {
    #[validate(regex(path = *crate::core::validation::PHONE_RE))]
    pub phone: String,
    #[validate(email)]
    pub email: String,
    #[serde(default)]
    pub website: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hotel {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub entity_type: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,

    /// The hotel admin managing this hotel
    pub admin_id: Uuid,
    pub name: String,
    pub description: String,
    pub location: Location,
    pub contact: Contact,
    #[serde(default)]
    pub amenities: Vec<String>,
    #[serde(default)]
    pub images: Vec<String>,
    pub star_rating: u8,
    pub average_rating: f64,
    pub total_reviews: u32,
    pub status: HotelStatus,
    pub approval_date: Option<DateTime<Utc>>,
}

impl Hotel {
    pub fn is_bookable(&self) -> bool {
        self.status == HotelStatus::Active && self.deleted_at.is_none()
    }

    pub fn has_amenities(&self, wanted: &[String]) -> bool {
        wanted
            .iter()
            .all(|w| self.amenities.iter().any(|a| a.eq_ignore_ascii_case(w)))
    }

    /// Case-insensitive match against city or province
    pub fn is_in(&self, destination: &str) -> bool {
        let destination = destination.to_lowercase();
        self.location.city.to_lowercase().contains(&destination)
            || self.location.province.to_lowercase().contains(&destination)
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

impl Entity for Hotel {
    fn resource_name() -> &'static str {
        "hotels"
    }

    fn resource_name_singular() -> &'static str {
        "hotel"
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
        self.status.as_str()
    }

    fn tenant_id(&self) -> Option<Uuid> {
        Some(self.id)
    }
}

impl Data for Hotel {
    fn name(&self) -> &str {
        &self.name
    }

    fn indexed_fields() -> &'static [&'static str] {
        &["admin_id", "name"]
    }

    fn field_value(&self, field: &str) -> Option<FieldValue> {
        match field {
            "admin_id" => Some(FieldValue::Uuid(self.admin_id)),
            "name" => Some(FieldValue::String(self.name.clone())),
            "status" => Some(FieldValue::from(self.status.as_str())),
            "city" => Some(FieldValue::String(self.location.city.clone())),
            "province" => Some(FieldValue::String(self.location.province.clone())),
            "star_rating" => Some(FieldValue::Integer(self.star_rating as i64)),
            "average_rating" => Some(FieldValue::Float(self.average_rating)),
            "total_reviews" => Some(FieldValue::Integer(self.total_reviews as i64)),
            "created_at" => Some(FieldValue::DateTime(self.created_at)),
            _ => None,
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn hotel(admin_id: Uuid, city: &str) -> Hotel {
        let now = Utc::now();
        Hotel {
            id: Uuid::new_v4(),
            entity_type: "hotel".to_string(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
            admin_id,
            name: format!("{} Riverside", city),
            description: "Boutique hotel".to_string(),
            location: Location {
                address: "Street 1".to_string(),
                city: city.to_string(),
                province: city.to_string(),
                country: default_country(),
                latitude: 11.55,
                longitude: 104.92,
            },
            contact: Contact {
                phone: "+85523123456".to_string(),
                email: "desk@example.com".to_string(),
                website: None,
            },
            amenities: vec!["wifi".to_string(), "pool".to_string()],
            images: Vec::new(),
            star_rating: 4,
            average_rating: 0.0,
            total_reviews: 0,
            status: HotelStatus::Active,
            approval_date: Some(now),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_destination_and_amenity_matching() {
        let hotel = fixtures::hotel(Uuid::new_v4(), "Siem Reap");
        assert!(hotel.is_in("siem"));
        assert!(!hotel.is_in("Kampot"));
        assert!(hotel.has_amenities(&["WiFi".to_string()]));
        assert!(!hotel.has_amenities(&["spa".to_string()]));
    }

    #[test]
    fn test_only_active_hotels_are_bookable() {
        let mut hotel = fixtures::hotel(Uuid::new_v4(), "Kep");
        assert!(hotel.is_bookable());
        hotel.status = HotelStatus::PendingApproval;
        assert!(!hotel.is_bookable());
    }
}

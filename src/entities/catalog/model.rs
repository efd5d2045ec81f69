//! Tours, events, guides and drivers
//!
//! Catalog records are read by everyone and written by super admins.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Duration {
    pub days: u32,
    pub nights: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSize {
    pub min: u32,
    pub max: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    #[default]
    Easy,
    Moderate,
    Challenging,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayItinerary {
    pub day: u32,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub activities: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct MeetingPoint {
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
}

crate::impl_data_entity!(Tour, "tour", "tours", ["destination", "difficulty"], {
    description: String,
    destination: String,
    duration: Duration,
    difficulty: Difficulty,
    #[serde(default)]
    category: Vec<String>,
    price_per_person: f64,
    group_size: GroupSize,
    #[serde(default)]
    inclusions: Vec<String>,
    #[serde(default)]
    exclusions: Vec<String>,
    #[serde(default)]
    itinerary: Vec<DayItinerary>,
    #[serde(default)]
    images: Vec<String>,
    #[serde(default)]
    meeting_point: MeetingPoint,
    guide_required: bool,
    transportation_required: bool,
    #[serde(default)]
    average_rating: f64,
    #[serde(default)]
    total_bookings: u32,
});

impl Tour {
    pub fn fits_group(&self, people: u32) -> bool {
        (self.group_size.min..=self.group_size.max).contains(&people)
    }

    pub fn group_price(&self, people: u32) -> f64 {
        crate::booking::pricing::round_cents(self.price_per_person * people as f64)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Festival,
    Cultural,
    Seasonal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct EventLocation {
    pub city: String,
    pub province: String,
    pub venue: String,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct EventPricing {
    pub base_price: f64,
    #[serde(default)]
    pub vip_price: Option<f64>,
}

crate::impl_data_entity!(Event, "event", "events", ["event_type", "start_date"], {
    description: String,
    event_type: EventType,
    start_date: NaiveDate,
    end_date: NaiveDate,
    location: EventLocation,
    pricing: EventPricing,
    capacity: u32,
    #[serde(default)]
    bookings_count: u32,
    #[serde(default)]
    images: Vec<String>,
    #[serde(default)]
    cultural_significance: String,
    #[serde(default)]
    what_to_expect: String,
    #[serde(default)]
    related_tours: Vec<Uuid>,
    created_by: Uuid,
});

impl Event {
    /// Whether `date` falls within the event, both ends inclusive
    pub fn runs_on(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }

    pub fn is_upcoming(&self, today: NaiveDate) -> bool {
        self.start_date > today
    }

    pub fn spots_left(&self) -> u32 {
        self.capacity.saturating_sub(self.bookings_count)
    }
}

pub mod guide_status {
    pub const AVAILABLE: &str = "available";
    pub const UNAVAILABLE: &str = "unavailable";
    pub const ON_TOUR: &str = "on_tour";
    pub const ALL: [&str; 3] = [AVAILABLE, UNAVAILABLE, ON_TOUR];
}

crate::impl_data_entity!(Guide, "guide", "guides", ["phone"], {
    phone: String,
    email: Option<String>,
    telegram_username: Option<String>,
    #[serde(default)]
    specializations: Vec<String>,
    #[serde(default)]
    languages: Vec<String>,
    #[serde(default)]
    certifications: Vec<String>,
    bio: Option<String>,
    #[serde(default)]
    average_rating: f64,
    #[serde(default)]
    total_tours: u32,
});

impl Guide {
    pub fn speaks(&self, language: &str) -> bool {
        self.languages.iter().any(|l| l.eq_ignore_ascii_case(language))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleType {
    TukTuk,
    Car,
    Van,
    Bus,
}

pub mod vehicle_status {
    pub const AVAILABLE: &str = "available";
    pub const UNAVAILABLE: &str = "unavailable";
    pub const ON_TRIP: &str = "on_trip";
    pub const ALL: [&str; 3] = [AVAILABLE, UNAVAILABLE, ON_TRIP];
}

// `name` holds the driver name
crate::impl_data_entity!(Transportation, "transportation", "transportation", ["vehicle_type", "license_plate"], {
    phone: String,
    telegram_username: Option<String>,
    vehicle_type: VehicleType,
    vehicle_model: String,
    license_plate: String,
    capacity: u32,
    #[serde(default)]
    amenities: Vec<String>,
    #[serde(default)]
    average_rating: f64,
    #[serde(default)]
    total_trips: u32,
    last_status_update: Option<DateTime<Utc>>,
});

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::entity::{Data, Entity};
    use crate::core::field::FieldValue;

    fn tour() -> Tour {
        Tour::new(
            "Angkor Sunrise".to_string(),
            "active".to_string(),
            "Three temples before breakfast".to_string(),
            "Siem Reap".to_string(),
            Duration { days: 1, nights: 0 },
            Difficulty::Easy,
            vec!["culture".to_string()],
            45.0,
            GroupSize { min: 2, max: 12 },
            vec!["guide".to_string()],
            Vec::new(),
            Vec::new(),
            Vec::new(),
            MeetingPoint::default(),
            true,
            true,
            0.0,
            0,
        )
    }

    #[test]
    fn test_tour_group_rules() {
        let tour = tour();
        assert!(tour.fits_group(2));
        assert!(!tour.fits_group(13));
        assert_eq!(tour.group_price(3), 135.0);
        assert_eq!(
            tour.field_value("destination"),
            Some(FieldValue::String("Siem Reap".to_string()))
        );
        assert_eq!(
            tour.field_value("difficulty"),
            Some(FieldValue::String("easy".to_string()))
        );
    }

    #[test]
    fn test_event_dates() {
        let start = NaiveDate::from_ymd_opt(2026, 4, 14).unwrap();
        let event = Event::new(
            "Khmer New Year".to_string(),
            "active".to_string(),
            "Choul Chnam Thmey".to_string(),
            EventType::Festival,
            start,
            start + chrono::Duration::days(2),
            EventLocation::default(),
            EventPricing { base_price: 0.0, vip_price: None },
            500,
            498,
            Vec::new(),
            String::new(),
            String::new(),
            Vec::new(),
            Uuid::new_v4(),
        );

        assert!(event.runs_on(start + chrono::Duration::days(2)));
        assert!(!event.runs_on(start + chrono::Duration::days(3)));
        assert!(event.is_upcoming(start - chrono::Duration::days(1)));
        assert_eq!(event.spots_left(), 2);
        assert_eq!(Event::resource_name(), "events");
    }
}

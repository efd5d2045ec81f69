//! Shared test harness for storage backend testing
//!
//! Backends are exercised with [`Tour`] records: the MySQL schema only has
//! tables for real resources, and a tour carries string, integer, float and
//! boolean fields to search on.
//!
//! # Usage
//!
//! From any integration test file in `tests/`:
//! ```rust,ignore
//! #[macro_use]
//! mod storage_harness;
//! use storage_harness::*;
//! ```

#![allow(dead_code)]

pub mod data_service_tests;

use derlg::entities::catalog::{Difficulty, Duration, GroupSize, MeetingPoint, Tour};

/// A tour whose searchable fields are all set by the caller
///
/// - `destination`: String
/// - `total_bookings`: Integer
/// - `average_rating`: Float
/// - `guide_required`: Boolean
pub fn create_test_tour(
    name: &str,
    destination: &str,
    total_bookings: u32,
    average_rating: f64,
    guide_required: bool,
) -> Tour {
    Tour::new(
        name.to_string(),
        "active".to_string(),
        format!("{} day trip", destination),
        destination.to_string(),
        Duration { days: 1, nights: 0 },
        Difficulty::Easy,
        vec!["culture".to_string()],
        35.0,
        GroupSize { min: 1, max: 10 },
        Vec::new(),
        Vec::new(),
        Vec::new(),
        Vec::new(),
        MeetingPoint::default(),
        guide_required,
        false,
        average_rating,
        total_bookings,
    )
}

/// Five tours with distinct destinations and ratings
pub fn create_test_tours() -> Vec<Tour> {
    vec![
        create_test_tour("Angkor Sunrise", "Siem Reap", 120, 4.5, true),
        create_test_tour("Pepper Farm", "Kampot", 40, 3.5, false),
        create_test_tour("Crab Market", "Kep", 15, 4.25, false),
        create_test_tour("Bamboo Train", "Battambang", 60, 3.75, true),
        create_test_tour("Royal Palace", "Phnom Penh", 200, 4.75, true),
    ]
}

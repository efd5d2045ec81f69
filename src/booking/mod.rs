//! Bookings: the stay record, its state machine and the pricing rules

pub mod access;
pub mod descriptor;
pub mod handlers;
pub mod lifecycle;
pub mod model;
pub mod pricing;
pub mod service;

pub use lifecycle::BookingStatus;
pub use model::*;
pub use service::BookingService;

//! Catalog and platform records with their routes
//!
//! Bookings and payments live in their own top-level modules; everything a
//! tourist browses, saves or writes about lives here.

pub mod macros;

pub mod ai_conversation;
pub mod catalog;
pub mod crud;
pub mod hotel;
pub mod message;
pub mod promo_code;
pub mod review;
pub mod room;
pub mod user;
pub mod wishlist;

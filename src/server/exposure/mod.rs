//! API exposure
//!
//! An exposure consumes a `ServerHost` and produces a Router for its
//! protocol. The platform is exposed over REST with an SSE notification feed.

pub mod rest;

pub use rest::RestExposure;

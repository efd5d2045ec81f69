//! Payments, escrow and the background sweeps
//!
//! Captured money is held in escrow until the stay completes. The sum of
//! completed transactions of a booking never exceeds its total.

pub mod descriptor;
pub mod escrow;
pub mod gateway;
pub mod handlers;
pub mod model;
pub mod options;
pub mod scheduler;
pub mod service;

pub use gateway::{PaymentGateway, SimulatedGateway};
pub use model::*;
pub use scheduler::EscrowScheduler;
pub use service::PaymentService;

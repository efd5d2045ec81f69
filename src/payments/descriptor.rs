//! Routes of the payments module

use super::handlers::{
    confirm_payment, initiate_payment, list_transactions, payment_schedule, payment_webhook,
    refund_booking, release_escrow,
};
use crate::app::AppState;
use crate::server::entity_registry::EntityDescriptor;
use axum::routing::{get, post};
use axum::Router;

pub struct PaymentDescriptor {
    pub state: AppState,
}

impl PaymentDescriptor {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

impl EntityDescriptor for PaymentDescriptor {
    fn entity_type(&self) -> &str {
        "payment_transaction"
    }

    fn plural(&self) -> &str {
        "payments"
    }

    fn build_routes(&self) -> Router {
        Router::new()
            .route("/payments/initiate", post(initiate_payment))
            .route("/payments/confirm", post(confirm_payment))
            .route("/payments/webhook", post(payment_webhook))
            .route("/payments/bookings/{id}/transactions", get(list_transactions))
            .route("/payments/bookings/{id}/schedule", get(payment_schedule))
            .route("/payments/bookings/{id}/refund", post(refund_booking))
            .route("/payments/bookings/{id}/release", post(release_escrow))
            .with_state(self.state.clone())
    }
}

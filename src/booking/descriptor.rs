//! Routes of the booking module

use super::handlers::*;
use crate::app::AppState;
use crate::server::entity_registry::EntityDescriptor;
use axum::routing::{get, post, put};
use axum::Router;

pub struct BookingDescriptor {
    pub state: AppState,
}

impl BookingDescriptor {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

impl EntityDescriptor for BookingDescriptor {
    fn entity_type(&self) -> &str {
        "booking"
    }

    fn plural(&self) -> &str {
        "bookings"
    }

    fn build_routes(&self) -> Router {
        Router::new()
            .route("/bookings", get(list_my_bookings).post(create_booking))
            .route("/bookings/quote", post(quote_booking))
            .route("/bookings/{id}", get(get_booking).put(update_booking))
            .route("/bookings/{id}/cancel", put(cancel_booking))
            .route("/bookings/{id}/promo-code", post(apply_promo_code))
            .route("/hotel/bookings", get(list_hotel_bookings))
            .route("/hotel/occupancy", get(hotel_occupancy))
            .route("/hotel/bookings/{id}/confirm", put(confirm_booking))
            .route("/hotel/bookings/{id}/reject", put(reject_booking))
            .route("/hotel/bookings/{id}/complete", put(complete_booking))
            .route("/admin/hotels/{id}/bookings", get(list_bookings_of_hotel))
            .with_state(self.state.clone())
    }
}

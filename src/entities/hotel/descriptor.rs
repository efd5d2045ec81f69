//! Routes of the hotel module

use super::handlers::*;
use crate::app::AppState;
use crate::server::entity_registry::EntityDescriptor;
use axum::routing::{get, put};
use axum::Router;

pub struct HotelDescriptor {
    pub state: AppState,
}

impl HotelDescriptor {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

impl EntityDescriptor for HotelDescriptor {
    fn entity_type(&self) -> &str {
        "hotel"
    }

    fn plural(&self) -> &str {
        "hotels"
    }

    fn build_routes(&self) -> Router {
        Router::new()
            .route("/hotels", get(search_hotels).post(create_hotel))
            .route("/hotels/{id}", get(get_hotel))
            .route("/hotels/{id}/availability", get(hotel_availability))
            .route("/hotel/profile", get(get_profile).put(update_profile))
            .route("/admin/hotels", get(list_all_hotels))
            .route("/admin/hotels/{id}/status", put(set_hotel_status))
            .with_state(self.state.clone())
    }
}

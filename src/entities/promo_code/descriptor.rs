//! Routes of the promo code module

use super::handlers::*;
use crate::app::AppState;
use crate::server::entity_registry::EntityDescriptor;
use axum::routing::{get, post};
use axum::Router;

pub struct PromoCodeDescriptor {
    pub state: AppState,
}

impl PromoCodeDescriptor {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

impl EntityDescriptor for PromoCodeDescriptor {
    fn entity_type(&self) -> &str {
        "promo_code"
    }

    fn plural(&self) -> &str {
        "promo_codes"
    }

    fn build_routes(&self) -> Router {
        Router::new()
            .route("/admin/promo-codes", get(list_promo_codes).post(create_promo_code))
            .route(
                "/admin/promo-codes/{id}",
                get(get_promo_code).put(update_promo_code).delete(delete_promo_code),
            )
            .route("/promo-codes/validate", post(validate_promo_code))
            .with_state(self.state.clone())
    }
}

//! Routes of the wishlist module

use super::handlers::*;
use crate::app::AppState;
use crate::server::entity_registry::EntityDescriptor;
use axum::routing::{get, put};
use axum::Router;

pub struct WishlistDescriptor {
    pub state: AppState,
}

impl WishlistDescriptor {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

impl EntityDescriptor for WishlistDescriptor {
    fn entity_type(&self) -> &str {
        "wishlist"
    }

    fn plural(&self) -> &str {
        "wishlists"
    }

    fn build_routes(&self) -> Router {
        Router::new()
            .route("/wishlist", get(list_wishlist).post(add_to_wishlist))
            .route("/wishlist/{id}", put(update_wishlist).delete(remove_from_wishlist))
            .with_state(self.state.clone())
    }
}

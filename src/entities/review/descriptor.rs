//! Routes of the review module

use super::handlers::*;
use crate::app::AppState;
use crate::server::entity_registry::EntityDescriptor;
use axum::routing::{get, post, put};
use axum::Router;

pub struct ReviewDescriptor {
    pub state: AppState,
}

impl ReviewDescriptor {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

impl EntityDescriptor for ReviewDescriptor {
    fn entity_type(&self) -> &str {
        "review"
    }

    fn plural(&self) -> &str {
        "reviews"
    }

    fn build_routes(&self) -> Router {
        Router::new()
            .route("/reviews", post(create_review))
            .route("/reviews/mine", get(list_my_reviews))
            .route("/reviews/{id}", put(update_review).delete(delete_review))
            .route("/reviews/{id}/helpful", post(mark_helpful))
            .route("/hotels/{id}/reviews", get(list_hotel_reviews))
            .route("/hotel/reviews/{id}/response", put(respond_to_review))
            .with_state(self.state.clone())
    }
}

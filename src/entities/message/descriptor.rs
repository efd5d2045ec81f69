//! Routes of the messaging module

use super::handlers::*;
use crate::app::AppState;
use crate::server::entity_registry::EntityDescriptor;
use axum::routing::{get, put};
use axum::Router;

pub struct MessageDescriptor {
    pub state: AppState,
}

impl MessageDescriptor {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

impl EntityDescriptor for MessageDescriptor {
    fn entity_type(&self) -> &str {
        "message"
    }

    fn plural(&self) -> &str {
        "messages"
    }

    fn build_routes(&self) -> Router {
        Router::new()
            .route("/bookings/{id}/messages", get(list_booking_messages).post(send_message))
            .route("/messages/unread/count", get(unread_count))
            .route("/messages/{id}/read", put(mark_read))
            .with_state(self.state.clone())
    }
}

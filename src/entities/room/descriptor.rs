//! Routes of the room module

use super::handlers::{create_room, delete_room, list_rooms, update_room};
use crate::app::AppState;
use crate::server::entity_registry::EntityDescriptor;
use axum::routing::{get, put};
use axum::Router;

pub struct RoomDescriptor {
    pub state: AppState,
}

impl RoomDescriptor {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

impl EntityDescriptor for RoomDescriptor {
    fn entity_type(&self) -> &str {
        "room"
    }

    fn plural(&self) -> &str {
        "rooms"
    }

    fn build_routes(&self) -> Router {
        Router::new()
            .route("/hotel/rooms", get(list_rooms).post(create_room))
            .route("/hotel/rooms/{id}", put(update_room).delete(delete_room))
            .with_state(self.state.clone())
    }
}

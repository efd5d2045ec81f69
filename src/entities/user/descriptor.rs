//! Routes of the user module

use super::handlers::{me, register, update_profile};
use crate::app::AppState;
use crate::server::entity_registry::EntityDescriptor;
use axum::routing::{get, post};
use axum::Router;

pub struct UserDescriptor {
    pub state: AppState,
}

impl UserDescriptor {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

impl EntityDescriptor for UserDescriptor {
    fn entity_type(&self) -> &str {
        "user"
    }

    fn plural(&self) -> &str {
        "users"
    }

    fn build_routes(&self) -> Router {
        Router::new()
            .route("/auth/register", post(register))
            .route("/auth/me", get(me))
            .route("/users/profile", get(me).put(update_profile))
            .with_state(self.state.clone())
    }
}

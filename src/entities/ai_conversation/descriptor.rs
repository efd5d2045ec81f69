//! Routes of the AI assistant session module

use super::handlers::*;
use crate::app::AppState;
use crate::server::entity_registry::EntityDescriptor;
use axum::routing::{get, post, put};
use axum::Router;

pub struct AiConversationDescriptor {
    pub state: AppState,
}

impl AiConversationDescriptor {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

impl EntityDescriptor for AiConversationDescriptor {
    fn entity_type(&self) -> &str {
        "ai_conversation"
    }

    fn plural(&self) -> &str {
        "ai_conversations"
    }

    fn build_routes(&self) -> Router {
        Router::new()
            .route("/ai/conversations", get(list_conversations).post(start_conversation))
            .route("/ai/conversations/{id}", get(get_conversation))
            .route("/ai/conversations/{id}/messages", post(append_message))
            .route("/ai/conversations/{id}/context", put(update_context))
            .route("/ai/conversations/{id}/conversion", post(record_conversion))
            .with_state(self.state.clone())
    }
}

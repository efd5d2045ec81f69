//! Server-sent event stream of the caller's notifications

use crate::app::AppState;
use crate::core::auth::AuthContext;
use crate::core::error::DerlgResult;
use crate::core::events::EventEnvelope;
use crate::entities::hotel::access::hotel_of_admin;
use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use std::convert::Infallible;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use uuid::Uuid;

/// Which events a subscriber gets to see
#[derive(Debug, Clone, Copy)]
pub struct Audience {
    pub user_id: Uuid,
    pub hotel_id: Option<Uuid>,
    pub everything: bool,
}

impl Audience {
    pub fn admits(&self, envelope: &EventEnvelope) -> bool {
        self.everything
            || envelope.event.user_id() == Some(self.user_id)
            || self.hotel_id.is_some_and(|id| envelope.event.hotel_id() == Some(id))
    }
}

pub async fn notification_stream(
    State(state): State<AppState>,
    auth: AuthContext,
) -> DerlgResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let user_id = auth.require_user()?;
    let hotel_id = if auth.is_hotel_admin() {
        Some(hotel_of_admin(state.stores.hotels.as_ref(), &auth).await?.id)
    } else {
        None
    };
    let audience = Audience {
        user_id,
        hotel_id,
        everything: auth.is_super_admin(),
    };
    tracing::debug!(subscriber = %auth.actor(), "notification stream opened");

    let stream = BroadcastStream::new(state.events.subscribe()).filter_map(move |received| {
        let envelope = match received {
            Ok(envelope) => envelope,
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                tracing::warn!(%user_id, skipped, "notification subscriber lagged");
                return None;
            }
        };
        if !audience.admits(&envelope) {
            return None;
        }
        Event::default()
            .event(envelope.event.event_kind())
            .id(envelope.id.to_string())
            .json_data(&envelope)
            .ok()
            .map(Ok)
    });
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

//! Guest and hotel conversation attached to a booking

use super::model::{Message, SenderType, UNREAD};
use crate::app::AppState;
use crate::booking::access::ensure_can_view;
use crate::booking::Booking;
use crate::core::auth::AuthContext;
use crate::core::error::{AuthError, BookingError, DerlgResult};
use crate::core::events::EntityEvent;
use crate::core::extractors::PathId;
use crate::core::query::{PaginatedResponse, QueryParams};
use crate::core::response::ApiResponse;
use crate::core::service::find_or_404;
use crate::core::validation::ValidatedJson;
use axum::extract::{Query, State};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SendMessageRequest {
    #[validate(length(min = 1, max = 2000))]
    pub message: String,
    #[serde(default)]
    #[validate(length(max = 5))]
    pub attachments: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct UnreadCount {
    pub count: usize,
}

async fn load_booking(state: &AppState, id: Uuid) -> DerlgResult<Booking> {
    state
        .stores
        .bookings
        .get(&id)
        .await?
        .filter(|b| b.deleted_at.is_none())
        .ok_or_else(|| BookingError::NotFound { id }.into())
}

/// The sender's side and the other party of the conversation
async fn participants(state: &AppState, auth: &AuthContext, booking: &Booking) -> DerlgResult<(Uuid, SenderType, Uuid)> {
    let user_id = auth.require_user()?;
    if booking.is_owned_by(user_id) {
        let hotel = find_or_404(state.stores.hotels.as_ref(), &booking.hotel_id).await?;
        return Ok((user_id, SenderType::Tourist, hotel.admin_id));
    }
    if auth.is_hotel_admin() {
        let hotel = find_or_404(state.stores.hotels.as_ref(), &booking.hotel_id).await?;
        if hotel.admin_id == user_id {
            return Ok((user_id, SenderType::HotelAdmin, booking.user_id));
        }
    }
    Err(AuthError::forbidden("only the guest and the hotel can message on a booking").into())
}

pub async fn send_message(
    State(state): State<AppState>,
    auth: AuthContext,
    PathId(booking_id): PathId,
    ValidatedJson(request): ValidatedJson<SendMessageRequest>,
) -> DerlgResult<ApiResponse<Message>> {
    let booking = load_booking(&state, booking_id).await?;
    let (sender_id, sender_type, recipient_id) = participants(&state, &auth, &booking).await?;

    let message = Message::new(
        booking.booking_number.clone(),
        UNREAD.to_string(),
        booking.id,
        booking.hotel_id,
        sender_id,
        sender_type,
        recipient_id,
        request.message,
        request.attachments,
        false,
        None,
    );
    let message = state.stores.messages.create(message).await?;

    tracing::debug!(booking = %booking.booking_number, ?sender_type, "message sent");
    state.events.publish(EntityEvent::Created {
        entity_type: "message".to_string(),
        entity_id: message.id,
        recipient_id: Some(recipient_id),
    });
    Ok(ApiResponse::created(message).with_message("Message sent"))
}

/// Oldest first
pub async fn list_booking_messages(
    State(state): State<AppState>,
    auth: AuthContext,
    PathId(booking_id): PathId,
    Query(params): Query<QueryParams>,
) -> DerlgResult<Json<PaginatedResponse<Message>>> {
    let booking = load_booking(&state, booking_id).await?;
    ensure_can_view(&state.stores, &auth, &booking).await?;

    let mut messages: Vec<Message> = state
        .stores
        .messages
        .search("booking_id", &booking_id.to_string())
        .await?
        .into_iter()
        .filter(|m| m.deleted_at.is_none())
        .collect();
    messages.sort_by(|a, b| a.created_at.cmp(&b.created_at));
    Ok(Json(PaginatedResponse::from_items(messages, &params)))
}

pub async fn mark_read(
    State(state): State<AppState>,
    auth: AuthContext,
    PathId(id): PathId,
) -> DerlgResult<ApiResponse<Message>> {
    let user_id = auth.require_user()?;
    let mut message = find_or_404(state.stores.messages.as_ref(), &id).await?;
    if message.recipient_id != user_id {
        return Err(AuthError::forbidden("only the recipient can mark a message as read").into());
    }
    message.mark_read(Utc::now());
    message.touch();
    Ok(ApiResponse::ok(state.stores.messages.update(&id, message).await?))
}

pub async fn unread_count(State(state): State<AppState>, auth: AuthContext) -> DerlgResult<ApiResponse<UnreadCount>> {
    let user_id = auth.require_user()?;
    let count = state
        .stores
        .messages
        .search("recipient_id", &user_id.to_string())
        .await?
        .iter()
        .filter(|m| m.deleted_at.is_none() && !m.is_read)
        .count();
    Ok(ApiResponse::ok(UnreadCount { count }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::booking::model::fixtures::booking;
    use crate::config::AppConfig;
    use crate::core::auth::Role;
    use crate::entities::hotel::model::fixtures::hotel;

    struct Thread {
        state: AppState,
        guest: AuthContext,
        hotel_admin: AuthContext,
        booking_id: Uuid,
    }

    async fn thread() -> Thread {
        let state = AppState::in_memory(AppConfig::default());
        let admin_id = Uuid::new_v4();
        let hotel = state.stores.hotels.create(hotel(admin_id, "Battambang")).await.unwrap();

        let guest_id = Uuid::new_v4();
        let mut stay = booking(Utc::now().date_naive() + chrono::Duration::days(10), 2, 80.0);
        stay.user_id = guest_id;
        stay.hotel_id = hotel.id;
        let stay = state.stores.bookings.create(stay).await.unwrap();

        Thread {
            state,
            guest: AuthContext::user(guest_id, Role::Tourist),
            hotel_admin: AuthContext::user(admin_id, Role::Admin),
            booking_id: stay.id,
        }
    }

    fn text(body: &str) -> ValidatedJson<SendMessageRequest> {
        ValidatedJson(SendMessageRequest {
            message: body.to_string(),
            attachments: Vec::new(),
        })
    }

    #[tokio::test]
    async fn test_guest_message_reaches_hotel_admin() {
        let t = thread().await;
        let sent = send_message(State(t.state.clone()), t.guest.clone(), PathId(t.booking_id), text("Late arrival"))
            .await
            .unwrap()
            .data;
        assert_eq!(sent.sender_type, SenderType::Tourist);
        assert_eq!(Some(sent.recipient_id), t.hotel_admin.user_id());

        let unread = unread_count(State(t.state.clone()), t.hotel_admin.clone()).await.unwrap().data;
        assert_eq!(unread.count, 1);

        let err = mark_read(State(t.state.clone()), t.guest.clone(), PathId(sent.id)).await.unwrap_err();
        assert_eq!(err.error_code(), "AUTH_1006");

        mark_read(State(t.state.clone()), t.hotel_admin.clone(), PathId(sent.id))
            .await
            .unwrap();
        let unread = unread_count(State(t.state), t.hotel_admin).await.unwrap().data;
        assert_eq!(unread.count, 0);
    }

    #[tokio::test]
    async fn test_outsiders_cannot_post() {
        let t = thread().await;
        let outsider = AuthContext::user(Uuid::new_v4(), Role::Admin);
        let err = send_message(State(t.state), outsider, PathId(t.booking_id), text("hello"))
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "AUTH_1006");
    }

    #[tokio::test]
    async fn test_thread_is_chronological() {
        let t = thread().await;
        send_message(State(t.state.clone()), t.guest.clone(), PathId(t.booking_id), text("first"))
            .await
            .unwrap();
        send_message(State(t.state.clone()), t.hotel_admin.clone(), PathId(t.booking_id), text("second"))
            .await
            .unwrap();

        let page = list_booking_messages(
            State(t.state),
            t.guest,
            PathId(t.booking_id),
            Query(QueryParams::default()),
        )
        .await
        .unwrap();
        let bodies: Vec<&str> = page.data.iter().map(|m| m.message.as_str()).collect();
        assert_eq!(bodies, ["first", "second"]);
    }
}

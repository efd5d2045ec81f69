//! Sessions of the AI travel assistant
//!
//! The assistant itself runs elsewhere; this module stores the transcript,
//! the trip context it gathered and whether the session led to a booking.

use super::model::*;
use crate::app::AppState;
use crate::core::auth::AuthContext;
use crate::core::error::{AuthError, BookingError, DerlgResult, EntityError, ValidationError};
use crate::core::events::EntityEvent;
use crate::core::extractors::PathId;
use crate::core::query::{PaginatedResponse, QueryParams};
use crate::core::response::ApiResponse;
use crate::core::service::find_or_404;
use crate::core::validation::ValidatedJson;
use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct StartConversationRequest {
    #[validate(length(min = 1, max = 100))]
    pub session_id: Option<String>,
    pub ai_type: AiType,
    #[serde(default)]
    pub context: ConversationContext,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AppendMessageRequest {
    pub role: MessageRole,
    #[validate(length(min = 1, max = 10000))]
    pub content: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateContextRequest {
    pub context: Option<ConversationContext>,
    pub recommendations: Option<Recommendations>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ConversionRequest {
    pub booking_id: Uuid,
}

/// The session owner, or an internal service acting for the assistant
async fn accessible(state: &AppState, auth: &AuthContext, id: Uuid) -> DerlgResult<AiConversation> {
    let conversation = find_or_404(state.stores.conversations.as_ref(), &id).await?;
    if auth.is_system() {
        return Ok(conversation);
    }
    if auth.require_user()? != conversation.user_id {
        return Err(AuthError::forbidden("this conversation belongs to another user").into());
    }
    Ok(conversation)
}

fn check_dates(context: &ConversationContext) -> DerlgResult<()> {
    if let Some(dates) = context.dates
        && dates.end < dates.start
    {
        return Err(ValidationError::field("context.dates", "end must not be before start").into());
    }
    if context.budget.is_some_and(|b| b < 0.0) {
        return Err(ValidationError::field("context.budget", "must not be negative").into());
    }
    Ok(())
}

pub async fn start_conversation(
    State(state): State<AppState>,
    auth: AuthContext,
    ValidatedJson(request): ValidatedJson<StartConversationRequest>,
) -> DerlgResult<ApiResponse<AiConversation>> {
    let user_id = auth.require_user()?;
    check_dates(&request.context)?;

    let session_id = request
        .session_id
        .unwrap_or_else(|| format!("session_{}", Uuid::new_v4().simple()));
    let taken = state
        .stores
        .conversations
        .search("session_id", &session_id)
        .await?;
    if !taken.is_empty() {
        return Err(EntityError::AlreadyExists {
            entity_type: "ai_conversation".to_string(),
            key: session_id,
        }
        .into());
    }

    let conversation = AiConversation::new(
        session_id.clone(),
        ACTIVE.to_string(),
        user_id,
        session_id,
        request.ai_type,
        Vec::new(),
        request.context,
        Recommendations::default(),
        Conversion::default(),
    );
    let conversation = state.stores.conversations.create(conversation).await?;
    tracing::debug!(session = %conversation.session_id, ai_type = ?conversation.ai_type, "assistant session started");
    Ok(ApiResponse::created(conversation))
}

/// Newest activity first
pub async fn list_conversations(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(params): Query<QueryParams>,
) -> DerlgResult<Json<PaginatedResponse<AiConversation>>> {
    let user_id = auth.require_user()?;
    let mut conversations: Vec<AiConversation> = state
        .stores
        .conversations
        .search("user_id", &user_id.to_string())
        .await?
        .into_iter()
        .filter(|c| c.deleted_at.is_none())
        .collect();
    conversations.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    Ok(Json(PaginatedResponse::from_items(conversations, &params)))
}

pub async fn get_conversation(
    State(state): State<AppState>,
    auth: AuthContext,
    PathId(id): PathId,
) -> DerlgResult<ApiResponse<AiConversation>> {
    Ok(ApiResponse::ok(accessible(&state, &auth, id).await?))
}

pub async fn append_message(
    State(state): State<AppState>,
    auth: AuthContext,
    PathId(id): PathId,
    ValidatedJson(request): ValidatedJson<AppendMessageRequest>,
) -> DerlgResult<ApiResponse<AiConversation>> {
    let mut conversation = accessible(&state, &auth, id).await?;
    if request.role == MessageRole::Assistant && !auth.is_system() {
        return Err(AuthError::forbidden("assistant replies are recorded by the assistant service").into());
    }
    conversation.push_message(request.role, request.content);
    Ok(ApiResponse::ok(state.stores.conversations.update(&id, conversation).await?))
}

pub async fn update_context(
    State(state): State<AppState>,
    auth: AuthContext,
    PathId(id): PathId,
    ValidatedJson(request): ValidatedJson<UpdateContextRequest>,
) -> DerlgResult<ApiResponse<AiConversation>> {
    let mut conversation = accessible(&state, &auth, id).await?;
    if let Some(context) = request.context {
        check_dates(&context)?;
        conversation.context = context;
    }
    if let Some(recommendations) = request.recommendations {
        conversation.recommendations = recommendations;
    }
    conversation.touch();
    Ok(ApiResponse::ok(state.stores.conversations.update(&id, conversation).await?))
}

/// Link the session to the booking it produced
pub async fn record_conversion(
    State(state): State<AppState>,
    auth: AuthContext,
    PathId(id): PathId,
    ValidatedJson(request): ValidatedJson<ConversionRequest>,
) -> DerlgResult<ApiResponse<AiConversation>> {
    let mut conversation = accessible(&state, &auth, id).await?;
    let booking = state
        .stores
        .bookings
        .get(&request.booking_id)
        .await?
        .ok_or(BookingError::NotFound { id: request.booking_id })?;
    if booking.user_id != conversation.user_id {
        return Err(AuthError::forbidden("the booking belongs to another user").into());
    }

    conversation.record_conversion(booking.id);
    conversation.touch();
    let conversation = state.stores.conversations.update(&id, conversation).await?;

    tracing::info!(session = %conversation.session_id, booking = %booking.booking_number, "assistant session converted");
    state.events.publish(EntityEvent::Updated {
        entity_type: "ai_conversation".to_string(),
        entity_id: conversation.id,
        recipient_id: Some(conversation.user_id),
    });
    Ok(ApiResponse::ok(conversation))
}

//! A tourist's saved hotels, tours and events

use super::model::{ItemType, Wishlist};
use crate::app::AppState;
use crate::core::auth::AuthContext;
use crate::core::error::{AuthError, DerlgResult, EntityError};
use crate::core::extractors::PathId;
use crate::core::query::{PaginatedResponse, QueryParams};
use crate::core::response::ApiResponse;
use crate::core::service::find_or_404;
use crate::core::validation::ValidatedJson;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

const ACTIVE: &str = "active";

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AddWishlistRequest {
    pub item_type: ItemType,
    pub item_id: Uuid,
    #[validate(length(max = 500))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateWishlistRequest {
    #[validate(length(max = 500))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct WishlistQuery {
    pub item_type: Option<ItemType>,
    pub page: Option<usize>,
    pub limit: Option<usize>,
}

async fn ensure_item_exists(state: &AppState, item_type: ItemType, id: Uuid) -> DerlgResult<()> {
    let stores = &state.stores;
    match item_type {
        ItemType::Hotel => find_or_404(stores.hotels.as_ref(), &id).await.map(|_| ()),
        ItemType::Tour => find_or_404(stores.tours.as_ref(), &id).await.map(|_| ()),
        ItemType::Event => find_or_404(stores.events.as_ref(), &id).await.map(|_| ()),
    }
}

async fn saved_by(state: &AppState, user_id: Uuid) -> DerlgResult<Vec<Wishlist>> {
    Ok(state
        .stores
        .wishlists
        .search("user_id", &user_id.to_string())
        .await?
        .into_iter()
        .filter(|w| w.deleted_at.is_none())
        .collect())
}

async fn own_entry(state: &AppState, auth: &AuthContext, id: Uuid) -> DerlgResult<Wishlist> {
    let user_id = auth.require_user()?;
    let entry = find_or_404(state.stores.wishlists.as_ref(), &id).await?;
    if entry.user_id != user_id {
        return Err(AuthError::forbidden("this wishlist entry belongs to another user").into());
    }
    Ok(entry)
}

/// Most recently saved first
pub async fn list_wishlist(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(query): Query<WishlistQuery>,
) -> DerlgResult<Json<PaginatedResponse<Wishlist>>> {
    let user_id = auth.require_user()?;
    let mut entries: Vec<Wishlist> = saved_by(&state, user_id)
        .await?
        .into_iter()
        .filter(|w| query.item_type.is_none_or(|t| w.item_type == t))
        .collect();
    entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let defaults = QueryParams::default();
    let params = QueryParams::new(query.page.unwrap_or(defaults.page), query.limit.unwrap_or(defaults.limit));
    Ok(Json(PaginatedResponse::from_items(entries, &params)))
}

pub async fn add_to_wishlist(
    State(state): State<AppState>,
    auth: AuthContext,
    ValidatedJson(request): ValidatedJson<AddWishlistRequest>,
) -> DerlgResult<ApiResponse<Wishlist>> {
    let user_id = auth.require_user()?;
    ensure_item_exists(&state, request.item_type, request.item_id).await?;

    let existing = saved_by(&state, user_id).await?;
    if existing
        .iter()
        .any(|w| w.is_same_item(user_id, request.item_type, request.item_id))
    {
        return Err(EntityError::AlreadyExists {
            entity_type: "wishlist".to_string(),
            key: format!("{}:{}", request.item_type.as_str(), request.item_id),
        }
        .into());
    }

    let entry = Wishlist::new(
        request.item_type.as_str().to_string(),
        ACTIVE.to_string(),
        user_id,
        request.item_type,
        request.item_id,
        request.notes,
    );
    let entry = state.stores.wishlists.create(entry).await?;
    Ok(ApiResponse::created(entry).with_message("Added to wishlist"))
}

pub async fn update_wishlist(
    State(state): State<AppState>,
    auth: AuthContext,
    PathId(id): PathId,
    ValidatedJson(request): ValidatedJson<UpdateWishlistRequest>,
) -> DerlgResult<ApiResponse<Wishlist>> {
    let mut entry = own_entry(&state, &auth, id).await?;
    entry.notes = request.notes;
    entry.touch();
    Ok(ApiResponse::ok(state.stores.wishlists.update(&id, entry).await?))
}

pub async fn remove_from_wishlist(
    State(state): State<AppState>,
    auth: AuthContext,
    PathId(id): PathId,
) -> DerlgResult<StatusCode> {
    own_entry(&state, &auth, id).await?;
    state.stores.wishlists.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::core::auth::Role;
    use crate::entities::hotel::model::fixtures::hotel;

    fn save(item_type: ItemType, item_id: Uuid) -> ValidatedJson<AddWishlistRequest> {
        ValidatedJson(AddWishlistRequest {
            item_type,
            item_id,
            notes: Some("anniversary trip".to_string()),
        })
    }

    #[tokio::test]
    async fn test_item_can_be_saved_once() {
        let state = AppState::in_memory(AppConfig::default());
        let hotel = state.stores.hotels.create(hotel(Uuid::new_v4(), "Kampot")).await.unwrap();
        let tourist = AuthContext::user(Uuid::new_v4(), Role::Tourist);

        add_to_wishlist(State(state.clone()), tourist.clone(), save(ItemType::Hotel, hotel.id))
            .await
            .unwrap();
        let err = add_to_wishlist(State(state.clone()), tourist.clone(), save(ItemType::Hotel, hotel.id))
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "RES_3002");

        let page = list_wishlist(State(state), tourist, Query(WishlistQuery::default()))
            .await
            .unwrap();
        assert_eq!(page.data.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_items_are_rejected() {
        let state = AppState::in_memory(AppConfig::default());
        let tourist = AuthContext::user(Uuid::new_v4(), Role::Tourist);
        let err = add_to_wishlist(State(state), tourist, save(ItemType::Tour, Uuid::new_v4()))
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "RES_3001");
    }

    #[tokio::test]
    async fn test_only_owner_can_remove() {
        let state = AppState::in_memory(AppConfig::default());
        let hotel = state.stores.hotels.create(hotel(Uuid::new_v4(), "Kep")).await.unwrap();
        let owner = AuthContext::user(Uuid::new_v4(), Role::Tourist);
        let entry = add_to_wishlist(State(state.clone()), owner.clone(), save(ItemType::Hotel, hotel.id))
            .await
            .unwrap()
            .data;

        let stranger = AuthContext::user(Uuid::new_v4(), Role::Tourist);
        let err = remove_from_wishlist(State(state.clone()), stranger, PathId(entry.id))
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "AUTH_1006");

        let status = remove_from_wishlist(State(state), owner, PathId(entry.id)).await.unwrap();
        assert_eq!(status, StatusCode::NO_CONTENT);
    }
}

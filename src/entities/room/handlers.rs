//! Room management by the owning hotel admin

use super::model::Room;
use crate::app::AppState;
use crate::core::auth::AuthContext;
use crate::core::error::{BookingError, DerlgResult};
use crate::core::events::EntityEvent;
use crate::core::extractors::PathId;
use crate::core::response::ApiResponse;
use crate::core::service::find_or_404;
use crate::core::validation::ValidatedJson;
use crate::entities::hotel::access::{ensure_hotel_staff, hotel_of_admin};
use axum::extract::State;
use axum::http::StatusCode;
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

fn one() -> u32 {
    1
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateRoomRequest {
    #[validate(length(min = 1, max = 100))]
    pub room_type: String,
    #[validate(length(min = 1))]
    pub description: String,
    #[validate(range(min = 1, max = 20))]
    pub capacity: u32,
    #[validate(length(min = 1, max = 50))]
    pub bed_type: String,
    #[validate(range(min = 1.0))]
    pub size_sqm: Option<f64>,
    #[validate(range(exclusive_min = 0.0))]
    pub price_per_night: f64,
    #[serde(default)]
    #[validate(range(min = 0.0, max = 100.0))]
    pub discount_percentage: f64,
    #[serde(default)]
    pub amenities: Vec<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default = "one")]
    #[validate(range(min = 1))]
    pub total_rooms: u32,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateRoomRequest {
    #[validate(length(min = 1, max = 100))]
    pub room_type: Option<String>,
    #[validate(length(min = 1))]
    pub description: Option<String>,
    #[validate(range(min = 1, max = 20))]
    pub capacity: Option<u32>,
    #[validate(length(min = 1, max = 50))]
    pub bed_type: Option<String>,
    #[validate(range(min = 1.0))]
    pub size_sqm: Option<f64>,
    #[validate(range(exclusive_min = 0.0))]
    pub price_per_night: Option<f64>,
    #[validate(range(min = 0.0, max = 100.0))]
    pub discount_percentage: Option<f64>,
    pub amenities: Option<Vec<String>>,
    pub images: Option<Vec<String>>,
    #[validate(range(min = 1))]
    pub total_rooms: Option<u32>,
    pub is_active: Option<bool>,
}

impl UpdateRoomRequest {
    fn apply(self, room: &mut Room) {
        if let Some(room_type) = self.room_type {
            room.room_type = room_type;
        }
        if let Some(description) = self.description {
            room.description = description;
        }
        if let Some(capacity) = self.capacity {
            room.capacity = capacity;
        }
        if let Some(bed_type) = self.bed_type {
            room.bed_type = bed_type;
        }
        if self.size_sqm.is_some() {
            room.size_sqm = self.size_sqm;
        }
        if let Some(price) = self.price_per_night {
            room.price_per_night = price;
        }
        if let Some(discount) = self.discount_percentage {
            room.discount_percentage = discount;
        }
        if let Some(amenities) = self.amenities {
            room.amenities = amenities;
        }
        if let Some(images) = self.images {
            room.images = images;
        }
        if let Some(total) = self.total_rooms {
            room.total_rooms = total;
        }
        if let Some(active) = self.is_active {
            room.is_active = active;
        }
        room.touch();
    }
}

/// Every live room of the caller's hotel, active or not
pub async fn list_rooms(State(state): State<AppState>, auth: AuthContext) -> DerlgResult<ApiResponse<Vec<Room>>> {
    let hotel = hotel_of_admin(state.stores.hotels.as_ref(), &auth).await?;
    let mut rooms: Vec<Room> = state
        .stores
        .rooms
        .search("hotel_id", &hotel.id.to_string())
        .await?
        .into_iter()
        .filter(|r| r.deleted_at.is_none())
        .collect();
    rooms.sort_by(|a, b| a.room_type.cmp(&b.room_type));
    Ok(ApiResponse::ok(rooms))
}

pub async fn create_room(
    State(state): State<AppState>,
    auth: AuthContext,
    ValidatedJson(request): ValidatedJson<CreateRoomRequest>,
) -> DerlgResult<ApiResponse<Room>> {
    let hotel = hotel_of_admin(state.stores.hotels.as_ref(), &auth).await?;
    let now = Utc::now();
    let room = Room {
        id: Uuid::new_v4(),
        entity_type: "room".to_string(),
        created_at: now,
        updated_at: now,
        deleted_at: None,
        hotel_id: hotel.id,
        room_type: request.room_type,
        description: request.description,
        capacity: request.capacity,
        bed_type: request.bed_type,
        size_sqm: request.size_sqm,
        price_per_night: request.price_per_night,
        discount_percentage: request.discount_percentage,
        amenities: request.amenities,
        images: request.images,
        total_rooms: request.total_rooms,
        is_active: true,
    };
    let room = state.stores.rooms.create(room).await?;

    tracing::info!(room = %room.id, hotel = %hotel.id, "room created");
    state.events.publish(EntityEvent::Created {
        entity_type: "room".to_string(),
        entity_id: room.id,
        recipient_id: None,
    });
    Ok(ApiResponse::created(room).with_message("Room created successfully"))
}

pub async fn update_room(
    State(state): State<AppState>,
    auth: AuthContext,
    PathId(id): PathId,
    ValidatedJson(request): ValidatedJson<UpdateRoomRequest>,
) -> DerlgResult<ApiResponse<Room>> {
    let mut room = find_or_404(state.stores.rooms.as_ref(), &id).await?;
    ensure_hotel_staff(state.stores.hotels.as_ref(), &auth, room.hotel_id).await?;

    request.apply(&mut room);
    let room = state.stores.rooms.update(&id, room).await?;
    state.events.publish(EntityEvent::Updated {
        entity_type: "room".to_string(),
        entity_id: id,
        recipient_id: None,
    });
    Ok(ApiResponse::ok(room).with_message("Room updated successfully"))
}

/// Soft delete, refused while pending or confirmed stays hold the room
pub async fn delete_room(
    State(state): State<AppState>,
    auth: AuthContext,
    PathId(id): PathId,
) -> DerlgResult<StatusCode> {
    let mut room = find_or_404(state.stores.rooms.as_ref(), &id).await?;
    ensure_hotel_staff(state.stores.hotels.as_ref(), &auth, room.hotel_id).await?;

    let in_use = state
        .stores
        .bookings
        .search("room_id", &id.to_string())
        .await?
        .iter()
        .any(|b| b.status.occupies_room());
    if in_use {
        return Err(BookingError::RoomInUse { room_id: id }.into());
    }

    room.deleted_at = Some(Utc::now());
    room.is_active = false;
    room.touch();
    state.stores.rooms.update(&id, room).await?;

    tracing::info!(room = %id, actor = %auth.actor(), "room deleted");
    state.events.publish(EntityEvent::Deleted {
        entity_type: "room".to_string(),
        entity_id: id,
    });
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::core::auth::Role;
    use crate::entities::hotel::model::fixtures::hotel;

    fn create_request() -> CreateRoomRequest {
        CreateRoomRequest {
            room_type: "Garden Twin".to_string(),
            description: "Two singles facing the garden".to_string(),
            capacity: 2,
            bed_type: "twin".to_string(),
            size_sqm: None,
            price_per_night: 35.0,
            discount_percentage: 0.0,
            amenities: Vec::new(),
            images: Vec::new(),
            total_rooms: 4,
        }
    }

    #[tokio::test]
    async fn test_room_management_is_tenant_scoped() {
        let state = AppState::in_memory(AppConfig::default());
        let admin_id = Uuid::new_v4();
        state.stores.hotels.create(hotel(admin_id, "Kampot")).await.unwrap();
        let owner = AuthContext::user(admin_id, Role::Admin);

        let created = create_room(State(state.clone()), owner.clone(), ValidatedJson(create_request()))
            .await
            .unwrap()
            .data;

        let stranger = AuthContext::user(Uuid::new_v4(), Role::Admin);
        let err = update_room(
            State(state.clone()),
            stranger,
            PathId(created.id),
            ValidatedJson(UpdateRoomRequest::default()),
        )
        .await
        .unwrap_err();
        assert_eq!(err.error_code(), "AUTH_1006");

        let updated = update_room(
            State(state.clone()),
            owner.clone(),
            PathId(created.id),
            ValidatedJson(UpdateRoomRequest {
                price_per_night: Some(40.0),
                ..Default::default()
            }),
        )
        .await
        .unwrap()
        .data;
        assert_eq!(updated.price_per_night, 40.0);
        assert_eq!(updated.total_rooms, 4);

        let status = delete_room(State(state.clone()), owner.clone(), PathId(created.id))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(list_rooms(State(state), owner).await.unwrap().data.is_empty());
    }

    #[test]
    fn test_price_must_be_positive() {
        let mut request = create_request();
        request.price_per_night = 0.0;
        assert!(request.validate().is_err());
        request.price_per_night = 10.0;
        request.discount_percentage = 120.0;
        assert!(request.validate().is_err());
    }
}

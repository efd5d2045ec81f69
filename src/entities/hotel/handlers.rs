//! Hotel search, detail, availability and the hotel-admin profile

use super::access::{hotel_of_admin, is_admin_of};
use super::model::{Contact, Hotel, HotelStatus, Location};
use crate::app::AppState;
use crate::booking::service::RoomAvailability;
use crate::core::auth::{AuthContext, AuthPolicy, Role};
use crate::core::error::{DerlgResult, EntityError, ValidationError};
use crate::core::events::EntityEvent;
use crate::core::extractors::PathId;
use crate::core::query::{PaginatedResponse, QueryParams};
use crate::core::response::ApiResponse;
use crate::core::service::{find_or_404, DataService};
use crate::core::validation::ValidatedJson;
use crate::entities::room::Room;
use axum::extract::{Query, State};
use axum::Json;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum HotelSort {
    /// Cheapest starting price first
    Price,
    PriceDesc,
    #[default]
    Rating,
    /// Most reviewed first
    Popularity,
    Name,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct HotelSearchQuery {
    /// Matched against city or province
    pub destination: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub min_stars: Option<u8>,
    pub min_rating: Option<f64>,
    /// Comma separated; every listed amenity must be present
    pub amenities: Option<String>,
    pub guests: Option<u32>,
    pub sort_by: HotelSort,
    pub page: Option<usize>,
    pub limit: Option<usize>,
}

impl HotelSearchQuery {
    fn params(&self) -> QueryParams {
        let defaults = QueryParams::default();
        QueryParams::new(self.page.unwrap_or(defaults.page), self.limit.unwrap_or(defaults.limit))
    }

    fn amenity_list(&self) -> Vec<String> {
        self.amenities
            .as_deref()
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|a| !a.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Whether a room passes the price and party-size filters
    fn room_fits(&self, room: &Room) -> bool {
        let rate = room.discounted_rate();
        self.min_price.is_none_or(|min| rate >= min)
            && self.max_price.is_none_or(|max| rate <= max)
            && self.guests.is_none_or(|guests| room.capacity >= guests)
    }

    fn filters_rooms(&self) -> bool {
        self.min_price.is_some() || self.max_price.is_some() || self.guests.is_some()
    }
}

/// A search hit: the hotel and its cheapest matching nightly rate
#[derive(Debug, Clone, Serialize)]
pub struct HotelSummary {
    #[serde(flatten)]
    pub hotel: Hotel,
    pub starting_price: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HotelDetail {
    #[serde(flatten)]
    pub hotel: Hotel,
    pub rooms: Vec<Room>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AvailabilityQuery {
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
}

#[derive(Debug, Clone, Serialize)]
pub struct HotelAvailability {
    pub hotel_id: Uuid,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub rooms: Vec<RoomAvailability>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateHotelRequest {
    /// Required when a super admin creates the hotel on someone's behalf
    pub admin_id: Option<Uuid>,
    #[validate(length(min = 2, max = 255))]
    pub name: String,
    #[validate(length(min = 10))]
    pub description: String,
    #[validate(nested)]
    pub location: Location,
    #[validate(nested)]
    pub contact: Contact,
    #[serde(default)]
    pub amenities: Vec<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[validate(range(min = 1, max = 5))]
    pub star_rating: u8,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateHotelRequest {
    #[validate(length(min = 2, max = 255))]
    pub name: Option<String>,
    #[validate(length(min = 10))]
    pub description: Option<String>,
    #[validate(nested)]
    pub location: Option<Location>,
    #[validate(nested)]
    pub contact: Option<Contact>,
    pub amenities: Option<Vec<String>>,
    pub images: Option<Vec<String>>,
    #[validate(range(min = 1, max = 5))]
    pub star_rating: Option<u8>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct HotelStatusRequest {
    pub status: HotelStatus,
    #[validate(length(max = 500))]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AdminHotelQuery {
    pub status: Option<HotelStatus>,
    pub page: Option<usize>,
    pub limit: Option<usize>,
}

/// Bookable rooms grouped by hotel
async fn rooms_by_hotel(rooms: &dyn DataService<Room>) -> DerlgResult<HashMap<Uuid, Vec<Room>>> {
    let mut grouped: HashMap<Uuid, Vec<Room>> = HashMap::new();
    for room in rooms.list().await?.into_iter().filter(Room::is_bookable) {
        grouped.entry(room.hotel_id).or_default().push(room);
    }
    Ok(grouped)
}

/// Filter, sort and page active hotels
pub fn search(
    hotels: Vec<Hotel>,
    rooms: &HashMap<Uuid, Vec<Room>>,
    query: &HotelSearchQuery,
) -> PaginatedResponse<HotelSummary> {
    let amenities = query.amenity_list();
    let mut hits: Vec<HotelSummary> = hotels
        .into_iter()
        .filter(Hotel::is_bookable)
        .filter(|h| query.destination.as_deref().is_none_or(|d| h.is_in(d)))
        .filter(|h| query.min_stars.is_none_or(|stars| h.star_rating >= stars))
        .filter(|h| query.min_rating.is_none_or(|rating| h.average_rating >= rating))
        .filter(|h| h.has_amenities(&amenities))
        .filter_map(|hotel| {
            let matching: Vec<&Room> = rooms
                .get(&hotel.id)
                .map(|list| list.iter().filter(|r| query.room_fits(r)).collect())
                .unwrap_or_default();
            if query.filters_rooms() && matching.is_empty() {
                return None;
            }
            let starting_price = matching.iter().map(|r| r.discounted_rate()).min_by(f64::total_cmp);
            Some(HotelSummary { hotel, starting_price })
        })
        .collect();

    match query.sort_by {
        HotelSort::Price => hits.sort_by(|a, b| cmp_price(a.starting_price, b.starting_price)),
        HotelSort::PriceDesc => hits.sort_by(|a, b| cmp_price(b.starting_price, a.starting_price)),
        HotelSort::Rating => hits.sort_by(|a, b| {
            b.hotel
                .average_rating
                .total_cmp(&a.hotel.average_rating)
                .then(b.hotel.total_reviews.cmp(&a.hotel.total_reviews))
        }),
        HotelSort::Popularity => hits.sort_by(|a, b| b.hotel.total_reviews.cmp(&a.hotel.total_reviews)),
        HotelSort::Name => hits.sort_by(|a, b| a.hotel.name.to_lowercase().cmp(&b.hotel.name.to_lowercase())),
    }
    PaginatedResponse::from_items(hits, &query.params())
}

/// Hotels without a priced room sort last either way
fn cmp_price(a: Option<f64>, b: Option<f64>) -> std::cmp::Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    }
}

pub async fn search_hotels(
    State(state): State<AppState>,
    Query(query): Query<HotelSearchQuery>,
) -> DerlgResult<Json<PaginatedResponse<HotelSummary>>> {
    let hotels = state.stores.hotels.list().await?;
    let rooms = rooms_by_hotel(state.stores.rooms.as_ref()).await?;
    Ok(Json(search(hotels, &rooms, &query)))
}

/// Active hotels are public; staff can also see their own pending hotel
pub async fn get_hotel(
    State(state): State<AppState>,
    auth: AuthContext,
    PathId(id): PathId,
) -> DerlgResult<ApiResponse<HotelDetail>> {
    let hotel = find_or_404(state.stores.hotels.as_ref(), &id).await?;
    if !hotel.is_bookable() && !(auth.is_system() || is_admin_of(&auth, &hotel)) {
        return Err(EntityError::not_found("hotel", id).into());
    }

    let mut rooms: Vec<Room> = state
        .stores
        .rooms
        .search("hotel_id", &id.to_string())
        .await?
        .into_iter()
        .filter(Room::is_bookable)
        .collect();
    rooms.sort_by(|a, b| a.price_per_night.total_cmp(&b.price_per_night));
    Ok(ApiResponse::ok(HotelDetail { hotel, rooms }))
}

pub async fn hotel_availability(
    State(state): State<AppState>,
    PathId(id): PathId,
    Query(query): Query<AvailabilityQuery>,
) -> DerlgResult<ApiResponse<HotelAvailability>> {
    let rooms = state.bookings.availability(id, query.check_in, query.check_out).await?;
    Ok(ApiResponse::ok(HotelAvailability {
        hotel_id: id,
        check_in: query.check_in,
        check_out: query.check_out,
        rooms,
    }))
}

pub async fn get_profile(State(state): State<AppState>, auth: AuthContext) -> DerlgResult<ApiResponse<Hotel>> {
    Ok(ApiResponse::ok(hotel_of_admin(state.stores.hotels.as_ref(), &auth).await?))
}

pub async fn update_profile(
    State(state): State<AppState>,
    auth: AuthContext,
    ValidatedJson(request): ValidatedJson<UpdateHotelRequest>,
) -> DerlgResult<ApiResponse<Hotel>> {
    let mut hotel = hotel_of_admin(state.stores.hotels.as_ref(), &auth).await?;
    apply_update(&mut hotel, request);
    let hotel_id = hotel.id;
    let hotel = state.stores.hotels.update(&hotel_id, hotel).await?;

    state.events.publish(EntityEvent::Updated {
        entity_type: "hotel".to_string(),
        entity_id: hotel.id,
        recipient_id: Some(hotel.admin_id),
    });
    Ok(ApiResponse::ok(hotel).with_message("Hotel profile updated successfully"))
}

fn apply_update(hotel: &mut Hotel, request: UpdateHotelRequest) {
    if let Some(name) = request.name {
        hotel.name = name.trim().to_string();
    }
    if let Some(description) = request.description {
        hotel.description = description;
    }
    if let Some(location) = request.location {
        hotel.location = location;
    }
    if let Some(contact) = request.contact {
        hotel.contact = contact;
    }
    if let Some(amenities) = request.amenities {
        hotel.amenities = amenities;
    }
    if let Some(images) = request.images {
        hotel.images = images;
    }
    if let Some(stars) = request.star_rating {
        hotel.star_rating = stars;
    }
    hotel.touch();
}

/// Register a hotel
///
/// A hotel admin registers their own hotel, which waits for approval. A
/// super admin registers one for `admin_id` and it is active immediately.
pub async fn create_hotel(
    State(state): State<AppState>,
    auth: AuthContext,
    ValidatedJson(request): ValidatedJson<CreateHotelRequest>,
) -> DerlgResult<ApiResponse<Hotel>> {
    AuthPolicy::staff().enforce(&auth)?;
    let (admin_id, status) = if auth.is_super_admin() {
        let admin_id = request
            .admin_id
            .ok_or_else(|| ValidationError::field("admin_id", "required when registering for another admin"))?;
        (admin_id, HotelStatus::Active)
    } else {
        (auth.require_user()?, HotelStatus::PendingApproval)
    };

    let existing = state.stores.hotels.search("admin_id", &admin_id.to_string()).await?;
    if existing.iter().any(|h| h.deleted_at.is_none()) {
        return Err(EntityError::AlreadyExists {
            entity_type: "hotel".to_string(),
            key: format!("admin {}", admin_id),
        }
        .into());
    }

    let now = Utc::now();
    let hotel = Hotel {
        id: Uuid::new_v4(),
        entity_type: "hotel".to_string(),
        created_at: now,
        updated_at: now,
        deleted_at: None,
        admin_id,
        name: request.name.trim().to_string(),
        description: request.description,
        location: request.location,
        contact: request.contact,
        amenities: request.amenities,
        images: request.images,
        star_rating: request.star_rating,
        average_rating: 0.0,
        total_reviews: 0,
        approval_date: (status == HotelStatus::Active).then_some(now),
        status,
    };
    let hotel = state.stores.hotels.create(hotel).await?;

    tracing::info!(hotel = %hotel.id, admin = %admin_id, status = hotel.status.as_str(), "hotel registered");
    state.events.publish(EntityEvent::Created {
        entity_type: "hotel".to_string(),
        entity_id: hotel.id,
        recipient_id: Some(admin_id),
    });
    Ok(ApiResponse::created(hotel))
}

/// Every hotel regardless of status, for super admins
pub async fn list_all_hotels(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(query): Query<AdminHotelQuery>,
) -> DerlgResult<Json<PaginatedResponse<Hotel>>> {
    AuthPolicy::AdminOnly.enforce(&auth)?;
    let mut hotels: Vec<Hotel> = state
        .stores
        .hotels
        .list()
        .await?
        .into_iter()
        .filter(|h| h.deleted_at.is_none())
        .filter(|h| query.status.is_none_or(|s| h.status == s))
        .collect();
    hotels.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let defaults = QueryParams::default();
    let params = QueryParams::new(query.page.unwrap_or(defaults.page), query.limit.unwrap_or(defaults.limit));
    Ok(Json(PaginatedResponse::from_items(hotels, &params)))
}

/// Approve, reject, suspend or reactivate a hotel
pub async fn set_hotel_status(
    State(state): State<AppState>,
    auth: AuthContext,
    PathId(id): PathId,
    ValidatedJson(request): ValidatedJson<HotelStatusRequest>,
) -> DerlgResult<ApiResponse<Hotel>> {
    AuthPolicy::HasRole(vec![Role::SuperAdmin]).enforce(&auth)?;
    let mut hotel = find_or_404(state.stores.hotels.as_ref(), &id).await?;
    if request.status == HotelStatus::PendingApproval {
        return Err(ValidationError::field("status", "a hotel cannot be moved back to pending approval").into());
    }

    if request.status == HotelStatus::Active && hotel.approval_date.is_none() {
        hotel.approval_date = Some(Utc::now());
    }
    hotel.status = request.status;
    hotel.touch();
    let hotel = state.stores.hotels.update(&id, hotel).await?;

    tracing::info!(
        hotel = %id,
        status = hotel.status.as_str(),
        reason = request.reason.as_deref().unwrap_or(""),
        actor = %auth.actor(),
        "hotel status changed"
    );
    state.events.publish(EntityEvent::Updated {
        entity_type: "hotel".to_string(),
        entity_id: id,
        recipient_id: Some(hotel.admin_id),
    });
    Ok(ApiResponse::ok(hotel))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::hotel::model::fixtures;
    use crate::entities::room::model::fixtures::room;

    fn catalog() -> (Vec<Hotel>, HashMap<Uuid, Vec<Room>>) {
        let mut kep = fixtures::hotel(Uuid::new_v4(), "Kep");
        kep.name = "Kep Lodge".to_string();
        kep.average_rating = 4.8;
        kep.total_reviews = 12;

        let mut siem_reap = fixtures::hotel(Uuid::new_v4(), "Siem Reap");
        siem_reap.average_rating = 4.1;
        siem_reap.total_reviews = 40;
        siem_reap.amenities.push("spa".to_string());

        let mut pending = fixtures::hotel(Uuid::new_v4(), "Kep");
        pending.status = HotelStatus::PendingApproval;

        let mut rooms = HashMap::new();
        rooms.insert(kep.id, vec![room(kep.id, 45.0, 2)]);
        let mut suite = room(siem_reap.id, 120.0, 1);
        suite.capacity = 4;
        rooms.insert(siem_reap.id, vec![room(siem_reap.id, 60.0, 5), suite]);

        (vec![kep, siem_reap, pending], rooms)
    }

    #[test]
    fn test_search_hides_unapproved_hotels() {
        let (hotels, rooms) = catalog();
        let page = search(hotels, &rooms, &HotelSearchQuery::default());
        assert_eq!(page.pagination.total, 2);
        assert_eq!(page.data[0].hotel.name, "Kep Lodge");
    }

    #[test]
    fn test_search_filters() {
        let (hotels, rooms) = catalog();
        let query = HotelSearchQuery {
            destination: Some("siem".to_string()),
            amenities: Some("spa, wifi".to_string()),
            ..Default::default()
        };
        assert_eq!(search(hotels.clone(), &rooms, &query).pagination.total, 1);

        let query = HotelSearchQuery {
            guests: Some(3),
            ..Default::default()
        };
        let page = search(hotels.clone(), &rooms, &query);
        assert_eq!(page.pagination.total, 1);
        assert_eq!(page.data[0].starting_price, Some(120.0));

        let query = HotelSearchQuery {
            max_price: Some(50.0),
            ..Default::default()
        };
        assert_eq!(search(hotels, &rooms, &query).data[0].hotel.name, "Kep Lodge");
    }

    #[test]
    fn test_search_sorting() {
        let (hotels, rooms) = catalog();
        let by = |sort_by| {
            search(hotels.clone(), &rooms, &HotelSearchQuery { sort_by, ..Default::default() })
                .data
                .into_iter()
                .map(|h| h.starting_price)
                .collect::<Vec<_>>()
        };
        assert_eq!(by(HotelSort::Price), vec![Some(45.0), Some(60.0)]);
        assert_eq!(by(HotelSort::PriceDesc), vec![Some(60.0), Some(45.0)]);
        assert_eq!(by(HotelSort::Popularity), vec![Some(60.0), Some(45.0)]);
    }

    #[test]
    fn test_update_touches_only_given_fields() {
        let mut hotel = fixtures::hotel(Uuid::new_v4(), "Kampot");
        let before = hotel.name.clone();
        apply_update(
            &mut hotel,
            UpdateHotelRequest {
                star_rating: Some(5),
                ..Default::default()
            },
        );
        assert_eq!(hotel.star_rating, 5);
        assert_eq!(hotel.name, before);
    }
}

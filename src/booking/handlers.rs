//! Booking HTTP handlers

use super::model::BookingView;
use super::service::{
    ApplyPromoRequest, BookingListQuery, CancelRequest, CancelledBooking, CreateBookingRequest, CreatedBooking,
    DateRangeQuery, Occupancy, PromoApplied, QuoteRequest, RejectRequest, StayQuote, UpdateBookingRequest,
    UpdatedBooking,
};
use crate::app::AppState;
use crate::core::auth::AuthContext;
use crate::core::error::DerlgResult;
use crate::core::extractors::PathId;
use crate::core::query::PaginatedResponse;
use crate::core::response::ApiResponse;
use crate::core::validation::ValidatedJson;
use crate::entities::hotel::access::hotel_of_admin;
use axum::extract::{Query, State};
use axum::Json;

pub async fn create_booking(
    State(state): State<AppState>,
    auth: AuthContext,
    ValidatedJson(request): ValidatedJson<CreateBookingRequest>,
) -> DerlgResult<ApiResponse<CreatedBooking>> {
    let created = state.bookings.create(&auth, request).await?;
    Ok(ApiResponse::created(created).with_message("Booking created successfully"))
}

pub async fn quote_booking(
    State(state): State<AppState>,
    auth: AuthContext,
    ValidatedJson(request): ValidatedJson<QuoteRequest>,
) -> DerlgResult<ApiResponse<StayQuote>> {
    Ok(ApiResponse::ok(state.bookings.quote_options(&auth, request).await?))
}

pub async fn list_my_bookings(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(query): Query<BookingListQuery>,
) -> DerlgResult<Json<PaginatedResponse<BookingView>>> {
    Ok(Json(state.bookings.list_mine(&auth, &query).await?))
}

pub async fn get_booking(
    State(state): State<AppState>,
    auth: AuthContext,
    PathId(id): PathId,
) -> DerlgResult<ApiResponse<BookingView>> {
    Ok(ApiResponse::ok(state.bookings.get(&auth, id).await?))
}

pub async fn update_booking(
    State(state): State<AppState>,
    auth: AuthContext,
    PathId(id): PathId,
    ValidatedJson(request): ValidatedJson<UpdateBookingRequest>,
) -> DerlgResult<ApiResponse<UpdatedBooking>> {
    let updated = state.bookings.update(&auth, id, request).await?;
    Ok(ApiResponse::ok(updated).with_message("Booking updated successfully"))
}

pub async fn cancel_booking(
    State(state): State<AppState>,
    auth: AuthContext,
    PathId(id): PathId,
    ValidatedJson(request): ValidatedJson<CancelRequest>,
) -> DerlgResult<ApiResponse<CancelledBooking>> {
    let cancelled = state.bookings.cancel(&auth, id, request).await?;
    Ok(ApiResponse::ok(cancelled).with_message("Booking cancelled successfully"))
}

pub async fn apply_promo_code(
    State(state): State<AppState>,
    auth: AuthContext,
    PathId(id): PathId,
    ValidatedJson(request): ValidatedJson<ApplyPromoRequest>,
) -> DerlgResult<ApiResponse<PromoApplied>> {
    let applied = state.bookings.apply_promo(&auth, id, request).await?;
    Ok(ApiResponse::ok(applied).with_message("Promo code applied successfully"))
}

pub async fn list_hotel_bookings(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(query): Query<BookingListQuery>,
) -> DerlgResult<Json<PaginatedResponse<BookingView>>> {
    Ok(Json(state.bookings.list_for_my_hotel(&auth, &query).await?))
}

/// Super-admin view of any hotel's bookings
pub async fn list_bookings_of_hotel(
    State(state): State<AppState>,
    auth: AuthContext,
    PathId(hotel_id): PathId,
    Query(query): Query<BookingListQuery>,
) -> DerlgResult<Json<PaginatedResponse<BookingView>>> {
    Ok(Json(state.bookings.list_for_hotel(&auth, hotel_id, &query).await?))
}

pub async fn hotel_occupancy(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(range): Query<DateRangeQuery>,
) -> DerlgResult<ApiResponse<Occupancy>> {
    let hotel = hotel_of_admin(state.stores.hotels.as_ref(), &auth).await?;
    Ok(ApiResponse::ok(state.bookings.occupancy(&auth, hotel.id, &range).await?))
}

pub async fn confirm_booking(
    State(state): State<AppState>,
    auth: AuthContext,
    PathId(id): PathId,
) -> DerlgResult<ApiResponse<BookingView>> {
    let booking = state.bookings.confirm(&auth, id).await?;
    Ok(ApiResponse::ok(booking).with_message("Booking confirmed"))
}

pub async fn reject_booking(
    State(state): State<AppState>,
    auth: AuthContext,
    PathId(id): PathId,
    ValidatedJson(request): ValidatedJson<RejectRequest>,
) -> DerlgResult<ApiResponse<BookingView>> {
    let booking = state.bookings.reject(&auth, id, request).await?;
    Ok(ApiResponse::ok(booking).with_message("Booking rejected"))
}

pub async fn complete_booking(
    State(state): State<AppState>,
    auth: AuthContext,
    PathId(id): PathId,
) -> DerlgResult<ApiResponse<BookingView>> {
    let booking = state.bookings.complete(&auth, id).await?;
    Ok(ApiResponse::ok(booking).with_message("Booking completed"))
}

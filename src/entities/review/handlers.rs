//! Guest reviews and the hotel rating they feed

use super::model::{headline, hotel_rating, Ratings, Review, PUBLISHED};
use crate::app::AppState;
use crate::booking::BookingStatus;
use crate::core::auth::AuthContext;
use crate::core::error::{AuthError, BookingError, DerlgResult, EntityError};
use crate::core::events::EntityEvent;
use crate::core::extractors::PathId;
use crate::core::query::{PaginatedResponse, QueryParams};
use crate::core::response::ApiResponse;
use crate::core::service::find_or_404;
use crate::core::validation::ValidatedJson;
use crate::entities::hotel::access::ensure_hotel_staff;
use crate::storage::Stores;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateReviewRequest {
    pub booking_id: Uuid,
    #[validate(nested)]
    pub ratings: Ratings,
    #[validate(length(min = 10, max = 5000))]
    pub comment: String,
    #[serde(default)]
    pub images: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateReviewRequest {
    #[validate(nested)]
    pub ratings: Option<Ratings>,
    #[validate(length(min = 10, max = 5000))]
    pub comment: Option<String>,
    pub images: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ReviewResponseRequest {
    #[validate(length(min = 1, max = 2000))]
    pub response: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReviewSort {
    #[default]
    Recent,
    Helpful,
    RatingHigh,
    RatingLow,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ReviewListQuery {
    pub sort_by: ReviewSort,
    pub page: Option<usize>,
    pub limit: Option<usize>,
}

impl ReviewListQuery {
    fn params(&self) -> QueryParams {
        let defaults = QueryParams::default();
        QueryParams::new(self.page.unwrap_or(defaults.page), self.limit.unwrap_or(defaults.limit))
    }
}

fn sort_reviews(reviews: &mut [Review], sort: ReviewSort) {
    match sort {
        ReviewSort::Recent => reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        ReviewSort::Helpful => reviews.sort_by(|a, b| {
            b.helpful_count
                .cmp(&a.helpful_count)
                .then(b.created_at.cmp(&a.created_at))
        }),
        ReviewSort::RatingHigh => reviews.sort_by(|a, b| b.ratings.overall.cmp(&a.ratings.overall)),
        ReviewSort::RatingLow => reviews.sort_by(|a, b| a.ratings.overall.cmp(&b.ratings.overall)),
    }
}

async fn live_reviews(stores: &Stores, field: &str, value: Uuid) -> DerlgResult<Vec<Review>> {
    Ok(stores
        .reviews
        .search(field, &value.to_string())
        .await?
        .into_iter()
        .filter(|r| r.deleted_at.is_none())
        .collect())
}

/// Store the hotel's average rating and review count
pub async fn refresh_hotel_rating(stores: &Stores, hotel_id: Uuid) -> DerlgResult<(f64, u32)> {
    let reviews = live_reviews(stores, "hotel_id", hotel_id).await?;
    let (average, total) = hotel_rating(&reviews);

    let mut hotel = find_or_404(stores.hotels.as_ref(), &hotel_id).await?;
    hotel.average_rating = average;
    hotel.total_reviews = total;
    hotel.touch();
    stores.hotels.update(&hotel_id, hotel).await?;
    Ok((average, total))
}

async fn own_review(stores: &Stores, auth: &AuthContext, id: Uuid) -> DerlgResult<Review> {
    let user_id = auth.require_user()?;
    let review = find_or_404(stores.reviews.as_ref(), &id).await?;
    if review.user_id != user_id && !auth.is_system() {
        return Err(AuthError::forbidden("only the author can change this review").into());
    }
    Ok(review)
}

/// Review a completed stay; one review per booking
pub async fn create_review(
    State(state): State<AppState>,
    auth: AuthContext,
    ValidatedJson(request): ValidatedJson<CreateReviewRequest>,
) -> DerlgResult<ApiResponse<Review>> {
    let user_id = auth.require_user()?;
    let booking = state
        .stores
        .bookings
        .get(&request.booking_id)
        .await?
        .ok_or(BookingError::NotFound { id: request.booking_id })?;
    if booking.user_id != user_id {
        return Err(AuthError::forbidden("you can only review your own bookings").into());
    }
    if booking.status != BookingStatus::Completed {
        return Err(BookingError::CannotBeModified {
            reason: "only completed stays can be reviewed".to_string(),
        }
        .into());
    }
    if !live_reviews(&state.stores, "booking_id", booking.id).await?.is_empty() {
        return Err(EntityError::AlreadyExists {
            entity_type: "review".to_string(),
            key: booking.booking_number.clone(),
        }
        .into());
    }

    let review = Review::new(
        headline(&request.comment),
        PUBLISHED.to_string(),
        user_id,
        booking.id,
        booking.hotel_id,
        request.ratings,
        request.comment,
        request.images,
        0,
        true,
        None,
    );
    let review = state.stores.reviews.create(review).await?;
    let (average, total) = refresh_hotel_rating(&state.stores, booking.hotel_id).await?;

    tracing::info!(review = %review.id, hotel = %booking.hotel_id, average, total, "review posted");
    state.events.publish(EntityEvent::Created {
        entity_type: "review".to_string(),
        entity_id: review.id,
        recipient_id: None,
    });
    Ok(ApiResponse::created(review).with_message("Review submitted successfully"))
}

pub async fn list_hotel_reviews(
    State(state): State<AppState>,
    PathId(hotel_id): PathId,
    Query(query): Query<ReviewListQuery>,
) -> DerlgResult<Json<PaginatedResponse<Review>>> {
    find_or_404(state.stores.hotels.as_ref(), &hotel_id).await?;
    let mut reviews = live_reviews(&state.stores, "hotel_id", hotel_id).await?;
    sort_reviews(&mut reviews, query.sort_by);
    Ok(Json(PaginatedResponse::from_items(reviews, &query.params())))
}

pub async fn list_my_reviews(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(query): Query<ReviewListQuery>,
) -> DerlgResult<Json<PaginatedResponse<Review>>> {
    let user_id = auth.require_user()?;
    let mut reviews = live_reviews(&state.stores, "user_id", user_id).await?;
    sort_reviews(&mut reviews, ReviewSort::Recent);
    Ok(Json(PaginatedResponse::from_items(reviews, &query.params())))
}

pub async fn update_review(
    State(state): State<AppState>,
    auth: AuthContext,
    PathId(id): PathId,
    ValidatedJson(request): ValidatedJson<UpdateReviewRequest>,
) -> DerlgResult<ApiResponse<Review>> {
    let mut review = own_review(&state.stores, &auth, id).await?;
    let rescored = request.ratings.is_some();

    if let Some(ratings) = request.ratings {
        review.ratings = ratings;
    }
    if let Some(comment) = request.comment {
        review.name = headline(&comment);
        review.comment = comment;
    }
    if let Some(images) = request.images {
        review.images = images;
    }
    review.touch();
    let review = state.stores.reviews.update(&id, review).await?;

    if rescored {
        refresh_hotel_rating(&state.stores, review.hotel_id).await?;
    }
    Ok(ApiResponse::ok(review).with_message("Review updated successfully"))
}

pub async fn delete_review(
    State(state): State<AppState>,
    auth: AuthContext,
    PathId(id): PathId,
) -> DerlgResult<StatusCode> {
    let mut review = own_review(&state.stores, &auth, id).await?;
    let hotel_id = review.hotel_id;
    review.soft_delete();
    state.stores.reviews.update(&id, review).await?;
    refresh_hotel_rating(&state.stores, hotel_id).await?;

    state.events.publish(EntityEvent::Deleted {
        entity_type: "review".to_string(),
        entity_id: id,
    });
    Ok(StatusCode::NO_CONTENT)
}

pub async fn mark_helpful(State(state): State<AppState>, PathId(id): PathId) -> DerlgResult<ApiResponse<Review>> {
    let mut review = find_or_404(state.stores.reviews.as_ref(), &id).await?;
    review.helpful_count += 1;
    review.touch();
    Ok(ApiResponse::ok(state.stores.reviews.update(&id, review).await?))
}

/// The hotel's public reply to a review
pub async fn respond_to_review(
    State(state): State<AppState>,
    auth: AuthContext,
    PathId(id): PathId,
    ValidatedJson(request): ValidatedJson<ReviewResponseRequest>,
) -> DerlgResult<ApiResponse<Review>> {
    let mut review = find_or_404(state.stores.reviews.as_ref(), &id).await?;
    ensure_hotel_staff(state.stores.hotels.as_ref(), &auth, review.hotel_id).await?;

    review.admin_response = Some(request.response);
    review.updated_at = Utc::now();
    let review = state.stores.reviews.update(&id, review).await?;
    state.events.publish(EntityEvent::Updated {
        entity_type: "review".to_string(),
        entity_id: id,
        recipient_id: Some(review.user_id),
    });
    Ok(ApiResponse::ok(review))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::booking::model::fixtures::booking;
    use crate::config::AppConfig;
    use crate::core::auth::Role;
    use crate::entities::hotel::model::fixtures::hotel;

    fn ratings(score: u8) -> Ratings {
        Ratings {
            overall: score,
            cleanliness: score,
            service: score,
            location: score,
            value: score,
        }
    }

    struct Stay {
        state: AppState,
        guest: AuthContext,
        hotel_id: Uuid,
        booking_id: Uuid,
    }

    async fn completed_stay(status: BookingStatus) -> Stay {
        let state = AppState::in_memory(AppConfig::default());
        let hotel = state.stores.hotels.create(hotel(Uuid::new_v4(), "Kep")).await.unwrap();
        let guest_id = Uuid::new_v4();

        let mut stay = booking(Utc::now().date_naive() - chrono::Duration::days(5), 2, 100.0);
        stay.user_id = guest_id;
        stay.hotel_id = hotel.id;
        stay.status = status;
        let stay = state.stores.bookings.create(stay).await.unwrap();

        Stay {
            state,
            guest: AuthContext::user(guest_id, Role::Tourist),
            hotel_id: hotel.id,
            booking_id: stay.id,
        }
    }

    fn review_request(booking_id: Uuid, score: u8) -> CreateReviewRequest {
        CreateReviewRequest {
            booking_id,
            ratings: ratings(score),
            comment: "Quiet rooms and a lovely breakfast.".to_string(),
            images: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_review_updates_hotel_rating_once_per_booking() {
        let stay = completed_stay(BookingStatus::Completed).await;

        create_review(
            State(stay.state.clone()),
            stay.guest.clone(),
            ValidatedJson(review_request(stay.booking_id, 4)),
        )
        .await
        .unwrap();
        let hotel = stay.state.stores.hotels.get(&stay.hotel_id).await.unwrap().unwrap();
        assert_eq!((hotel.average_rating, hotel.total_reviews), (4.0, 1));

        let err = create_review(
            State(stay.state.clone()),
            stay.guest,
            ValidatedJson(review_request(stay.booking_id, 5)),
        )
        .await
        .unwrap_err();
        assert_eq!(err.error_code(), "RES_3002");
    }

    #[tokio::test]
    async fn test_only_completed_own_stays_can_be_reviewed() {
        let stay = completed_stay(BookingStatus::Confirmed).await;
        let err = create_review(
            State(stay.state.clone()),
            stay.guest,
            ValidatedJson(review_request(stay.booking_id, 5)),
        )
        .await
        .unwrap_err();
        assert_eq!(err.error_code(), "BKG_7003");

        let stranger = AuthContext::user(Uuid::new_v4(), Role::Tourist);
        let err = create_review(State(stay.state), stranger, ValidatedJson(review_request(stay.booking_id, 5)))
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "AUTH_1006");
    }

    #[tokio::test]
    async fn test_delete_recomputes_rating() {
        let stay = completed_stay(BookingStatus::Completed).await;
        let review = create_review(
            State(stay.state.clone()),
            stay.guest.clone(),
            ValidatedJson(review_request(stay.booking_id, 3)),
        )
        .await
        .unwrap()
        .data;

        let helpful = mark_helpful(State(stay.state.clone()), PathId(review.id)).await.unwrap().data;
        assert_eq!(helpful.helpful_count, 1);

        delete_review(State(stay.state.clone()), stay.guest, PathId(review.id))
            .await
            .unwrap();
        let hotel = stay.state.stores.hotels.get(&stay.hotel_id).await.unwrap().unwrap();
        assert_eq!((hotel.average_rating, hotel.total_reviews), (0.0, 0));
    }

    #[test]
    fn test_sorting() {
        let make = |score: u8, helpful: u32| {
            Review::new(
                "r".to_string(),
                PUBLISHED.to_string(),
                Uuid::new_v4(),
                Uuid::new_v4(),
                Uuid::new_v4(),
                ratings(score),
                "comment".to_string(),
                Vec::new(),
                helpful,
                true,
                None,
            )
        };
        let mut reviews = vec![make(2, 9), make(5, 1), make(4, 3)];
        sort_reviews(&mut reviews, ReviewSort::RatingHigh);
        assert_eq!(reviews[0].ratings.overall, 5);
        sort_reviews(&mut reviews, ReviewSort::Helpful);
        assert_eq!(reviews[0].helpful_count, 9);
        sort_reviews(&mut reviews, ReviewSort::RatingLow);
        assert_eq!(reviews[0].ratings.overall, 2);
    }
}

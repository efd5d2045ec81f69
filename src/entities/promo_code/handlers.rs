//! Promo code administration and the eligibility preview

use super::model::{ApplicableTo, DiscountType, PromoAudience, PromoCode};
use crate::app::AppState;
use crate::booking::pricing::{promo_discount, round_cents};
use crate::core::auth::{AuthContext, AuthPolicy};
use crate::core::error::{DerlgResult, EntityError, ValidationError};
use crate::core::events::EntityEvent;
use crate::core::extractors::PathId;
use crate::core::query::{PaginatedResponse, QueryParams};
use crate::core::response::ApiResponse;
use crate::core::service::{find_or_404, DataService};
use crate::core::validation::{normalize_code, ValidatedJson, PROMO_CODE_RE};
use crate::entities::crud::{merge, query_records, CatalogResource};
use crate::storage::Stores;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

impl CatalogResource for PromoCode {
    fn store(stores: &Stores) -> Arc<dyn DataService<Self>> {
        stores.promo_codes.clone()
    }

    fn check(&self) -> Result<(), ValidationError> {
        if !PROMO_CODE_RE.is_match(&self.code) {
            return Err(ValidationError::field(
                "code",
                "3 to 50 upper-case letters, digits, dashes or underscores",
            ));
        }
        if self.discount_value <= 0.0 {
            return Err(ValidationError::field("discount_value", "must be positive"));
        }
        if self.discount_type == DiscountType::Percentage && self.discount_value > 100.0 {
            return Err(ValidationError::field("discount_value", "a percentage cannot exceed 100"));
        }
        if self.valid_until <= self.valid_from {
            return Err(ValidationError::field("valid_until", "must be after valid_from"));
        }
        if self.usage_limit == 0 {
            return Err(ValidationError::field("usage_limit", "must be at least 1"));
        }
        Ok(())
    }

    fn mark_deleted(&mut self) {
        self.is_active = false;
        self.deleted_at = Some(Utc::now());
        self.touch();
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreatePromoRequest {
    #[validate(length(min = 3, max = 50))]
    pub code: String,
    #[serde(default)]
    #[validate(length(max = 500))]
    pub description: String,
    pub discount_type: DiscountType,
    #[validate(range(exclusive_min = 0.0))]
    pub discount_value: f64,
    #[serde(default)]
    #[validate(range(min = 0.0))]
    pub min_booking_amount: f64,
    #[validate(range(exclusive_min = 0.0))]
    pub max_discount: Option<f64>,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    #[validate(range(min = 1))]
    pub usage_limit: u32,
    #[serde(default)]
    pub user_type: PromoAudience,
    #[serde(default)]
    pub applicable_to: ApplicableTo,
    #[serde(default)]
    pub applicable_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ValidatePromoRequest {
    #[validate(length(min = 1, max = 50))]
    pub code: String,
    pub hotel_id: Uuid,
    #[validate(range(exclusive_min = 0.0))]
    pub amount: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PromoPreview {
    pub code: String,
    pub description: String,
    pub discount_type: DiscountType,
    pub discount_value: f64,
    pub discount: f64,
    pub final_amount: f64,
}

async fn code_in_use(store: &dyn DataService<PromoCode>, code: &str, except: Option<Uuid>) -> DerlgResult<bool> {
    Ok(store
        .search("code", code)
        .await?
        .iter()
        .any(|p| p.deleted_at.is_none() && Some(p.id) != except))
}

fn duplicate(code: String) -> crate::core::error::DerlgError {
    EntityError::AlreadyExists {
        entity_type: "promo_code".to_string(),
        key: code,
    }
    .into()
}

pub async fn list_promo_codes(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(params): Query<QueryParams>,
) -> DerlgResult<Json<PaginatedResponse<PromoCode>>> {
    AuthPolicy::AdminOnly.enforce(&auth)?;
    Ok(Json(query_records(state.stores.promo_codes.as_ref(), &params).await?))
}

pub async fn get_promo_code(
    State(state): State<AppState>,
    auth: AuthContext,
    PathId(id): PathId,
) -> DerlgResult<ApiResponse<PromoCode>> {
    AuthPolicy::AdminOnly.enforce(&auth)?;
    Ok(ApiResponse::ok(find_or_404(state.stores.promo_codes.as_ref(), &id).await?))
}

pub async fn create_promo_code(
    State(state): State<AppState>,
    auth: AuthContext,
    ValidatedJson(request): ValidatedJson<CreatePromoRequest>,
) -> DerlgResult<ApiResponse<PromoCode>> {
    AuthPolicy::AdminOnly.enforce(&auth)?;
    let created_by = auth.require_user()?;

    let code = normalize_code(&request.code);
    if code_in_use(state.stores.promo_codes.as_ref(), &code, None).await? {
        return Err(duplicate(code));
    }

    let now = Utc::now();
    let promo = PromoCode {
        id: Uuid::new_v4(),
        entity_type: "promo_code".to_string(),
        created_at: now,
        updated_at: now,
        deleted_at: None,
        code,
        description: request.description,
        discount_type: request.discount_type,
        discount_value: request.discount_value,
        min_booking_amount: request.min_booking_amount,
        max_discount: request.max_discount,
        valid_from: request.valid_from,
        valid_until: request.valid_until,
        usage_limit: request.usage_limit,
        usage_count: 0,
        user_type: request.user_type,
        applicable_to: request.applicable_to,
        applicable_ids: request.applicable_ids,
        is_active: true,
        created_by,
    };
    promo.check()?;
    let promo = state.stores.promo_codes.create(promo).await?;

    tracing::info!(code = %promo.code, actor = %auth.actor(), "promo code created");
    state.events.publish(EntityEvent::Created {
        entity_type: "promo_code".to_string(),
        entity_id: promo.id,
        recipient_id: None,
    });
    Ok(ApiResponse::created(promo))
}

/// Merge the given fields; the usage counter and author stay server-owned
pub async fn update_promo_code(
    State(state): State<AppState>,
    auth: AuthContext,
    PathId(id): PathId,
    Json(mut payload): Json<Value>,
) -> DerlgResult<ApiResponse<PromoCode>> {
    AuthPolicy::AdminOnly.enforce(&auth)?;
    let existing = find_or_404(state.stores.promo_codes.as_ref(), &id).await?;

    if let Some(fields) = payload.as_object_mut() {
        fields.remove("usage_count");
        fields.remove("created_by");
        if let Some(code) = fields.get("code").and_then(Value::as_str).map(normalize_code) {
            if code != existing.code && code_in_use(state.stores.promo_codes.as_ref(), &code, Some(id)).await? {
                return Err(duplicate(code));
            }
            fields.insert("code".into(), Value::String(code));
        }
    }

    let promo = state.stores.promo_codes.update(&id, merge(&existing, payload)?).await?;
    state.events.publish(EntityEvent::Updated {
        entity_type: "promo_code".to_string(),
        entity_id: id,
        recipient_id: None,
    });
    Ok(ApiResponse::ok(promo))
}

pub async fn delete_promo_code(
    State(state): State<AppState>,
    auth: AuthContext,
    PathId(id): PathId,
) -> DerlgResult<StatusCode> {
    AuthPolicy::AdminOnly.enforce(&auth)?;
    let mut promo = find_or_404(state.stores.promo_codes.as_ref(), &id).await?;
    promo.mark_deleted();
    state.stores.promo_codes.update(&id, promo).await?;

    tracing::info!(promo = %id, actor = %auth.actor(), "promo code deleted");
    state.events.publish(EntityEvent::Deleted {
        entity_type: "promo_code".to_string(),
        entity_id: id,
    });
    Ok(StatusCode::NO_CONTENT)
}

/// What a code would take off `amount` at a hotel, without redeeming it
pub async fn validate_promo_code(
    State(state): State<AppState>,
    auth: AuthContext,
    ValidatedJson(request): ValidatedJson<ValidatePromoRequest>,
) -> DerlgResult<ApiResponse<PromoPreview>> {
    let user_id = auth.require_user()?;
    let hotel = find_or_404(state.stores.hotels.as_ref(), &request.hotel_id).await?;
    let promo = state
        .bookings
        .eligible_promo(&request.code, &hotel, user_id, request.amount, Utc::now())
        .await?;

    let discount = promo_discount(&promo, request.amount);
    Ok(ApiResponse::ok(PromoPreview {
        code: promo.code,
        description: promo.description,
        discount_type: promo.discount_type,
        discount_value: promo.discount_value,
        discount,
        final_amount: round_cents(request.amount - discount),
    }))
}

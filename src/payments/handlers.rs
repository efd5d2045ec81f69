//! Payment HTTP handlers

use super::model::PaymentTransaction;
use super::service::{
    ConfirmPaymentRequest, InitiatePaymentRequest, InitiatedPayment, PaymentSchedule, RefundOutcome,
    RefundRequest, WebhookEvent,
};
use crate::app::AppState;
use crate::core::auth::AuthContext;
use crate::core::error::DerlgResult;
use crate::core::extractors::PathId;
use crate::core::response::ApiResponse;
use crate::core::validation::ValidatedJson;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde_json::{json, Value};

/// Header carrying the shared webhook secret
pub const WEBHOOK_SECRET_HEADER: &str = "x-webhook-secret";

pub async fn initiate_payment(
    State(state): State<AppState>,
    auth: AuthContext,
    ValidatedJson(request): ValidatedJson<InitiatePaymentRequest>,
) -> DerlgResult<ApiResponse<InitiatedPayment>> {
    let mut started = state.payments.initiate(&auth, request).await?;
    started.transaction = started.transaction.to_safe_view();
    Ok(ApiResponse::created(started).with_message("Payment initiated"))
}

pub async fn confirm_payment(
    State(state): State<AppState>,
    auth: AuthContext,
    ValidatedJson(request): ValidatedJson<ConfirmPaymentRequest>,
) -> DerlgResult<ApiResponse<PaymentTransaction>> {
    let transaction = state.payments.confirm(&auth, &request.transaction_id).await?;
    Ok(ApiResponse::ok(transaction.to_safe_view()).with_message("Payment captured"))
}

pub async fn list_transactions(
    State(state): State<AppState>,
    auth: AuthContext,
    PathId(booking_id): PathId,
) -> DerlgResult<ApiResponse<Vec<PaymentTransaction>>> {
    let transactions = state.payments.transactions_for_booking(&auth, booking_id).await?;
    Ok(ApiResponse::ok(transactions))
}

pub async fn payment_schedule(
    State(state): State<AppState>,
    auth: AuthContext,
    PathId(booking_id): PathId,
) -> DerlgResult<ApiResponse<PaymentSchedule>> {
    Ok(ApiResponse::ok(state.payments.schedule(&auth, booking_id).await?))
}

pub async fn refund_booking(
    State(state): State<AppState>,
    auth: AuthContext,
    PathId(booking_id): PathId,
    ValidatedJson(request): ValidatedJson<RefundRequest>,
) -> DerlgResult<ApiResponse<RefundOutcome>> {
    let outcome = state.payments.refund(&auth, booking_id, request).await?;
    Ok(ApiResponse::ok(outcome).with_message("Refund issued"))
}

pub async fn release_escrow(
    State(state): State<AppState>,
    auth: AuthContext,
    PathId(booking_id): PathId,
) -> DerlgResult<ApiResponse<Value>> {
    let released = state.payments.release_escrow(&auth, booking_id).await?;
    Ok(ApiResponse::ok(json!({ "booking_id": booking_id, "released": released })))
}

/// Gateway callback; not behind user identity
pub async fn payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(event): Json<WebhookEvent>,
) -> DerlgResult<ApiResponse<Value>> {
    let secret = headers
        .get(WEBHOOK_SECRET_HEADER)
        .and_then(|value| value.to_str().ok());
    let transaction = state.payments.handle_webhook(secret, event).await?;
    Ok(ApiResponse::ok(json!({
        "transaction_id": transaction.transaction_id,
        "status": transaction.status,
    })))
}

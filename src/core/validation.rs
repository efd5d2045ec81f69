//! Request validation
//!
//! Request DTOs derive [`validator::Validate`]; handlers take them through
//! [`ValidatedJson`], which rejects malformed JSON and failed rules with the
//! standard error envelope before the handler runs.

use crate::core::error::{DerlgError, ValidationError};
use axum::Json;
use axum::extract::{FromRequest, Request};
use regex::Regex;
use serde::de::DeserializeOwned;
use std::sync::LazyLock;
use validator::Validate;

/// International phone number, optional leading `+`
pub static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[1-9]\d{7,14}$").unwrap());

/// Promo codes: upper-case letters, digits, dashes and underscores
pub static PROMO_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z0-9_-]{3,50}$").unwrap());

/// Axum extractor that deserializes and validates a JSON body
///
/// ```rust,ignore
/// pub async fn create_booking(
///     auth: AuthContext,
///     ValidatedJson(request): ValidatedJson<CreateBookingRequest>,
/// ) -> DerlgResult<impl IntoResponse> { ... }
/// ```
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = DerlgError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await.map_err(|e| {
            DerlgError::Validation(ValidationError::InvalidJson {
                message: e.body_text(),
            })
        })?;

        value.validate()?;
        Ok(ValidatedJson(value))
    }
}

/// Normalize a promo code the way it is stored: trimmed and upper-cased
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

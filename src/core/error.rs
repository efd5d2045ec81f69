//! Typed error handling for the platform API
//!
//! Every failure a handler can produce is a [`DerlgError`]. Each category
//! carries its own HTTP status and a stable error code that clients match on,
//! and the whole hierarchy renders into the standard error envelope:
//!
//! ```json
//! {
//!   "success": false,
//!   "error": {
//!     "code": "BKG_7005",
//!     "message": "Room is not available for the selected dates",
//!     "details": { "room_id": "..." },
//!     "timestamp": "2025-01-01T00:00:00Z"
//!   }
//! }
//! ```
//!
//! # Error Categories
//!
//! - [`EntityError`]: generic lookups and uniqueness
//! - [`BookingError`]: dates, availability, lifecycle transitions
//! - [`PaymentError`]: installments, escrow, gateway outcomes
//! - [`PromoError`]: promo code eligibility
//! - [`ValidationError`]: malformed input
//! - [`AuthError`]: missing identity or insufficient rights
//! - [`ConfigError`] / [`StorageError`]: server-side faults

use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// The main error type of the API
#[derive(Debug)]
pub enum DerlgError {
    /// Generic entity lookups and uniqueness
    Entity(EntityError),

    /// Booking rules (dates, availability, transitions)
    Booking(BookingError),

    /// Payment and escrow rules
    Payment(PaymentError),

    /// Promo code eligibility
    Promo(PromoError),

    /// Input validation
    Validation(ValidationError),

    /// Authentication and authorization
    Auth(AuthError),

    /// The client exceeded its request budget
    RateLimited { retry_after_secs: u64 },

    /// Configuration errors
    Config(ConfigError),

    /// Storage backend errors
    Storage(StorageError),

    /// Unexpected failures (should not happen in normal operation)
    Internal(String),
}

impl fmt::Display for DerlgError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DerlgError::Entity(e) => write!(f, "{}", e),
            DerlgError::Booking(e) => write!(f, "{}", e),
            DerlgError::Payment(e) => write!(f, "{}", e),
            DerlgError::Promo(e) => write!(f, "{}", e),
            DerlgError::Validation(e) => write!(f, "{}", e),
            DerlgError::Auth(e) => write!(f, "{}", e),
            DerlgError::RateLimited { retry_after_secs } => write!(
                f,
                "Too many requests, please try again in {} seconds",
                retry_after_secs
            ),
            DerlgError::Config(e) => write!(f, "{}", e),
            DerlgError::Storage(e) => write!(f, "{}", e),
            DerlgError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for DerlgError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DerlgError::Entity(e) => Some(e),
            DerlgError::Booking(e) => Some(e),
            DerlgError::Payment(e) => Some(e),
            DerlgError::Promo(e) => Some(e),
            DerlgError::Validation(e) => Some(e),
            DerlgError::Auth(e) => Some(e),
            DerlgError::Config(e) => Some(e),
            DerlgError::Storage(e) => Some(e),
            DerlgError::RateLimited { .. } | DerlgError::Internal(_) => None,
        }
    }
}

/// Body of the `error` member of the error envelope
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    pub timestamp: DateTime<Utc>,
}

/// Error envelope returned by every failing endpoint
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ErrorBody,
}

impl DerlgError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            DerlgError::Entity(e) => e.status_code(),
            DerlgError::Booking(e) => e.status_code(),
            DerlgError::Payment(e) => e.status_code(),
            DerlgError::Promo(e) => e.status_code(),
            DerlgError::Validation(_) => StatusCode::BAD_REQUEST,
            DerlgError::Auth(e) => e.status_code(),
            DerlgError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            DerlgError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            DerlgError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            DerlgError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            DerlgError::Entity(e) => e.error_code(),
            DerlgError::Booking(e) => e.error_code(),
            DerlgError::Payment(e) => e.error_code(),
            DerlgError::Promo(e) => e.error_code(),
            DerlgError::Validation(e) => e.error_code(),
            DerlgError::Auth(e) => e.error_code(),
            DerlgError::RateLimited { .. } => "SYS_9002",
            DerlgError::Config(_) => "SYS_9001",
            DerlgError::Storage(e) => e.error_code(),
            DerlgError::Internal(_) => "SYS_9001",
        }
    }

    /// Whether the message may be shown to clients as-is
    fn is_server_fault(&self) -> bool {
        self.status_code().is_server_error()
    }

    /// Convert to an error envelope
    pub fn to_response(&self) -> ErrorResponse {
        let message = if self.is_server_fault() {
            "An internal server error occurred".to_string()
        } else {
            self.to_string()
        };

        ErrorResponse {
            success: false,
            error: ErrorBody {
                code: self.error_code().to_string(),
                message,
                details: self.details(),
                timestamp: Utc::now(),
            },
        }
    }

    /// Get additional details for the error
    fn details(&self) -> Option<serde_json::Value> {
        match self {
            DerlgError::Entity(EntityError::NotFound { entity_type, id }) => {
                Some(serde_json::json!({
                    "entity_type": entity_type,
                    "id": id
                }))
            }
            DerlgError::Booking(
                BookingError::RoomUnavailable { room_id } | BookingError::RoomInUse { room_id },
            ) => {
                Some(serde_json::json!({ "room_id": room_id }))
            }
            DerlgError::Booking(BookingError::InvalidTransition { from, to }) => {
                Some(serde_json::json!({ "from": from, "to": to }))
            }
            DerlgError::Booking(BookingError::CapacityExceeded {
                capacity,
                requested,
            }) => Some(serde_json::json!({
                "capacity": capacity,
                "requested": requested
            })),
            DerlgError::Payment(PaymentError::ExceedsBalance {
                attempted,
                remaining,
            }) => Some(serde_json::json!({
                "attempted": attempted,
                "remaining": remaining
            })),
            DerlgError::Validation(ValidationError::FieldErrors(errors)) => {
                Some(serde_json::json!({ "fields": errors }))
            }
            DerlgError::Validation(ValidationError::FieldError { field, message }) => {
                Some(serde_json::json!({ "fields": [{ "field": field, "message": message }] }))
            }
            DerlgError::RateLimited { retry_after_secs } => {
                Some(serde_json::json!({ "retry_after": retry_after_secs }))
            }
            _ => None,
        }
    }
}

impl IntoResponse for DerlgError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if self.is_server_fault() {
            tracing::error!(code = self.error_code(), error = %self, "request failed");
        } else {
            tracing::debug!(code = self.error_code(), error = %self, "request rejected");
        }

        let retry_after = match &self {
            DerlgError::RateLimited { retry_after_secs } => Some(*retry_after_secs),
            _ => None,
        };

        let mut response = (status, Json(self.to_response())).into_response();
        if let Some(secs) = retry_after {
            if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}

// =============================================================================
// Entity Errors
// =============================================================================

/// Errors related to generic entity operations
#[derive(Debug, Error)]
pub enum EntityError {
    #[error("{entity_type} with id '{id}' not found")]
    NotFound { entity_type: String, id: String },

    #[error("{entity_type} '{key}' already exists")]
    AlreadyExists { entity_type: String, key: String },

    #[error("{message}")]
    Conflict { message: String },
}

impl EntityError {
    pub fn not_found(entity_type: &str, id: impl ToString) -> Self {
        EntityError::NotFound {
            entity_type: entity_type.to_string(),
            id: id.to_string(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            EntityError::NotFound { .. } => StatusCode::NOT_FOUND,
            EntityError::AlreadyExists { .. } => StatusCode::CONFLICT,
            EntityError::Conflict { .. } => StatusCode::CONFLICT,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            EntityError::NotFound { .. } => "RES_3001",
            EntityError::AlreadyExists { .. } => "RES_3002",
            EntityError::Conflict { .. } => "RES_3003",
        }
    }
}

impl From<EntityError> for DerlgError {
    fn from(err: EntityError) -> Self {
        DerlgError::Entity(err)
    }
}

// =============================================================================
// Booking Errors
// =============================================================================

/// Errors raised by the booking lifecycle
#[derive(Debug, Error)]
pub enum BookingError {
    #[error("Booking '{id}' not found")]
    NotFound { id: Uuid },

    #[error("Booking has already been cancelled")]
    AlreadyCancelled,

    #[error("Booking cannot be modified: {reason}")]
    CannotBeModified { reason: String },

    #[error("Cannot move booking from '{from}' to '{to}'")]
    InvalidTransition { from: String, to: String },

    #[error("Invalid booking dates: {message}")]
    InvalidDates { message: String },

    #[error("Room is not available for the selected dates")]
    RoomUnavailable { room_id: Uuid },

    #[error("Hotel is not accepting bookings")]
    HotelUnavailable { hotel_id: Uuid },

    #[error("Room is not available for booking")]
    RoomInactive { room_id: Uuid },

    #[error("Room capacity of {capacity} guests exceeded ({requested} requested)")]
    CapacityExceeded { capacity: u32, requested: u32 },

    #[error("Room has pending or confirmed bookings")]
    RoomInUse { room_id: Uuid },
}

impl BookingError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            BookingError::NotFound { .. } => StatusCode::NOT_FOUND,
            BookingError::AlreadyCancelled => StatusCode::CONFLICT,
            BookingError::CannotBeModified { .. } => StatusCode::BAD_REQUEST,
            BookingError::InvalidTransition { .. } => StatusCode::CONFLICT,
            BookingError::InvalidDates { .. } => StatusCode::BAD_REQUEST,
            BookingError::RoomUnavailable { .. } => StatusCode::CONFLICT,
            BookingError::HotelUnavailable { .. } => StatusCode::BAD_REQUEST,
            BookingError::RoomInactive { .. } => StatusCode::BAD_REQUEST,
            BookingError::CapacityExceeded { .. } => StatusCode::BAD_REQUEST,
            BookingError::RoomInUse { .. } => StatusCode::CONFLICT,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            BookingError::NotFound { .. } => "BKG_7001",
            BookingError::AlreadyCancelled => "BKG_7002",
            BookingError::CannotBeModified { .. } => "BKG_7003",
            BookingError::InvalidTransition { .. } => "BKG_7006",
            BookingError::InvalidDates { .. } => "BKG_7004",
            BookingError::RoomUnavailable { .. } => "BKG_7005",
            BookingError::HotelUnavailable { .. } => "HTL_5002",
            BookingError::RoomInactive { .. } => "RMT_6002",
            BookingError::CapacityExceeded { .. } => "RMT_6004",
            BookingError::RoomInUse { .. } => "RMT_6003",
        }
    }
}

impl From<BookingError> for DerlgError {
    fn from(err: BookingError) -> Self {
        DerlgError::Booking(err)
    }
}

// =============================================================================
// Payment Errors
// =============================================================================

/// Errors raised by payments and escrow
#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("Payment of {attempted:.2} exceeds the outstanding balance of {remaining:.2}")]
    ExceedsBalance { attempted: f64, remaining: f64 },

    #[error("Booking has no outstanding balance")]
    NothingDue,

    #[error("Transaction is {status}, expected pending")]
    TransactionNotPending { status: String },

    #[error("Booking in status '{status}' cannot take payments")]
    BookingNotPayable { status: String },

    #[error("Payment declined by {gateway}: {reason}")]
    Declined { gateway: String, reason: String },

    #[error("Payment gateway error: {message}")]
    Gateway { message: String },

    #[error("Cannot release escrow for booking with status '{status}'")]
    EscrowNotReleasable { status: String },
}

impl PaymentError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            PaymentError::ExceedsBalance { .. } => StatusCode::CONFLICT,
            PaymentError::NothingDue => StatusCode::CONFLICT,
            PaymentError::TransactionNotPending { .. } => StatusCode::CONFLICT,
            PaymentError::BookingNotPayable { .. } => StatusCode::CONFLICT,
            PaymentError::Declined { .. } => StatusCode::PAYMENT_REQUIRED,
            PaymentError::Gateway { .. } => StatusCode::BAD_GATEWAY,
            PaymentError::EscrowNotReleasable { .. } => StatusCode::CONFLICT,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            PaymentError::ExceedsBalance { .. } => "PAY_8007",
            PaymentError::NothingDue => "PAY_8002",
            PaymentError::TransactionNotPending { .. } => "PAY_8003",
            PaymentError::BookingNotPayable { .. } => "PAY_8009",
            PaymentError::Declined { .. } => "PAY_8001",
            PaymentError::Gateway { .. } => "PAY_8006",
            PaymentError::EscrowNotReleasable { .. } => "PAY_8008",
        }
    }
}

impl From<PaymentError> for DerlgError {
    fn from(err: PaymentError) -> Self {
        DerlgError::Payment(err)
    }
}

// =============================================================================
// Promo Errors
// =============================================================================

/// Reasons a promo code cannot be applied
#[derive(Debug, Error)]
pub enum PromoError {
    #[error("Promo code '{code}' not found")]
    NotFound { code: String },

    #[error("{reason}")]
    Invalid { reason: String },

    #[error("A promo code has already been applied to this booking")]
    AlreadyApplied,

    #[error("Promo codes can only be applied to pending bookings")]
    BookingNotPending,

    #[error("This promo code is not applicable to the selected hotel")]
    NotApplicable,

    #[error("Minimum booking amount of {minimum:.2} is required to use this promo code")]
    MinimumNotMet { minimum: f64 },

    #[error("{reason}")]
    UserNotEligible { reason: String },

    #[error("Promo code discount could not be applied")]
    ZeroDiscount,
}

impl PromoError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            PromoError::NotFound { .. } => StatusCode::NOT_FOUND,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            PromoError::NotFound { .. } => "RES_3001",
            PromoError::BookingNotPending => "BKG_7003",
            _ => "VAL_2004",
        }
    }
}

impl From<PromoError> for DerlgError {
    fn from(err: PromoError) -> Self {
        DerlgError::Promo(err)
    }
}

// =============================================================================
// Validation Errors
// =============================================================================

/// Errors related to input validation
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Validation error for field '{field}': {message}")]
    FieldError { field: String, message: String },

    #[error("Validation failed: {}", summarize(.0))]
    FieldErrors(Vec<FieldValidationError>),

    #[error("Invalid JSON: {message}")]
    InvalidJson { message: String },

    #[error("Missing required field: {argument}")]
    MissingArgument { argument: String },

    #[error("Invalid UUID format: {value}")]
    InvalidUuid { value: String },
}

fn summarize(errors: &[FieldValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join(", ")
}

/// A single field validation error
#[derive(Debug, Clone, Serialize)]
pub struct FieldValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        ValidationError::FieldError {
            field: field.to_string(),
            message: message.into(),
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ValidationError::FieldError { .. } | ValidationError::FieldErrors(_) => "VAL_2001",
            ValidationError::InvalidJson { .. } | ValidationError::InvalidUuid { .. } => {
                "VAL_2002"
            }
            ValidationError::MissingArgument { .. } => "VAL_2003",
        }
    }
}

impl From<ValidationError> for DerlgError {
    fn from(err: ValidationError) -> Self {
        DerlgError::Validation(err)
    }
}

impl From<validator::ValidationErrors> for DerlgError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<FieldValidationError> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| FieldValidationError {
                    field: field.to_string(),
                    message: e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string()),
                })
            })
            .collect();
        fields.sort_by(|a, b| a.field.cmp(&b.field));
        DerlgError::Validation(ValidationError::FieldErrors(fields))
    }
}

// =============================================================================
// Auth Errors
// =============================================================================

/// Errors related to identity and permissions
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Unauthorized: {message}")]
    Unauthenticated { message: String },

    #[error("Invalid credentials header: {message}")]
    InvalidToken { message: String },

    #[error("User account is inactive")]
    UserInactive,

    #[error("Forbidden: {message}")]
    Forbidden { message: String },
}

impl AuthError {
    pub fn forbidden(message: impl Into<String>) -> Self {
        AuthError::Forbidden {
            message: message.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::Unauthenticated { .. } => StatusCode::UNAUTHORIZED,
            AuthError::InvalidToken { .. } => StatusCode::UNAUTHORIZED,
            AuthError::UserInactive => StatusCode::FORBIDDEN,
            AuthError::Forbidden { .. } => StatusCode::FORBIDDEN,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::Unauthenticated { .. } => "AUTH_1005",
            AuthError::InvalidToken { .. } => "AUTH_1003",
            AuthError::UserInactive => "AUTH_1004",
            AuthError::Forbidden { .. } => "AUTH_1006",
        }
    }
}

impl From<AuthError> for DerlgError {
    fn from(err: AuthError) -> Self {
        DerlgError::Auth(err)
    }
}

// =============================================================================
// Config Errors
// =============================================================================

/// Errors related to configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse config{}: {message}", file.as_ref().map(|f| format!(" file '{}'", f)).unwrap_or_default())]
    ParseError {
        file: Option<String>,
        message: String,
    },

    #[error("Invalid value '{value}' for field '{field}': {message}")]
    InvalidValue {
        field: String,
        value: String,
        message: String,
    },

    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },
}

impl From<ConfigError> for DerlgError {
    fn from(err: ConfigError) -> Self {
        DerlgError::Config(err)
    }
}

// =============================================================================
// Storage Errors
// =============================================================================

/// Errors related to storage backends
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to connect to {backend}: {message}")]
    ConnectionError { backend: String, message: String },

    #[error("{backend} query error: {message}")]
    QueryError { backend: String, message: String },

    #[error("Data integrity error: {message}")]
    IntegrityError { message: String },
}

impl StorageError {
    pub fn error_code(&self) -> &'static str {
        match self {
            StorageError::ConnectionError { .. } => "DB_9002",
            StorageError::QueryError { .. } => "DB_9001",
            StorageError::IntegrityError { .. } => "DB_9003",
        }
    }
}

impl From<StorageError> for DerlgError {
    fn from(err: StorageError) -> Self {
        DerlgError::Storage(err)
    }
}

// =============================================================================
// Conversions from external errors
// =============================================================================

impl From<serde_json::Error> for DerlgError {
    fn from(err: serde_json::Error) -> Self {
        DerlgError::Validation(ValidationError::InvalidJson {
            message: err.to_string(),
        })
    }
}

impl From<uuid::Error> for DerlgError {
    fn from(err: uuid::Error) -> Self {
        DerlgError::Validation(ValidationError::InvalidUuid {
            value: err.to_string(),
        })
    }
}

/// Storage backends speak `anyhow`; typed errors raised inside them survive
/// the round trip, everything else becomes an internal error.
impl From<anyhow::Error> for DerlgError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<DerlgError>() {
            Ok(typed) => typed,
            Err(err) => DerlgError::Internal(format!("{:#}", err)),
        }
    }
}

/// A specialized Result type for API operations
pub type DerlgResult<T> = Result<T, DerlgError>;

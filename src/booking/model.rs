//! The booking record and its embedded value objects

use super::lifecycle::BookingStatus;
use crate::core::entity::{Data, Entity};
use crate::core::field::FieldValue;
use crate::payments::model::{EscrowStatus, PaymentMethod, PaymentType, TransactionStatus};
use chrono::{DateTime, NaiveDate, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct Guests {
    #[validate(range(min = 1, message = "at least one adult is required"))]
    pub adults: u32,
    #[serde(default)]
    pub children: u32,
}

impl Guests {
    pub fn total(&self) -> u32 {
        self.adults + self.children
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct GuestDetails {
    #[validate(length(min = 1, max = 255, message = "guest name is required"))]
    pub name: String,
    #[validate(email(message = "invalid email address"))]
    pub email: String,
    #[validate(regex(path = *crate::core::validation::PHONE_RE, message = "invalid phone number"))]
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 1000))]
    pub special_requests: Option<String>,
}

/// Price breakdown of a stay. Every figure is in USD, rounded to cents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Pricing {
    pub room_rate: f64,
    pub subtotal: f64,
    /// Room discount (the room's `discount_percentage`)
    pub discount: f64,
    pub promo_code: Option<String>,
    #[serde(default)]
    pub promo_discount: f64,
    pub student_discount: f64,
    pub tax: f64,
    #[serde(default)]
    pub payment_discount: f64,
    pub total: f64,
}

/// How the guest chose to pay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentPlan {
    Deposit,
    Milestone,
    Full,
}

impl PaymentPlan {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentPlan::Deposit => "deposit",
            PaymentPlan::Milestone => "milestone",
            PaymentPlan::Full => "full",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BookingPaymentStatus {
    #[default]
    Pending,
    Partial,
    Completed,
    Refunded,
}

impl BookingPaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingPaymentStatus::Pending => "pending",
            BookingPaymentStatus::Partial => "partial",
            BookingPaymentStatus::Completed => "completed",
            BookingPaymentStatus::Refunded => "refunded",
        }
    }
}

/// Summary of a transaction as embedded in the booking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionSummary {
    pub transaction_id: String,
    pub amount: f64,
    pub payment_type: PaymentType,
    pub status: TransactionStatus,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingPayment {
    pub method: PaymentMethod,
    #[serde(rename = "type")]
    pub plan: PaymentPlan,
    /// Upfront share for the deposit plan
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deposit_percentage: Option<f64>,
    pub status: BookingPaymentStatus,
    #[serde(default)]
    pub transactions: Vec<TransactionSummary>,
    pub escrow_status: EscrowStatus,
    /// Sum of captured, unrefunded installments
    #[serde(default)]
    pub amount_paid: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefundStatus {
    NotApplicable,
    NoRefund,
    Pending,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cancellation {
    pub cancelled_at: DateTime<Utc>,
    pub reason: String,
    pub refund_amount: f64,
    pub refund_status: RefundStatus,
    pub policy_applied: String,
}

/// Reminder kinds already sent for a booking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderKind {
    #[serde(rename = "milestone_2")]
    Milestone2,
    #[serde(rename = "milestone_3")]
    Milestone3,
    CheckIn,
}

/// Where "today" falls relative to the stay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StayPhase {
    Upcoming,
    InProgress,
    Past,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub entity_type: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,

    pub booking_number: String,
    pub user_id: Uuid,
    pub hotel_id: Uuid,
    pub room_id: Uuid,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub guests: Guests,
    #[serde(default = "default_room_count")]
    pub room_count: u32,
    pub guest_details: GuestDetails,
    pub pricing: Pricing,
    pub payment: BookingPayment,
    pub status: BookingStatus,
    #[serde(default)]
    pub cancellation: Option<Cancellation>,
    #[serde(default)]
    pub reminders_sent: Vec<ReminderKind>,
}

fn default_room_count() -> u32 {
    1
}

/// `BK-<base36 millis>-<4 random base36>`, upper-case
pub fn generate_booking_number(now: DateTime<Utc>) -> String {
    const ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
    let mut rng = rand::thread_rng();
    let suffix: String = (0..4)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect();
    format!(
        "BK-{}-{}",
        to_base36(now.timestamp_millis().max(0) as u64),
        suffix
    )
}

fn to_base36(mut n: u64) -> String {
    const DIGITS: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}

impl Booking {
    pub fn nights(&self) -> i64 {
        (self.check_out - self.check_in).num_days()
    }

    /// Whether the stay overlaps `[check_in, check_out)`
    pub fn overlaps(&self, check_in: NaiveDate, check_out: NaiveDate) -> bool {
        self.check_in < check_out && self.check_out > check_in
    }

    pub fn stay_phase(&self, today: NaiveDate) -> StayPhase {
        if self.check_out < today {
            StayPhase::Past
        } else if self.check_in > today {
            StayPhase::Upcoming
        } else {
            StayPhase::InProgress
        }
    }

    /// What the guest has not paid yet
    pub fn outstanding(&self) -> f64 {
        crate::booking::pricing::round_cents((self.pricing.total - self.payment.amount_paid).max(0.0))
    }

    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.user_id == user_id
    }

    pub fn has_reminder(&self, kind: ReminderKind) -> bool {
        self.reminders_sent.contains(&kind)
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

impl Entity for Booking {
    fn resource_name() -> &'static str {
        "bookings"
    }

    fn resource_name_singular() -> &'static str {
        "booking"
    }

    fn id(&self) -> Uuid {
        self.id
    }

    fn entity_type(&self) -> &str {
        &self.entity_type
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }

    fn status(&self) -> &str {
        self.status.as_str()
    }

    fn tenant_id(&self) -> Option<Uuid> {
        Some(self.hotel_id)
    }
}

impl Data for Booking {
    fn name(&self) -> &str {
        &self.booking_number
    }

    fn indexed_fields() -> &'static [&'static str] {
        &["booking_number", "user_id", "hotel_id", "room_id"]
    }

    fn field_value(&self, field: &str) -> Option<FieldValue> {
        match field {
            "booking_number" => Some(FieldValue::String(self.booking_number.clone())),
            "user_id" => Some(FieldValue::Uuid(self.user_id)),
            "hotel_id" => Some(FieldValue::Uuid(self.hotel_id)),
            "room_id" => Some(FieldValue::Uuid(self.room_id)),
            "check_in" => Some(FieldValue::Date(self.check_in)),
            "check_out" => Some(FieldValue::Date(self.check_out)),
            "status" => Some(FieldValue::from(self.status.as_str())),
            "total" => Some(FieldValue::Float(self.pricing.total)),
            "payment_status" => Some(FieldValue::from(self.payment.status.as_str())),
            "payment_type" => Some(FieldValue::from(self.payment.plan.as_str())),
            "created_at" => Some(FieldValue::DateTime(self.created_at)),
            _ => None,
        }
    }
}

/// A booking as returned by the API, with derived views
#[derive(Debug, Clone, Serialize)]
pub struct BookingView {
    #[serde(flatten)]
    pub booking: Booking,
    pub nights: i64,
    pub is_upcoming: bool,
    pub is_active: bool,
    pub is_past: bool,
}

impl BookingView {
    pub fn new(booking: Booking, today: NaiveDate) -> Self {
        let phase = booking.stay_phase(today);
        let confirmed = booking.status == BookingStatus::Confirmed;
        Self {
            nights: booking.nights(),
            is_upcoming: phase == StayPhase::Upcoming && confirmed,
            is_active: phase == StayPhase::InProgress && confirmed,
            is_past: phase == StayPhase::Past,
            booking,
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// A pending three-night stay paid in full through Stripe
    pub fn booking(check_in: NaiveDate, nights: i64, total: f64) -> Booking {
        let now = Utc::now();
        Booking {
            id: Uuid::new_v4(),
            entity_type: "booking".to_string(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
            booking_number: generate_booking_number(now),
            user_id: Uuid::new_v4(),
            hotel_id: Uuid::new_v4(),
            room_id: Uuid::new_v4(),
            check_in,
            check_out: check_in + chrono::Duration::days(nights),
            guests: Guests {
                adults: 2,
                children: 0,
            },
            room_count: 1,
            guest_details: GuestDetails {
                name: "Sokha Chan".to_string(),
                email: "sokha@example.com".to_string(),
                phone: "+85512345678".to_string(),
                special_requests: None,
            },
            pricing: Pricing {
                total,
                ..Default::default()
            },
            payment: BookingPayment {
                method: PaymentMethod::Stripe,
                plan: PaymentPlan::Full,
                deposit_percentage: None,
                status: BookingPaymentStatus::Pending,
                transactions: Vec::new(),
                escrow_status: EscrowStatus::Held,
                amount_paid: 0.0,
            },
            status: BookingStatus::Pending,
            cancellation: None,
            reminders_sent: Vec::new(),
        }
    }
}

//! Pricing, discount and refund calculations
//!
//! Everything here is pure: no storage, no clock unless passed in. Money is
//! carried as `f64` USD and every figure that leaves this module is rounded
//! to cents with [`round_cents`].

use super::model::{PaymentPlan, Pricing};
use crate::config::PricingConfig;
use crate::core::error::{DerlgResult, ValidationError};
use crate::entities::promo_code::model::{DiscountType, PromoCode};
use crate::payments::model::Currency;
use chrono::{DateTime, NaiveDate, Utc};

const SECONDS_PER_DAY: f64 = 86_400.0;

pub fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// `price_per_night × nights × rooms`
pub fn stay_total(price_per_night: f64, nights: i64, rooms: u32) -> f64 {
    round_cents(price_per_night * nights as f64 * rooms as f64)
}

/// `(discount, final)` for paying the whole total upfront
pub fn full_payment_discount(total: f64, rate: f64) -> (f64, f64) {
    let discount = round_cents(total * rate);
    (discount, round_cents(total - discount))
}

/// `(deposit, remaining)` for a deposit of `percentage` percent
pub fn deposit_split(total: f64, percentage: f64, rules: &PricingConfig) -> DerlgResult<(f64, f64)> {
    if !(rules.min_deposit_percentage..=rules.max_deposit_percentage).contains(&percentage) {
        return Err(ValidationError::field(
            "deposit_percentage",
            format!(
                "must be between {} and {}",
                rules.min_deposit_percentage, rules.max_deposit_percentage
            ),
        )
        .into());
    }
    let deposit = round_cents(total * percentage / 100.0);
    Ok((deposit, round_cents(total - deposit)))
}

/// 50/25/25 split; the last milestone absorbs rounding so the parts sum to `total`
pub fn milestone_split(total: f64) -> [f64; 3] {
    let first = round_cents(total * 0.50);
    let second = round_cents(total * 0.25);
    [first, second, round_cents(total - first - second)]
}

/// Whole days until check-in (midnight UTC), rounded up
pub fn days_until_check_in(check_in: NaiveDate, now: DateTime<Utc>) -> i64 {
    let check_in = check_in.and_time(chrono::NaiveTime::MIN).and_utc();
    let seconds = (check_in - now).num_seconds() as f64;
    (seconds / SECONDS_PER_DAY).ceil() as i64
}

/// Outcome of the cancellation policy for one booking
#[derive(Debug, Clone, PartialEq)]
pub struct RefundQuote {
    /// Share of the paid amount refunded, in percent
    pub percentage: f64,
    pub amount: f64,
    pub policy: &'static str,
}

/// Apply the refund tiers to `total`
///
/// - at least `full_refund_days` out: everything minus the processing fee
/// - at least `partial_refund_days` out: `partial_refund_rate`
/// - otherwise nothing
pub fn refund_amount(total: f64, days_until_check_in: i64, rules: &PricingConfig) -> RefundQuote {
    let (rate, policy) = if days_until_check_in >= rules.full_refund_days {
        (
            1.0 - rules.processing_fee_rate,
            "Full refund (minus processing fees)",
        )
    } else if days_until_check_in >= rules.partial_refund_days {
        (rules.partial_refund_rate, "50% refund")
    } else {
        (0.0, "Deposit retained, no refund")
    };

    RefundQuote {
        percentage: round_cents(rate * 100.0),
        amount: round_cents(total * rate),
        policy,
    }
}

/// Discount a promo code grants on `amount`
///
/// Zero when `amount` is below the code's minimum. Capped by `max_discount`
/// and by `amount` itself.
pub fn promo_discount(promo: &PromoCode, amount: f64) -> f64 {
    if amount < promo.min_booking_amount || amount <= 0.0 {
        return 0.0;
    }
    let raw = match promo.discount_type {
        DiscountType::Percentage => amount * promo.discount_value / 100.0,
        DiscountType::Fixed => promo.discount_value,
    };
    let capped = match promo.max_discount {
        Some(max) => raw.min(max),
        None => raw,
    };
    round_cents(capped.min(amount).max(0.0))
}

/// Convert between USD and KHR at `usd_to_khr` riel per dollar
pub fn convert_currency(amount: f64, from: Currency, to: Currency, usd_to_khr: f64) -> f64 {
    match (from, to) {
        (Currency::Usd, Currency::Khr) => round_cents(amount * usd_to_khr),
        (Currency::Khr, Currency::Usd) => round_cents(amount / usd_to_khr),
        _ => amount,
    }
}

/// `booked / available × 100`, clamped to [0, 100]; 0 when nothing is available
pub fn occupancy_rate(booked: u64, available: u64) -> f64 {
    if available == 0 {
        return 0.0;
    }
    round_cents((booked as f64 / available as f64 * 100.0).clamp(0.0, 100.0))
}

/// Everything that determines the price of a stay
#[derive(Debug, Clone)]
pub struct QuoteInput<'a> {
    pub room_rate: f64,
    pub nights: i64,
    pub rooms: u32,
    /// The room's `discount_percentage`
    pub room_discount_percentage: f64,
    /// Whether the student allowance applies to this booking
    pub student: bool,
    pub promo: Option<&'a PromoCode>,
    pub plan: PaymentPlan,
}

/// Price a stay
///
/// 1. subtotal = rate × nights × rooms
/// 2. minus the room discount
/// 3. minus the student discount (a share of the subtotal)
/// 4. minus the promo discount
/// 5. plus tax on what remains
/// 6. minus the full-payment discount on the taxed total
pub fn quote(input: &QuoteInput<'_>, rules: &PricingConfig) -> Pricing {
    let subtotal = stay_total(input.room_rate, input.nights, input.rooms);
    let discount = round_cents(subtotal * input.room_discount_percentage.clamp(0.0, 100.0) / 100.0);
    let student_discount = if input.student {
        round_cents(subtotal * rules.student_discount_rate)
    } else {
        0.0
    };

    let after_discounts = (subtotal - discount - student_discount).max(0.0);
    let promo_discount = input
        .promo
        .map(|promo| promo_discount(promo, after_discounts))
        .unwrap_or(0.0);

    let taxable = round_cents((after_discounts - promo_discount).max(0.0));
    let tax = round_cents(taxable * rules.tax_rate);
    let taxed_total = round_cents(taxable + tax);

    let (payment_discount, total) = match input.plan {
        PaymentPlan::Full => full_payment_discount(taxed_total, rules.full_payment_discount),
        PaymentPlan::Deposit | PaymentPlan::Milestone => (0.0, taxed_total),
    };

    Pricing {
        room_rate: input.room_rate,
        subtotal,
        discount,
        promo_code: input
            .promo
            .filter(|_| promo_discount > 0.0)
            .map(|p| p.code.clone()),
        promo_discount,
        student_discount,
        tax,
        payment_discount,
        total,
    }
}

/// Amount collected when the booking is created
pub fn amount_due_now(total: f64, plan: PaymentPlan, deposit_percentage: f64) -> f64 {
    match plan {
        PaymentPlan::Deposit => round_cents(total * deposit_percentage / 100.0),
        PaymentPlan::Milestone => milestone_split(total)[0],
        PaymentPlan::Full => total,
    }
}

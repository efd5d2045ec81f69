//! Escrow arithmetic
//!
//! Captured funds stay `held` until the stay completes. What a booking has
//! been paid is the net of its completed transactions (amount minus any
//! partial refund), and that net never exceeds the booking total.

use super::model::PaymentTransaction;
use super::options::ScheduledPayment;
use crate::booking::model::BookingPaymentStatus;
use crate::booking::pricing::round_cents;
use crate::core::error::PaymentError;
use uuid::Uuid;

/// Half a cent of slack for float sums
pub(crate) const EPSILON: f64 = 0.005;

/// What may still be captured for a booking
pub fn remaining_balance(total: f64, captured: f64) -> f64 {
    round_cents((total - captured).max(0.0))
}

/// Reject a capture that would push completed payments past the total
pub fn check_capture(total: f64, captured: f64, amount: f64) -> Result<(), PaymentError> {
    let remaining = remaining_balance(total, captured);
    if remaining < EPSILON {
        return Err(PaymentError::NothingDue);
    }
    if amount > remaining + EPSILON {
        return Err(PaymentError::ExceedsBalance {
            attempted: amount,
            remaining,
        });
    }
    Ok(())
}

/// Net sum of completed transactions
pub fn captured_total<'a>(transactions: impl IntoIterator<Item = &'a PaymentTransaction>) -> f64 {
    round_cents(transactions.into_iter().map(PaymentTransaction::net_amount).sum())
}

/// Payment status of a live booking given what was captured
pub fn payment_status(total: f64, captured: f64) -> BookingPaymentStatus {
    if captured < EPSILON {
        BookingPaymentStatus::Pending
    } else if captured + EPSILON >= total {
        BookingPaymentStatus::Completed
    } else {
        BookingPaymentStatus::Partial
    }
}

/// Which planned installments `captured` already pays for
///
/// Installments are laid end to end over the total in plan order.
pub fn covered(planned: &[ScheduledPayment], captured: f64) -> Vec<bool> {
    let mut end = 0.0;
    planned
        .iter()
        .map(|payment| {
            end = round_cents(end + payment.amount);
            end <= captured + EPSILON
        })
        .collect()
}

/// The installment that collects the next part of what is owed
///
/// The first installment not fully covered by `captured` is due for its
/// uncovered part. The last one takes whatever is outstanding, so a total
/// raised after every installment was paid is still collected.
pub fn next_due(
    planned: Vec<ScheduledPayment>,
    total: f64,
    captured: f64,
) -> Result<ScheduledPayment, PaymentError> {
    let outstanding = remaining_balance(total, captured);
    if outstanding < 0.01 {
        return Err(PaymentError::NothingDue);
    }

    let count = planned.len();
    let mut end = 0.0;
    for (i, mut payment) in planned.into_iter().enumerate() {
        end = round_cents(end + payment.amount);
        let last = i + 1 == count;
        if last {
            payment.amount = outstanding;
            return Ok(payment);
        }
        if end > captured + EPSILON {
            payment.amount = round_cents(end - captured).min(outstanding);
            return Ok(payment);
        }
    }
    Err(PaymentError::NothingDue)
}

/// Split a refund over completed, held transactions, newest first
///
/// Returns `(transaction row id, amount)` pairs. Each part is capped at
/// what the transaction still holds, and the pairs sum to `amount` capped
/// at what is refundable.
pub fn allocate_refund(transactions: &[PaymentTransaction], amount: f64) -> Vec<(Uuid, f64)> {
    let mut refundable: Vec<&PaymentTransaction> = transactions
        .iter()
        .filter(|tx| tx.is_completed() && tx.is_escrow_held() && tx.net_amount() > 0.0)
        .collect();
    refundable.sort_by_key(|tx| std::cmp::Reverse(tx.created_at));

    let mut left = round_cents(amount.max(0.0));
    let mut allocation = Vec::new();
    for tx in refundable {
        if left < EPSILON {
            break;
        }
        let part = round_cents(left.min(tx.net_amount()));
        allocation.push((tx.id, part));
        left = round_cents(left - part);
    }
    allocation
}

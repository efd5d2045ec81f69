//! Payment initiation, capture, refunds and escrow release
//!
//! Every operation that reads the captured total of a booking and then
//! writes a transaction runs under that booking's lock.

use super::escrow::{EPSILON, allocate_refund, captured_total, check_capture, covered, next_due, payment_status};
use super::gateway::{CaptureOutcome, IntentRequest, PaymentGateway, PaymentIntent};
use super::model::{
    Currency, EscrowStatus, PaymentMethod, PaymentTransaction, TransactionStatus,
};
use super::options::{ScheduledPayment, installments};
use crate::booking::access::ensure_can_view;
use crate::booking::lifecycle::BookingStatus;
use crate::booking::model::{
    Booking, BookingPaymentStatus, PaymentPlan, TransactionSummary,
};
use crate::booking::pricing::round_cents;
use crate::config::{AppConfig, PricingConfig};
use crate::core::auth::AuthContext;
use crate::core::error::{AuthError, DerlgResult, EntityError, PaymentError};
use crate::core::events::{BookingEvent, EventBus, PaymentEvent};
use crate::core::locks::{KeyGuard, KeyedLocks};
use crate::core::service::find_or_404;
use crate::entities::hotel::access::ensure_hotel_staff;
use crate::storage::Stores;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct InitiatePaymentRequest {
    pub booking_id: Uuid,
    /// Defaults to the method chosen at booking time
    #[serde(default)]
    pub method: Option<PaymentMethod>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ConfirmPaymentRequest {
    #[validate(length(min = 1, max = 255))]
    pub transaction_id: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RefundRequest {
    /// Defaults to everything captured
    #[validate(range(min = 0.01))]
    pub amount: Option<f64>,
    #[validate(length(min = 1, max = 500))]
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct InitiatedPayment {
    pub transaction: PaymentTransaction,
    pub intent: PaymentIntent,
    pub installment: ScheduledPayment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallmentStatus {
    Paid,
    DueNow,
    Scheduled,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScheduleEntry {
    #[serde(flatten)]
    pub payment: ScheduledPayment,
    pub status: InstallmentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentSchedule {
    pub booking_id: Uuid,
    pub plan: PaymentPlan,
    pub total: f64,
    pub amount_paid: f64,
    pub outstanding: f64,
    pub installments: Vec<ScheduleEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RefundOutcome {
    pub booking_id: Uuid,
    pub refunded: f64,
    pub transactions: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookEventType {
    Captured,
    Denied,
    Refunded,
}

/// Gateway callback, keyed by the gateway's transaction id
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    pub transaction_id: String,
    pub event: WebhookEventType,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub payload: Value,
}

pub struct PaymentService {
    stores: Stores,
    gateway: Arc<dyn PaymentGateway>,
    events: Arc<EventBus>,
    rules: PricingConfig,
    webhook_secret: Option<String>,
    booking_locks: KeyedLocks,
}

impl PaymentService {
    pub fn new(
        stores: Stores,
        gateway: Arc<dyn PaymentGateway>,
        events: Arc<EventBus>,
        config: &AppConfig,
    ) -> Self {
        Self {
            stores,
            gateway,
            events,
            rules: config.pricing.clone(),
            webhook_secret: config.payments.webhook_secret.clone(),
            booking_locks: KeyedLocks::new(),
        }
    }

    /// Serialize work on one booking's money
    pub async fn lock_booking(&self, booking_id: Uuid) -> KeyGuard<'_> {
        self.booking_locks.acquire(booking_id).await
    }

    /// Start the next installment of a booking
    pub async fn initiate(
        &self,
        auth: &AuthContext,
        request: InitiatePaymentRequest,
    ) -> DerlgResult<InitiatedPayment> {
        let _guard = self.lock_booking(request.booking_id).await;
        let mut booking = find_or_404(self.stores.bookings.as_ref(), &request.booking_id).await?;
        crate::booking::access::ensure_owner(auth, &booking)?;

        if !matches!(booking.status, BookingStatus::Pending | BookingStatus::Confirmed) {
            return Err(PaymentError::BookingNotPayable {
                status: booking.status.to_string(),
            }
            .into());
        }

        let transactions = self.transactions_of(booking.id).await?;
        let captured = captured_total(&transactions);
        let installment = next_due(self.planned_installments(&booking)?, booking.pricing.total, captured)?;
        check_capture(booking.pricing.total, captured, installment.amount)?;

        // A newer attempt for the same installment replaces a stale one
        for mut stale in transactions
            .into_iter()
            .filter(|tx| tx.is_pending() && tx.payment_type == installment.payment_type)
        {
            stale.status = TransactionStatus::Failed;
            stale.touch();
            self.stores.transactions.update(&stale.id, stale.clone()).await?;
            set_summary_status(&mut booking, &stale.transaction_id, TransactionStatus::Failed);
        }

        let method = request.method.unwrap_or(booking.payment.method);
        let intent = self
            .gateway
            .create_intent(&IntentRequest {
                booking_id: booking.id,
                method,
                amount: installment.amount,
                currency: Currency::Usd,
                description: format!("Booking {} ({})", booking.booking_number, installment.description),
            })
            .await
            .map_err(|e| PaymentError::Gateway {
                message: e.to_string(),
            })?;

        let mut transaction = PaymentTransaction::new(
            booking.id,
            booking.user_id,
            booking.hotel_id,
            intent.transaction_id.clone(),
            method,
            installment.amount,
            installment.payment_type,
        );
        transaction.gateway_response = intent.raw.clone();
        let transaction = self.stores.transactions.create(transaction).await?;

        booking.payment.transactions.push(TransactionSummary {
            transaction_id: transaction.transaction_id.clone(),
            amount: transaction.amount,
            payment_type: transaction.payment_type,
            status: TransactionStatus::Pending,
            timestamp: transaction.created_at,
        });
        booking.touch();
        self.stores.bookings.update(&booking.id, booking.clone()).await?;

        tracing::info!(
            booking = %booking.booking_number,
            transaction = %transaction.transaction_id,
            amount = transaction.amount,
            payment_type = transaction.payment_type.as_str(),
            "payment initiated"
        );

        Ok(InitiatedPayment {
            transaction,
            intent,
            installment,
        })
    }

    /// Capture a pending transaction through its gateway
    pub async fn confirm(&self, auth: &AuthContext, transaction_id: &str) -> DerlgResult<PaymentTransaction> {
        let found = self.find_transaction(transaction_id).await?;
        let _guard = self.lock_booking(found.booking_id).await;

        let mut transaction = find_or_404(self.stores.transactions.as_ref(), &found.id).await?;
        let mut booking = find_or_404(self.stores.bookings.as_ref(), &transaction.booking_id).await?;
        crate::booking::access::ensure_owner(auth, &booking)?;

        if !transaction.is_pending() {
            return Err(PaymentError::TransactionNotPending {
                status: transaction.status.as_str().to_string(),
            }
            .into());
        }

        let outcome = self
            .gateway
            .capture(transaction.gateway, &transaction.transaction_id)
            .await
            .map_err(|e| PaymentError::Gateway {
                message: e.to_string(),
            })?;

        self.settle(&mut booking, &mut transaction, outcome).await?;
        Ok(transaction)
    }

    /// Transactions of a booking; guests get the reduced gateway payload
    pub async fn transactions_for_booking(
        &self,
        auth: &AuthContext,
        booking_id: Uuid,
    ) -> DerlgResult<Vec<PaymentTransaction>> {
        let booking = find_or_404(self.stores.bookings.as_ref(), &booking_id).await?;
        ensure_can_view(&self.stores, auth, &booking).await?;

        let transactions = self.transactions_of(booking_id).await?;
        if auth.user_id().is_some_and(|id| booking.is_owned_by(id)) {
            Ok(transactions.iter().map(PaymentTransaction::to_safe_view).collect())
        } else {
            Ok(transactions)
        }
    }

    /// Every installment with its paid / due-now / scheduled state
    pub async fn schedule(&self, auth: &AuthContext, booking_id: Uuid) -> DerlgResult<PaymentSchedule> {
        let booking = find_or_404(self.stores.bookings.as_ref(), &booking_id).await?;
        ensure_can_view(&self.stores, auth, &booking).await?;

        let transactions = self.transactions_of(booking_id).await?;
        let plan = self.planned_installments(&booking)?;
        let paid_flags = covered(&plan, captured_total(&transactions));

        let mut due_assigned = false;
        let entries = plan
            .into_iter()
            .zip(paid_flags)
            .map(|(payment, paid)| {
                let status = if paid {
                    InstallmentStatus::Paid
                } else if !due_assigned && booking.status.occupies_room() {
                    due_assigned = true;
                    InstallmentStatus::DueNow
                } else {
                    InstallmentStatus::Scheduled
                };
                let transaction_id = transactions
                    .iter()
                    .filter(|tx| paid && tx.payment_type == payment.payment_type && tx.amount > 0.0)
                    .filter(|tx| matches!(tx.status, TransactionStatus::Completed | TransactionStatus::Refunded))
                    .max_by_key(|tx| tx.created_at)
                    .map(|tx| tx.transaction_id.clone());
                ScheduleEntry {
                    transaction_id,
                    payment,
                    status,
                }
            })
            .collect();

        Ok(PaymentSchedule {
            booking_id,
            plan: booking.payment.plan,
            total: booking.pricing.total,
            amount_paid: booking.payment.amount_paid,
            outstanding: booking.outstanding(),
            installments: entries,
        })
    }

    /// Refund captured funds on behalf of the hotel or a super admin
    pub async fn refund(
        &self,
        auth: &AuthContext,
        booking_id: Uuid,
        request: RefundRequest,
    ) -> DerlgResult<RefundOutcome> {
        let _guard = self.lock_booking(booking_id).await;
        let mut booking = find_or_404(self.stores.bookings.as_ref(), &booking_id).await?;
        ensure_hotel_staff(self.stores.hotels.as_ref(), auth, booking.hotel_id).await?;

        let amount = request.amount.unwrap_or(booking.payment.amount_paid);
        let outcome = self.refund_captured(&mut booking, amount, &request.reason).await?;
        self.stores.bookings.update(&booking.id, booking.clone()).await?;
        Ok(outcome)
    }

    /// Release held funds of a completed booking to the hotel
    pub async fn release_escrow(&self, auth: &AuthContext, booking_id: Uuid) -> DerlgResult<f64> {
        if !auth.is_system() {
            return Err(AuthError::forbidden("escrow release is reserved to administrators").into());
        }
        let _guard = self.lock_booking(booking_id).await;
        let mut booking = find_or_404(self.stores.bookings.as_ref(), &booking_id).await?;
        let released = self.release_held(&mut booking).await?;
        self.stores.bookings.update(&booking.id, booking.clone()).await?;
        Ok(released)
    }

    /// Apply a gateway callback
    ///
    /// Callbacks are idempotent: one that finds the transaction already in
    /// the target state changes nothing.
    pub async fn handle_webhook(
        &self,
        secret: Option<&str>,
        event: WebhookEvent,
    ) -> DerlgResult<PaymentTransaction> {
        match (&self.webhook_secret, secret) {
            (Some(expected), Some(given)) if expected == given => {}
            (None, _) => return Err(AuthError::forbidden("webhooks are not configured").into()),
            _ => {
                return Err(AuthError::InvalidToken {
                    message: "invalid webhook secret".to_string(),
                }
                .into());
            }
        }

        let found = self.find_transaction(&event.transaction_id).await?;
        let _guard = self.lock_booking(found.booking_id).await;
        let mut transaction = find_or_404(self.stores.transactions.as_ref(), &found.id).await?;
        let mut booking = find_or_404(self.stores.bookings.as_ref(), &transaction.booking_id).await?;

        tracing::info!(
            transaction = %transaction.transaction_id,
            event = ?event.event,
            "gateway webhook received"
        );

        match event.event {
            WebhookEventType::Captured if transaction.is_pending() => {
                let outcome = CaptureOutcome::Captured { raw: event.payload };
                self.settle(&mut booking, &mut transaction, outcome).await?;
            }
            WebhookEventType::Denied if transaction.is_pending() => {
                let outcome = CaptureOutcome::Declined {
                    reason: event.reason.unwrap_or_else(|| "denied by gateway".to_string()),
                    raw: event.payload,
                };
                // The decline is recorded; the callback itself succeeded
                if let Err(e) = self.settle(&mut booking, &mut transaction, outcome).await {
                    tracing::debug!(error = %e, "declined payment recorded");
                }
            }
            WebhookEventType::Refunded if transaction.is_completed() => {
                let amount = round_cents(event.amount.unwrap_or(transaction.net_amount()).min(transaction.net_amount()));
                self.mark_refunded(&mut booking, &mut transaction, amount, "refunded at gateway")
                    .await?;
                self.finish_refund(&mut booking, amount);
                self.stores.bookings.update(&booking.id, booking.clone()).await?;
            }
            _ => {}
        }

        Ok(transaction)
    }

    /// Refund up to `amount` of captured funds, newest transactions first
    ///
    /// The caller holds the booking lock and saves the booking.
    pub(crate) async fn refund_captured(
        &self,
        booking: &mut Booking,
        amount: f64,
        reason: &str,
    ) -> DerlgResult<RefundOutcome> {
        let transactions = self.transactions_of(booking.id).await?;
        let allocation = allocate_refund(&transactions, amount);

        let mut refunded = 0.0;
        let mut refunded_ids = Vec::new();
        for (id, part) in allocation {
            let Some(mut transaction) = transactions.iter().find(|tx| tx.id == id).cloned() else {
                continue;
            };
            let receipt = self
                .gateway
                .refund(transaction.gateway, &transaction.transaction_id, part)
                .await
                .map_err(|e| PaymentError::Gateway {
                    message: e.to_string(),
                })?;
            transaction.gateway_response = serde_json::json!({
                "capture": transaction.gateway_response,
                "refund": receipt.raw,
            });
            self.mark_refunded(booking, &mut transaction, part, reason).await?;
            refunded = round_cents(refunded + part);
            refunded_ids.push(transaction.transaction_id.clone());
        }

        if refunded > 0.0 {
            self.finish_refund(booking, refunded);
        }

        Ok(RefundOutcome {
            booking_id: booking.id,
            refunded,
            transactions: refunded_ids,
        })
    }

    /// Release every held, completed transaction of a completed booking
    ///
    /// The caller holds the booking lock and saves the booking.
    pub(crate) async fn release_held(&self, booking: &mut Booking) -> DerlgResult<f64> {
        if booking.status != BookingStatus::Completed {
            return Err(PaymentError::EscrowNotReleasable {
                status: booking.status.to_string(),
            }
            .into());
        }
        self.release(booking).await
    }

    /// Hand what a cancelled booking keeps after its refund to the hotel
    ///
    /// The caller holds the booking lock and saves the booking.
    pub(crate) async fn release_retained(&self, booking: &mut Booking) -> DerlgResult<f64> {
        if booking.status != BookingStatus::Cancelled {
            return Err(PaymentError::EscrowNotReleasable {
                status: booking.status.to_string(),
            }
            .into());
        }
        self.release(booking).await
    }

    async fn release(&self, booking: &mut Booking) -> DerlgResult<f64> {
        let now = Utc::now();
        let mut released = 0.0;
        for mut transaction in self.transactions_of(booking.id).await? {
            if transaction.is_completed() && transaction.is_escrow_held() {
                transaction.escrow_status = EscrowStatus::Released;
                transaction.escrow_release_date = Some(now);
                transaction.touch();
                released = round_cents(released + transaction.net_amount());
                let id = transaction.id;
                self.stores.transactions.update(&id, transaction).await?;
            }
        }

        if booking.payment.escrow_status == EscrowStatus::Held {
            booking.payment.escrow_status = EscrowStatus::Released;
        }
        booking.touch();

        if released > 0.0 {
            tracing::info!(booking = %booking.booking_number, amount = released, "escrow released");
            self.events.publish(PaymentEvent::EscrowReleased {
                booking_id: booking.id,
                user_id: booking.user_id,
                hotel_id: booking.hotel_id,
                amount: released,
            });
        }
        Ok(released)
    }

    async fn settle(
        &self,
        booking: &mut Booking,
        transaction: &mut PaymentTransaction,
        outcome: CaptureOutcome,
    ) -> DerlgResult<()> {
        match outcome {
            CaptureOutcome::Captured { raw } => {
                let captured = captured_total(&self.transactions_of(booking.id).await?);
                if let Err(e) = check_capture(booking.pricing.total, captured, transaction.amount) {
                    self.fail(booking, transaction, &e.to_string(), raw).await?;
                    return Err(e.into());
                }

                transaction.status = TransactionStatus::Completed;
                transaction.escrow_status = EscrowStatus::Held;
                transaction.gateway_response = raw;
                transaction.touch();
                self.stores
                    .transactions
                    .update(&transaction.id, transaction.clone())
                    .await?;

                let paid = round_cents(captured + transaction.amount);
                booking.payment.amount_paid = paid;
                booking.payment.status = payment_status(booking.pricing.total, paid);
                booking.payment.escrow_status = EscrowStatus::Held;
                set_summary_status(booking, &transaction.transaction_id, TransactionStatus::Completed);

                let auto_confirm =
                    booking.payment.plan == PaymentPlan::Full && booking.status == BookingStatus::Pending;
                if auto_confirm {
                    booking.status = booking.status.transition(BookingStatus::Confirmed)?;
                }
                booking.touch();
                self.stores.bookings.update(&booking.id, booking.clone()).await?;

                tracing::info!(
                    booking = %booking.booking_number,
                    transaction = %transaction.transaction_id,
                    amount = transaction.amount,
                    "payment captured"
                );
                self.events.publish(PaymentEvent::Captured {
                    transaction_id: transaction.transaction_id.clone(),
                    booking_id: booking.id,
                    user_id: booking.user_id,
                    hotel_id: booking.hotel_id,
                    amount: transaction.amount,
                    payment_type: transaction.payment_type.as_str().to_string(),
                });
                if auto_confirm {
                    self.events.publish(BookingEvent::Confirmed {
                        booking_id: booking.id,
                        user_id: booking.user_id,
                        hotel_id: booking.hotel_id,
                    });
                }
                Ok(())
            }
            CaptureOutcome::Declined { reason, raw } => {
                self.fail(booking, transaction, &reason, raw).await?;
                Err(PaymentError::Declined {
                    gateway: transaction.gateway.as_str().to_string(),
                    reason,
                }
                .into())
            }
        }
    }

    async fn fail(
        &self,
        booking: &mut Booking,
        transaction: &mut PaymentTransaction,
        reason: &str,
        raw: Value,
    ) -> DerlgResult<()> {
        transaction.status = TransactionStatus::Failed;
        transaction.gateway_response = raw;
        transaction.touch();
        self.stores
            .transactions
            .update(&transaction.id, transaction.clone())
            .await?;

        set_summary_status(booking, &transaction.transaction_id, TransactionStatus::Failed);
        booking.touch();
        self.stores.bookings.update(&booking.id, booking.clone()).await?;

        tracing::warn!(
            booking = %booking.booking_number,
            transaction = %transaction.transaction_id,
            reason,
            "payment failed"
        );
        self.events.publish(PaymentEvent::Failed {
            transaction_id: transaction.transaction_id.clone(),
            booking_id: booking.id,
            user_id: booking.user_id,
            hotel_id: booking.hotel_id,
            reason: reason.to_string(),
        });
        Ok(())
    }

    async fn mark_refunded(
        &self,
        booking: &mut Booking,
        transaction: &mut PaymentTransaction,
        amount: f64,
        reason: &str,
    ) -> DerlgResult<()> {
        let refunded = round_cents(transaction.refunded() + amount).min(transaction.amount);
        transaction.refund_amount = Some(refunded);
        transaction.refund_reason = Some(reason.to_string());
        // Whatever is not refunded stays captured and held
        if refunded + EPSILON >= transaction.amount {
            transaction.status = TransactionStatus::Refunded;
            transaction.escrow_status = EscrowStatus::Refunded;
        }
        transaction.touch();
        self.stores
            .transactions
            .update(&transaction.id, transaction.clone())
            .await?;
        set_summary_status(booking, &transaction.transaction_id, transaction.status);
        Ok(())
    }

    /// Book-keeping on the booking after `refunded` went back to the guest
    fn finish_refund(&self, booking: &mut Booking, refunded: f64) {
        booking.payment.amount_paid = round_cents((booking.payment.amount_paid - refunded).max(0.0));
        booking.payment.status = if booking.status.is_terminal() || booking.payment.amount_paid < EPSILON {
            BookingPaymentStatus::Refunded
        } else {
            payment_status(booking.pricing.total, booking.payment.amount_paid)
        };
        if booking.payment.amount_paid < EPSILON {
            booking.payment.escrow_status = EscrowStatus::Refunded;
        }
        booking.touch();

        tracing::info!(booking = %booking.booking_number, amount = refunded, "refund issued");
        self.events.publish(PaymentEvent::Refunded {
            booking_id: booking.id,
            user_id: booking.user_id,
            hotel_id: booking.hotel_id,
            amount: refunded,
        });
    }

    fn planned_installments(&self, booking: &Booking) -> DerlgResult<Vec<ScheduledPayment>> {
        installments(
            booking.payment.plan,
            booking.pricing.total,
            booking
                .payment
                .deposit_percentage
                .unwrap_or(self.rules.deposit_percentage),
            booking.check_in,
            booking.created_at.date_naive(),
            &self.rules,
        )
    }

    async fn transactions_of(&self, booking_id: Uuid) -> DerlgResult<Vec<PaymentTransaction>> {
        Ok(self
            .stores
            .transactions
            .search("booking_id", &booking_id.to_string())
            .await?)
    }

    async fn find_transaction(&self, transaction_id: &str) -> DerlgResult<PaymentTransaction> {
        self.stores
            .transactions
            .search("transaction_id", transaction_id)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| EntityError::not_found("payment_transaction", transaction_id).into())
    }
}

fn set_summary_status(booking: &mut Booking, transaction_id: &str, status: TransactionStatus) {
    if let Some(summary) = booking
        .payment
        .transactions
        .iter_mut()
        .find(|s| s.transaction_id == transaction_id)
    {
        summary.status = status;
        summary.timestamp = Utc::now();
    }
}

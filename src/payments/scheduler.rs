//! Periodic sweeps: escrow release and payment / check-in reminders
//!
//! Every sweep is idempotent. Reminders already sent are recorded on the
//! booking, and a booking whose escrow was released is skipped.

use super::escrow::covered;
use super::options::installments;
use super::service::PaymentService;
use crate::booking::lifecycle::BookingStatus;
use crate::booking::model::{Booking, PaymentPlan, ReminderKind};
use crate::config::{PricingConfig, SchedulerConfig};
use crate::core::auth::AuthContext;
use crate::core::error::DerlgResult;
use crate::core::events::{BookingEvent, EventBus, ReminderEvent};
use crate::payments::model::{EscrowStatus, PaymentType};
use crate::storage::Stores;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Counts of what one pass changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub completed: usize,
    pub milestone_reminders: usize,
    pub check_in_reminders: usize,
}

pub struct EscrowScheduler {
    stores: Stores,
    payments: Arc<PaymentService>,
    events: Arc<EventBus>,
    rules: PricingConfig,
    config: SchedulerConfig,
    actor: AuthContext,
}

impl EscrowScheduler {
    pub fn new(
        stores: Stores,
        payments: Arc<PaymentService>,
        events: Arc<EventBus>,
        rules: PricingConfig,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            stores,
            payments,
            events,
            rules,
            config,
            actor: AuthContext::service("escrow-scheduler"),
        }
    }

    /// Run every sweep once
    pub async fn tick(&self, now: DateTime<Utc>) -> DerlgResult<SweepReport> {
        Ok(SweepReport {
            completed: self.run_escrow_release(now).await?,
            milestone_reminders: self.run_milestone_reminders(now).await?,
            check_in_reminders: self.run_check_in_reminders(now).await?,
        })
    }

    /// Complete confirmed stays that ended and release their escrow
    ///
    /// Also retries completed bookings whose funds are still held, and
    /// cancelled ones whose kept share was not handed over.
    pub async fn run_escrow_release(&self, now: DateTime<Utc>) -> DerlgResult<usize> {
        let today = now.date_naive();
        let mut candidates = self.stores.bookings.search("status", BookingStatus::Confirmed.as_str()).await?;
        candidates.retain(|b| b.check_out < today);
        for status in [BookingStatus::Completed, BookingStatus::Cancelled] {
            let mut held = self.stores.bookings.search("status", status.as_str()).await?;
            held.retain(|b| b.payment.escrow_status == EscrowStatus::Held && b.payment.amount_paid > 0.0);
            candidates.extend(held);
        }

        let mut processed = 0;
        for candidate in candidates {
            let _guard = self.payments.lock_booking(candidate.id).await;
            let Some(mut booking) = self.stores.bookings.get(&candidate.id).await? else {
                continue;
            };

            let completing = booking.status == BookingStatus::Confirmed && booking.check_out < today;
            if completing {
                booking.status = booking.status.transition(BookingStatus::Completed)?;
            } else if !matches!(booking.status, BookingStatus::Completed | BookingStatus::Cancelled)
                || booking.payment.escrow_status != EscrowStatus::Held
            {
                continue;
            }

            let release = if booking.status == BookingStatus::Cancelled {
                self.payments.release_retained(&mut booking).await
            } else {
                self.payments.release_held(&mut booking).await
            };
            match release {
                Ok(amount) => tracing::debug!(booking = %booking.booking_number, amount, "escrow sweep"),
                Err(e) => {
                    tracing::error!(booking = %booking.booking_number, error = %e, "escrow release failed");
                    if !completing {
                        continue;
                    }
                }
            }
            self.stores.bookings.update(&booking.id, booking.clone()).await?;

            if completing {
                tracing::info!(
                    booking = %booking.booking_number,
                    actor = %self.actor.actor(),
                    "stay completed"
                );
                self.events.publish(BookingEvent::Completed {
                    booking_id: booking.id,
                    user_id: booking.user_id,
                    hotel_id: booking.hotel_id,
                });
            }
            processed += 1;
        }
        Ok(processed)
    }

    /// Remind guests of unpaid milestones coming due
    pub async fn run_milestone_reminders(&self, now: DateTime<Utc>) -> DerlgResult<usize> {
        let today = now.date_naive();
        let horizon = today + Duration::days(self.config.milestone_reminder_days);
        let mut sent = 0;

        for candidate in self.occupying_bookings().await? {
            if candidate.payment.plan != PaymentPlan::Milestone {
                continue;
            }
            let _guard = self.payments.lock_booking(candidate.id).await;
            let Some(mut booking) = self.stores.bookings.get(&candidate.id).await? else {
                continue;
            };

            let schedule = installments(
                booking.payment.plan,
                booking.pricing.total,
                self.rules.deposit_percentage,
                booking.check_in,
                booking.created_at.date_naive(),
                &self.rules,
            )?;

            let paid_flags = covered(&schedule, booking.payment.amount_paid);
            let mut changed = false;
            for (payment, paid) in schedule.into_iter().zip(paid_flags) {
                let kind = match payment.payment_type {
                    PaymentType::Milestone2 => ReminderKind::Milestone2,
                    PaymentType::Milestone3 => ReminderKind::Milestone3,
                    _ => continue,
                };
                if booking.has_reminder(kind) || paid {
                    continue;
                }
                if payment.due_date > horizon || booking.check_in < today {
                    continue;
                }

                self.events.publish(ReminderEvent::MilestoneDue {
                    booking_id: booking.id,
                    user_id: booking.user_id,
                    hotel_id: booking.hotel_id,
                    milestone: payment.payment_type.milestone().unwrap_or_default(),
                    due_date: payment.due_date,
                    amount: payment.amount,
                });
                booking.reminders_sent.push(kind);
                changed = true;
                sent += 1;
            }

            if changed {
                booking.touch();
                let id = booking.id;
                self.stores.bookings.update(&id, booking).await?;
            }
        }
        Ok(sent)
    }

    /// Remind guests of confirmed stays starting within the reminder window
    pub async fn run_check_in_reminders(&self, now: DateTime<Utc>) -> DerlgResult<usize> {
        let window = Duration::hours(self.config.check_in_reminder_hours);
        let mut candidates = self.stores.bookings.search("status", BookingStatus::Confirmed.as_str()).await?;
        candidates.retain(|b| !b.has_reminder(ReminderKind::CheckIn));

        let mut sent = 0;
        for candidate in candidates {
            let starts = candidate.check_in.and_time(chrono::NaiveTime::MIN).and_utc();
            if starts < now || starts - now > window {
                continue;
            }

            let _guard = self.payments.lock_booking(candidate.id).await;
            let Some(mut booking) = self.stores.bookings.get(&candidate.id).await? else {
                continue;
            };
            if booking.has_reminder(ReminderKind::CheckIn) {
                continue;
            }

            self.events.publish(ReminderEvent::CheckIn {
                booking_id: booking.id,
                user_id: booking.user_id,
                hotel_id: booking.hotel_id,
                check_in: booking.check_in,
            });
            booking.reminders_sent.push(ReminderKind::CheckIn);
            booking.touch();
            let id = booking.id;
            self.stores.bookings.update(&id, booking).await?;
            sent += 1;
        }
        Ok(sent)
    }

    /// Run [`tick`](Self::tick) every `interval_secs` until `shutdown` flips
    pub fn spawn(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        let period = std::time::Duration::from_secs(self.config.interval_secs.max(1));
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        match self.tick(Utc::now()).await {
                            Ok(report) if report != SweepReport::default() => {
                                tracing::info!(?report, "scheduler pass");
                            }
                            Ok(_) => {}
                            Err(e) => tracing::error!(error = %e, "scheduler pass failed"),
                        }
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            tracing::info!("scheduler stopped");
                            break;
                        }
                    }
                }
            }
        })
    }

    async fn occupying_bookings(&self) -> DerlgResult<Vec<Booking>> {
        let mut bookings = self.stores.bookings.search("status", BookingStatus::Pending.as_str()).await?;
        bookings.extend(self.stores.bookings.search("status", BookingStatus::Confirmed.as_str()).await?);
        Ok(bookings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::booking::model::fixtures::booking;
    use crate::config::AppConfig;
    use crate::payments::gateway::SimulatedGateway;
    use crate::payments::model::{PaymentTransaction, TransactionStatus};

    struct Harness {
        scheduler: EscrowScheduler,
        stores: Stores,
    }

    fn harness() -> Harness {
        let stores = Stores::in_memory();
        let events = Arc::new(EventBus::default());
        let config = AppConfig::default();
        let payments = Arc::new(PaymentService::new(
            stores.clone(),
            Arc::new(SimulatedGateway::new()),
            events.clone(),
            &config,
        ));
        let scheduler = EscrowScheduler::new(
            stores.clone(),
            payments,
            events,
            config.pricing.clone(),
            config.scheduler.clone(),
        );
        Harness { scheduler, stores }
    }

    #[tokio::test]
    async fn test_past_stays_complete_and_release_once() {
        let h = harness();
        let now = Utc::now();
        let mut b = booking(now.date_naive() - Duration::days(5), 2, 100.0);
        b.status = BookingStatus::Confirmed;
        b.payment.amount_paid = 100.0;
        let b = h.stores.bookings.create(b).await.unwrap();

        let mut tx = PaymentTransaction::new(
            b.id,
            b.user_id,
            b.hotel_id,
            "STRIPE-SIM-00000001".to_string(),
            b.payment.method,
            100.0,
            PaymentType::Full,
        );
        tx.status = TransactionStatus::Completed;
        let tx = h.stores.transactions.create(tx).await.unwrap();

        assert_eq!(h.scheduler.run_escrow_release(now).await.unwrap(), 1);
        let stored = h.stores.bookings.get(&b.id).await.unwrap().unwrap();
        assert_eq!(stored.status, BookingStatus::Completed);
        assert_eq!(stored.payment.escrow_status, EscrowStatus::Released);
        let tx = h.stores.transactions.get(&tx.id).await.unwrap().unwrap();
        assert_eq!(tx.escrow_status, EscrowStatus::Released);

        assert_eq!(h.scheduler.run_escrow_release(now).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_booking_hands_over_kept_share() {
        let h = harness();
        let now = Utc::now();
        let mut b = booking(now.date_naive() + Duration::days(12), 2, 200.0);
        b.status = BookingStatus::Cancelled;
        b.payment.amount_paid = 100.0;
        let b = h.stores.bookings.create(b).await.unwrap();

        let mut tx = PaymentTransaction::new(
            b.id,
            b.user_id,
            b.hotel_id,
            "PAYPAL-SIM-00000002".to_string(),
            b.payment.method,
            200.0,
            PaymentType::Full,
        );
        tx.status = TransactionStatus::Completed;
        tx.refund_amount = Some(100.0);
        let tx = h.stores.transactions.create(tx).await.unwrap();

        assert_eq!(h.scheduler.run_escrow_release(now).await.unwrap(), 1);
        let stored = h.stores.bookings.get(&b.id).await.unwrap().unwrap();
        assert_eq!(stored.status, BookingStatus::Cancelled);
        assert_eq!(stored.payment.escrow_status, EscrowStatus::Released);
        let tx = h.stores.transactions.get(&tx.id).await.unwrap().unwrap();
        assert_eq!(tx.escrow_status, EscrowStatus::Released);

        assert_eq!(h.scheduler.run_escrow_release(now).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_paid_milestone_gets_no_reminder() {
        let h = harness();
        let now = Utc::now();
        let mut b = booking(now.date_naive() + Duration::days(10), 2, 400.0);
        b.payment.plan = PaymentPlan::Milestone;
        b.status = BookingStatus::Confirmed;
        b.payment.amount_paid = 300.0;
        h.stores.bookings.create(b).await.unwrap();

        assert_eq!(h.scheduler.run_milestone_reminders(now).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_future_stays_are_left_alone() {
        let h = harness();
        let now = Utc::now();
        let mut b = booking(now.date_naive() + Duration::days(3), 2, 100.0);
        b.status = BookingStatus::Confirmed;
        h.stores.bookings.create(b).await.unwrap();

        assert_eq!(h.scheduler.run_escrow_release(now).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_milestone_reminders_sent_once() {
        let h = harness();
        let now = Utc::now();
        let mut b = booking(now.date_naive() + Duration::days(10), 2, 400.0);
        b.payment.plan = PaymentPlan::Milestone;
        b.status = BookingStatus::Confirmed;
        h.stores.bookings.create(b).await.unwrap();

        // Milestone 2 falls due in three days, inside the reminder window
        assert_eq!(h.scheduler.run_milestone_reminders(now).await.unwrap(), 1);
        assert_eq!(h.scheduler.run_milestone_reminders(now).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_check_in_reminder_window() {
        let h = harness();
        let now = Utc::now();
        let tomorrow = now.date_naive() + Duration::days(1);
        let mut soon = booking(tomorrow, 2, 100.0);
        soon.status = BookingStatus::Confirmed;
        let soon = h.stores.bookings.create(soon).await.unwrap();
        let mut later = booking(now.date_naive() + Duration::days(20), 2, 100.0);
        later.status = BookingStatus::Confirmed;
        h.stores.bookings.create(later).await.unwrap();

        assert_eq!(h.scheduler.run_check_in_reminders(now).await.unwrap(), 1);
        let stored = h.stores.bookings.get(&soon.id).await.unwrap().unwrap();
        assert!(stored.has_reminder(ReminderKind::CheckIn));
        assert_eq!(h.scheduler.run_check_in_reminders(now).await.unwrap(), 0);
    }
}

//! Booking creation, modification, cancellation and admin transitions
//!
//! Lock order is room, then user or booking, then promo code. Creation and
//! modification hold the room lock across the availability check and the
//! write; anything that moves money holds the booking lock of
//! [`PaymentService`]. Creation also holds the guest's lock while it spends
//! the student allowance.

use super::access::{ensure_can_view, ensure_owner};
use super::lifecycle::BookingStatus;
use super::model::{
    generate_booking_number, Booking, BookingPayment, BookingPaymentStatus, BookingView, Cancellation,
    GuestDetails, Guests, PaymentPlan, Pricing, RefundStatus,
};
use super::pricing::{
    amount_due_now, days_until_check_in, deposit_split, occupancy_rate, quote, refund_amount, round_cents,
    QuoteInput,
};
use crate::config::{AppConfig, PricingConfig};
use crate::core::auth::AuthContext;
use crate::core::error::{BookingError, DerlgResult, EntityError, PromoError};
use crate::core::events::{BookingEvent, EventBus};
use crate::core::locks::{KeyGuard, KeyedLocks};
use crate::core::query::{PaginatedResponse, QueryParams};
use crate::core::service::find_or_404;
use crate::core::validation::normalize_code;
use crate::entities::hotel::access::{ensure_hotel_staff, hotel_of_admin};
use crate::entities::hotel::Hotel;
use crate::entities::promo_code::{ApplicableTo, PromoAudience, PromoCode};
use crate::entities::room::Room;
use crate::entities::user::User;
use crate::payments::escrow::{EPSILON, payment_status};
use crate::payments::model::{EscrowStatus, PaymentMethod};
use crate::payments::options::{payment_options, PaymentOptions};
use crate::payments::PaymentService;
use crate::storage::Stores;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

fn one() -> u32 {
    1
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateBookingRequest {
    pub hotel_id: Uuid,
    pub room_id: Uuid,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    #[validate(nested)]
    pub guests: Guests,
    #[serde(default = "one")]
    #[validate(range(min = 1, max = 20))]
    pub room_count: u32,
    #[validate(nested)]
    pub guest_details: GuestDetails,
    pub payment_method: PaymentMethod,
    pub payment_type: PaymentPlan,
    pub deposit_percentage: Option<f64>,
    #[validate(length(min = 1, max = 50))]
    pub promo_code: Option<String>,
}

/// Price preview, nothing is stored
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct QuoteRequest {
    pub room_id: Uuid,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    #[serde(default = "one")]
    #[validate(range(min = 1, max = 20))]
    pub room_count: u32,
    pub deposit_percentage: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateBookingRequest {
    pub check_in: Option<NaiveDate>,
    pub check_out: Option<NaiveDate>,
    #[validate(nested)]
    pub guests: Option<Guests>,
    #[validate(range(min = 1, max = 20))]
    pub room_count: Option<u32>,
    #[validate(nested)]
    pub guest_details: Option<GuestDetails>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct CancelRequest {
    #[validate(length(max = 500))]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ApplyPromoRequest {
    #[validate(length(min = 1, max = 50))]
    pub code: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RejectRequest {
    #[validate(length(min = 1, max = 500))]
    pub reason: String,
}

/// `?status=&page=&limit=`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BookingListQuery {
    pub status: Option<BookingStatus>,
    pub page: Option<usize>,
    pub limit: Option<usize>,
}

impl BookingListQuery {
    fn params(&self) -> QueryParams {
        let defaults = QueryParams::default();
        QueryParams::new(self.page.unwrap_or(defaults.page), self.limit.unwrap_or(defaults.limit))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DateRangeQuery {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreatedBooking {
    pub booking: BookingView,
    pub amount_due: f64,
    pub payment_options: PaymentOptions,
}

#[derive(Debug, Clone, Serialize)]
pub struct StayQuote {
    pub nights: i64,
    pub pricing: Pricing,
    pub payment_options: PaymentOptions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionRequired {
    AdditionalPayment,
    Refund,
    None,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdatedBooking {
    pub booking: BookingView,
    pub price_difference: f64,
    pub action_required: ActionRequired,
    /// Captured money returned because the new total is lower
    pub refunded: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RefundSummary {
    pub amount: f64,
    pub percentage: f64,
    pub policy: String,
    pub status: RefundStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct CancelledBooking {
    pub booking: BookingView,
    pub refund: RefundSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct PromoApplied {
    pub booking: BookingView,
    pub savings: f64,
    pub promo_code: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoomAvailability {
    pub room_id: Uuid,
    pub room_type: String,
    pub total_rooms: u32,
    pub booked: u32,
    pub available: u32,
    pub price_per_night: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoomOccupancy {
    pub room_id: Uuid,
    pub room_type: String,
    pub booked_room_nights: u64,
    pub available_room_nights: u64,
    pub occupancy_rate: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Occupancy {
    pub hotel_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub occupancy_rate: f64,
    pub rooms: Vec<RoomOccupancy>,
}

pub struct BookingService {
    stores: Stores,
    payments: Arc<PaymentService>,
    events: Arc<EventBus>,
    rules: PricingConfig,
    room_locks: KeyedLocks,
    user_locks: KeyedLocks,
    promo_locks: KeyedLocks,
}

impl BookingService {
    pub fn new(stores: Stores, payments: Arc<PaymentService>, events: Arc<EventBus>, config: &AppConfig) -> Self {
        Self {
            stores,
            payments,
            events,
            rules: config.pricing.clone(),
            room_locks: KeyedLocks::new(),
            user_locks: KeyedLocks::new(),
            promo_locks: KeyedLocks::new(),
        }
    }

    pub async fn create(&self, auth: &AuthContext, request: CreateBookingRequest) -> DerlgResult<CreatedBooking> {
        let user_id = auth.require_user()?;
        let now = Utc::now();
        let nights = validate_dates(request.check_in, request.check_out, now.date_naive())?;

        let hotel = find_or_404(self.stores.hotels.as_ref(), &request.hotel_id).await?;
        if !hotel.is_bookable() {
            return Err(BookingError::HotelUnavailable { hotel_id: hotel.id }.into());
        }
        let room = self.room_of(&hotel, request.room_id).await?;
        check_capacity(&room, &request.guests, request.room_count)?;

        let deposit_percentage = match request.payment_type {
            PaymentPlan::Deposit => {
                let pct = request.deposit_percentage.unwrap_or(self.rules.deposit_percentage);
                deposit_split(0.0, pct, &self.rules)?;
                Some(pct)
            }
            _ => None,
        };

        let _room_guard = self.room_locks.acquire(room.id).await;
        let _user_guard = self.user_locks.acquire(user_id).await;
        let user = self.stores.users.get(&user_id).await?;
        let student = user.as_ref().is_some_and(|u| u.has_student_discount());

        let booked = self
            .booked_rooms(room.id, request.check_in, request.check_out, None)
            .await?;
        if booked + request.room_count > room.total_rooms {
            return Err(BookingError::RoomUnavailable { room_id: room.id }.into());
        }

        let mut input = QuoteInput {
            room_rate: room.price_per_night,
            nights,
            rooms: request.room_count,
            room_discount_percentage: room.discount_percentage,
            student,
            promo: None,
            plan: request.payment_type,
        };

        let promo = match &request.promo_code {
            Some(code) => {
                let base = promo_base(&quote(&input, &self.rules));
                Some(self.eligible_promo(code, &hotel, user_id, base, now).await?)
            }
            None => None,
        };
        input.promo = promo.as_ref();
        let pricing = quote(&input, &self.rules);
        if promo.is_some() && pricing.promo_discount <= 0.0 {
            return Err(PromoError::ZeroDiscount.into());
        }
        let locked_promo = match &promo {
            Some(promo) => Some(self.lock_promo(promo.id, now).await?),
            None => None,
        };

        let booking = Booking {
            id: Uuid::new_v4(),
            entity_type: "booking".to_string(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
            booking_number: generate_booking_number(now),
            user_id,
            hotel_id: hotel.id,
            room_id: room.id,
            check_in: request.check_in,
            check_out: request.check_out,
            guests: request.guests,
            room_count: request.room_count,
            guest_details: request.guest_details,
            pricing,
            payment: BookingPayment {
                method: request.payment_method,
                plan: request.payment_type,
                deposit_percentage,
                status: BookingPaymentStatus::Pending,
                transactions: Vec::new(),
                escrow_status: EscrowStatus::Held,
                amount_paid: 0.0,
            },
            status: BookingStatus::Pending,
            cancellation: None,
            reminders_sent: Vec::new(),
        };
        let booking = self.stores.bookings.create(booking).await?;

        let (_promo_guard, promo) = locked_promo.unzip();
        if let Err(e) = self.spend_allowances(promo, user, &booking).await {
            if let Err(cleanup) = self.stores.bookings.delete(&booking.id).await {
                tracing::error!(booking = %booking.booking_number, error = %cleanup, "booking rollback failed");
            }
            return Err(e);
        }

        tracing::info!(
            booking = %booking.booking_number,
            hotel = %booking.hotel_id,
            room = %booking.room_id,
            total = booking.pricing.total,
            "booking created"
        );
        self.events.publish(BookingEvent::Created {
            booking_id: booking.id,
            booking_number: booking.booking_number.clone(),
            user_id: booking.user_id,
            hotel_id: booking.hotel_id,
            total: booking.pricing.total,
        });

        let pct = deposit_percentage.unwrap_or(self.rules.deposit_percentage);
        let amount_due = amount_due_now(booking.pricing.total, booking.payment.plan, pct);
        let options = payment_options(
            pre_plan_total(&booking.pricing),
            pct,
            booking.check_in,
            now.date_naive(),
            &self.rules,
        )?;

        Ok(CreatedBooking {
            booking: BookingView::new(booking, now.date_naive()),
            amount_due,
            payment_options: options,
        })
    }

    /// The three payment plans for a prospective stay
    pub async fn quote_options(&self, auth: &AuthContext, request: QuoteRequest) -> DerlgResult<StayQuote> {
        let today = Utc::now().date_naive();
        let nights = validate_dates(request.check_in, request.check_out, today)?;
        let room = find_or_404(self.stores.rooms.as_ref(), &request.room_id).await?;
        if !room.is_bookable() {
            return Err(BookingError::RoomInactive { room_id: room.id }.into());
        }

        let student = match auth.user_id() {
            Some(id) => self
                .stores
                .users
                .get(&id)
                .await?
                .is_some_and(|u| u.has_student_discount()),
            None => false,
        };

        let pricing = quote(
            &QuoteInput {
                room_rate: room.price_per_night,
                nights,
                rooms: request.room_count,
                room_discount_percentage: room.discount_percentage,
                student,
                promo: None,
                plan: PaymentPlan::Deposit,
            },
            &self.rules,
        );
        let pct = request.deposit_percentage.unwrap_or(self.rules.deposit_percentage);
        let options = payment_options(pricing.total, pct, request.check_in, today, &self.rules)?;

        Ok(StayQuote {
            nights,
            pricing,
            payment_options: options,
        })
    }

    pub async fn update(
        &self,
        auth: &AuthContext,
        booking_id: Uuid,
        request: UpdateBookingRequest,
    ) -> DerlgResult<UpdatedBooking> {
        let now = Utc::now();
        let current = find_or_404(self.stores.bookings.as_ref(), &booking_id).await?;
        ensure_owner(auth, &current)?;

        let room = find_or_404(self.stores.rooms.as_ref(), &current.room_id).await?;
        let _room_guard = self.room_locks.acquire(room.id).await;
        let _booking_guard = self.payments.lock_booking(booking_id).await;
        let mut booking = find_or_404(self.stores.bookings.as_ref(), &booking_id).await?;
        self.ensure_modifiable(&booking, now)?;

        let check_in = request.check_in.unwrap_or(booking.check_in);
        let check_out = request.check_out.unwrap_or(booking.check_out);
        let nights = validate_dates(check_in, check_out, now.date_naive())?;
        let guests = request.guests.unwrap_or(booking.guests);
        let room_count = request.room_count.unwrap_or(booking.room_count);
        check_capacity(&room, &guests, room_count)?;

        let booked = self
            .booked_rooms(room.id, check_in, check_out, Some(booking.id))
            .await?;
        if booked + room_count > room.total_rooms {
            return Err(BookingError::RoomUnavailable { room_id: room.id }.into());
        }

        let promo = match &booking.pricing.promo_code {
            Some(code) => self.promo_by_code(code).await?,
            None => None,
        };
        let pricing = quote(
            &QuoteInput {
                room_rate: room.price_per_night,
                nights,
                rooms: room_count,
                room_discount_percentage: room.discount_percentage,
                student: booking.pricing.student_discount > 0.0,
                promo: promo.as_ref(),
                plan: booking.payment.plan,
            },
            &self.rules,
        );

        let price_difference = round_cents(pricing.total - booking.pricing.total);
        booking.check_in = check_in;
        booking.check_out = check_out;
        booking.guests = guests;
        booking.room_count = room_count;
        if let Some(details) = request.guest_details {
            booking.guest_details = details;
        }
        booking.pricing = pricing;

        let excess = round_cents(booking.payment.amount_paid - booking.pricing.total);
        let refunded = if excess > 0.0 {
            self.payments
                .refund_captured(&mut booking, excess, "Booking modified to a lower total")
                .await?
                .refunded
        } else {
            0.0
        };
        if booking.payment.amount_paid > 0.0 {
            booking.payment.status = payment_status(booking.pricing.total, booking.payment.amount_paid);
        }
        booking.touch();
        self.stores.bookings.update(&booking.id, booking.clone()).await?;

        let action_required = if price_difference > 0.0 && booking.outstanding() > 0.0 {
            ActionRequired::AdditionalPayment
        } else if price_difference < 0.0 && refunded > 0.0 {
            ActionRequired::Refund
        } else {
            ActionRequired::None
        };

        tracing::info!(
            booking = %booking.booking_number,
            price_difference,
            "booking modified"
        );
        self.events.publish(BookingEvent::Updated {
            booking_id: booking.id,
            user_id: booking.user_id,
            hotel_id: booking.hotel_id,
            price_difference,
        });

        Ok(UpdatedBooking {
            booking: BookingView::new(booking, now.date_naive()),
            price_difference,
            action_required,
            refunded,
        })
    }

    pub async fn cancel(
        &self,
        auth: &AuthContext,
        booking_id: Uuid,
        request: CancelRequest,
    ) -> DerlgResult<CancelledBooking> {
        let now = Utc::now();
        let _guard = self.payments.lock_booking(booking_id).await;
        let mut booking = find_or_404(self.stores.bookings.as_ref(), &booking_id).await?;
        ensure_owner(auth, &booking)?;
        booking.status = booking.status.transition(BookingStatus::Cancelled)?;

        let tier = refund_amount(
            booking.pricing.total,
            days_until_check_in(booking.check_in, now),
            &self.rules,
        );
        let paid = booking.payment.amount_paid;
        let due = round_cents(tier.amount.min(paid));

        let (refunded, status) = if paid <= 0.0 {
            (0.0, RefundStatus::NotApplicable)
        } else if due <= 0.0 {
            (0.0, RefundStatus::NoRefund)
        } else {
            let reason = request.reason.clone().unwrap_or_else(|| "Cancelled by guest".to_string());
            let outcome = self.payments.refund_captured(&mut booking, due, &reason).await?;
            (outcome.refunded, RefundStatus::Pending)
        };

        // The share the tier keeps belongs to the hotel
        if booking.payment.amount_paid >= EPSILON {
            self.payments.release_retained(&mut booking).await?;
        }

        booking.cancellation = Some(Cancellation {
            cancelled_at: now,
            reason: request.reason.unwrap_or_else(|| "Cancelled by guest".to_string()),
            refund_amount: refunded,
            refund_status: status,
            policy_applied: tier.policy.to_string(),
        });
        booking.touch();
        self.stores.bookings.update(&booking.id, booking.clone()).await?;

        tracing::info!(booking = %booking.booking_number, refunded, "booking cancelled");
        self.events.publish(BookingEvent::Cancelled {
            booking_id: booking.id,
            user_id: booking.user_id,
            hotel_id: booking.hotel_id,
            refund_amount: refunded,
        });

        Ok(CancelledBooking {
            booking: BookingView::new(booking, now.date_naive()),
            refund: RefundSummary {
                amount: refunded,
                percentage: tier.percentage,
                policy: tier.policy.to_string(),
                status,
            },
        })
    }

    pub async fn apply_promo(
        &self,
        auth: &AuthContext,
        booking_id: Uuid,
        request: ApplyPromoRequest,
    ) -> DerlgResult<PromoApplied> {
        let now = Utc::now();
        let _guard = self.payments.lock_booking(booking_id).await;
        let mut booking = find_or_404(self.stores.bookings.as_ref(), &booking_id).await?;
        ensure_owner(auth, &booking)?;

        if booking.status != BookingStatus::Pending {
            return Err(PromoError::BookingNotPending.into());
        }
        if booking.pricing.promo_code.is_some() {
            return Err(PromoError::AlreadyApplied.into());
        }

        let hotel = find_or_404(self.stores.hotels.as_ref(), &booking.hotel_id).await?;
        let promo = self
            .eligible_promo(&request.code, &hotel, booking.user_id, promo_base(&booking.pricing), now)
            .await?;

        let previous = booking.pricing.total;
        let pricing = quote(
            &QuoteInput {
                room_rate: booking.pricing.room_rate,
                nights: booking.nights(),
                rooms: booking.room_count,
                room_discount_percentage: booked_discount_percentage(&booking.pricing),
                student: booking.pricing.student_discount > 0.0,
                promo: Some(&promo),
                plan: booking.payment.plan,
            },
            &self.rules,
        );
        if pricing.promo_discount <= 0.0 {
            return Err(PromoError::ZeroDiscount.into());
        }
        if booking.payment.amount_paid > pricing.total {
            return Err(PromoError::Invalid {
                reason: "The amount already paid exceeds the discounted total".to_string(),
            }
            .into());
        }

        let (_promo_guard, fresh) = self.lock_promo(promo.id, now).await?;
        let before = booking.clone();
        booking.pricing = pricing;
        if booking.payment.amount_paid > 0.0 {
            booking.payment.status = payment_status(booking.pricing.total, booking.payment.amount_paid);
        }
        booking.touch();
        self.stores.bookings.update(&booking.id, booking.clone()).await?;
        if let Err(e) = self.count_promo_use(fresh).await {
            if let Err(cleanup) = self.stores.bookings.update(&before.id, before.clone()).await {
                tracing::error!(booking = %before.booking_number, error = %cleanup, "promo rollback failed");
            }
            return Err(e);
        }

        let savings = round_cents(previous - booking.pricing.total);
        tracing::info!(booking = %booking.booking_number, code = %promo.code, savings, "promo code applied");

        Ok(PromoApplied {
            booking: BookingView::new(booking, now.date_naive()),
            savings,
            promo_code: promo.code,
        })
    }

    pub async fn confirm(&self, auth: &AuthContext, booking_id: Uuid) -> DerlgResult<BookingView> {
        let _guard = self.payments.lock_booking(booking_id).await;
        let mut booking = find_or_404(self.stores.bookings.as_ref(), &booking_id).await?;
        ensure_hotel_staff(self.stores.hotels.as_ref(), auth, booking.hotel_id).await?;

        booking.status = booking.status.transition(BookingStatus::Confirmed)?;
        booking.touch();
        self.stores.bookings.update(&booking.id, booking.clone()).await?;

        tracing::info!(booking = %booking.booking_number, actor = %auth.actor(), "booking confirmed");
        self.events.publish(BookingEvent::Confirmed {
            booking_id: booking.id,
            user_id: booking.user_id,
            hotel_id: booking.hotel_id,
        });
        Ok(BookingView::new(booking, Utc::now().date_naive()))
    }

    /// Reject and return everything captured
    pub async fn reject(&self, auth: &AuthContext, booking_id: Uuid, request: RejectRequest) -> DerlgResult<BookingView> {
        let now = Utc::now();
        let _guard = self.payments.lock_booking(booking_id).await;
        let mut booking = find_or_404(self.stores.bookings.as_ref(), &booking_id).await?;
        ensure_hotel_staff(self.stores.hotels.as_ref(), auth, booking.hotel_id).await?;
        booking.status = booking.status.transition(BookingStatus::Rejected)?;

        let paid = booking.payment.amount_paid;
        let refunded = if paid > 0.0 {
            self.payments
                .refund_captured(&mut booking, paid, &request.reason)
                .await?
                .refunded
        } else {
            0.0
        };

        booking.cancellation = Some(Cancellation {
            cancelled_at: now,
            reason: request.reason.clone(),
            refund_amount: refunded,
            refund_status: if paid > 0.0 {
                RefundStatus::Pending
            } else {
                RefundStatus::NotApplicable
            },
            policy_applied: "Rejected by hotel, full refund".to_string(),
        });
        booking.touch();
        self.stores.bookings.update(&booking.id, booking.clone()).await?;

        tracing::info!(booking = %booking.booking_number, refunded, "booking rejected");
        self.events.publish(BookingEvent::Rejected {
            booking_id: booking.id,
            user_id: booking.user_id,
            hotel_id: booking.hotel_id,
            reason: request.reason,
        });
        Ok(BookingView::new(booking, now.date_naive()))
    }

    /// Complete the stay and release its escrow
    pub async fn complete(&self, auth: &AuthContext, booking_id: Uuid) -> DerlgResult<BookingView> {
        let _guard = self.payments.lock_booking(booking_id).await;
        let mut booking = find_or_404(self.stores.bookings.as_ref(), &booking_id).await?;
        ensure_hotel_staff(self.stores.hotels.as_ref(), auth, booking.hotel_id).await?;

        booking.status = booking.status.transition(BookingStatus::Completed)?;
        self.payments.release_held(&mut booking).await?;
        self.stores.bookings.update(&booking.id, booking.clone()).await?;

        self.events.publish(BookingEvent::Completed {
            booking_id: booking.id,
            user_id: booking.user_id,
            hotel_id: booking.hotel_id,
        });
        Ok(BookingView::new(booking, Utc::now().date_naive()))
    }

    pub async fn get(&self, auth: &AuthContext, booking_id: Uuid) -> DerlgResult<BookingView> {
        let booking = find_or_404(self.stores.bookings.as_ref(), &booking_id).await?;
        ensure_can_view(&self.stores, auth, &booking).await?;
        Ok(BookingView::new(booking, Utc::now().date_naive()))
    }

    /// The caller's bookings, newest first
    pub async fn list_mine(
        &self,
        auth: &AuthContext,
        query: &BookingListQuery,
    ) -> DerlgResult<PaginatedResponse<BookingView>> {
        let user_id = auth.require_user()?;
        let bookings = self.stores.bookings.search("user_id", &user_id.to_string()).await?;
        Ok(page_of(bookings, query))
    }

    /// Bookings of the hotel the calling admin manages
    pub async fn list_for_my_hotel(
        &self,
        auth: &AuthContext,
        query: &BookingListQuery,
    ) -> DerlgResult<PaginatedResponse<BookingView>> {
        let hotel = hotel_of_admin(self.stores.hotels.as_ref(), auth).await?;
        self.list_for_hotel(auth, hotel.id, query).await
    }

    pub async fn list_for_hotel(
        &self,
        auth: &AuthContext,
        hotel_id: Uuid,
        query: &BookingListQuery,
    ) -> DerlgResult<PaginatedResponse<BookingView>> {
        ensure_hotel_staff(self.stores.hotels.as_ref(), auth, hotel_id).await?;
        let bookings = self.stores.bookings.search("hotel_id", &hotel_id.to_string()).await?;
        Ok(page_of(bookings, query))
    }

    /// Free units of every active room of a hotel for a stay
    pub async fn availability(
        &self,
        hotel_id: Uuid,
        check_in: NaiveDate,
        check_out: NaiveDate,
    ) -> DerlgResult<Vec<RoomAvailability>> {
        validate_dates(check_in, check_out, Utc::now().date_naive())?;
        find_or_404(self.stores.hotels.as_ref(), &hotel_id).await?;

        let mut out = Vec::new();
        for room in self.rooms_of(hotel_id).await? {
            let booked = self.booked_rooms(room.id, check_in, check_out, None).await?;
            out.push(RoomAvailability {
                room_id: room.id,
                room_type: room.room_type.clone(),
                total_rooms: room.total_rooms,
                booked,
                available: room.total_rooms.saturating_sub(booked),
                price_per_night: room.discounted_rate(),
            });
        }
        Ok(out)
    }

    /// Room-night occupancy of a hotel over `[start, end)`
    pub async fn occupancy(
        &self,
        auth: &AuthContext,
        hotel_id: Uuid,
        range: &DateRangeQuery,
    ) -> DerlgResult<Occupancy> {
        ensure_hotel_staff(self.stores.hotels.as_ref(), auth, hotel_id).await?;
        let span = (range.end_date - range.start_date).num_days();
        if span <= 0 {
            return Err(BookingError::InvalidDates {
                message: "end_date must be after start_date".to_string(),
            }
            .into());
        }

        let bookings: Vec<Booking> = self
            .stores
            .bookings
            .search("hotel_id", &hotel_id.to_string())
            .await?
            .into_iter()
            .filter(|b| {
                matches!(b.status, BookingStatus::Confirmed | BookingStatus::Completed)
                    && b.overlaps(range.start_date, range.end_date)
            })
            .collect();

        let span = span as u64;
        let mut rooms = Vec::new();
        let (mut booked_total, mut available_total) = (0u64, 0u64);
        for room in self.rooms_of(hotel_id).await? {
            let booked = bookings
                .iter()
                .filter(|b| b.room_id == room.id)
                .map(|b| {
                    let from = b.check_in.max(range.start_date);
                    let to = b.check_out.min(range.end_date);
                    ((to - from).num_days().max(0) as u64).saturating_mul(u64::from(b.room_count))
                })
                .fold(0u64, u64::saturating_add);
            let available = u64::from(room.total_rooms).saturating_mul(span);
            booked_total = booked_total.saturating_add(booked);
            available_total = available_total.saturating_add(available);
            rooms.push(RoomOccupancy {
                room_id: room.id,
                room_type: room.room_type.clone(),
                booked_room_nights: booked,
                available_room_nights: available,
                occupancy_rate: occupancy_rate(booked, available),
            });
        }

        Ok(Occupancy {
            hotel_id,
            start_date: range.start_date,
            end_date: range.end_date,
            occupancy_rate: occupancy_rate(booked_total, available_total),
            rooms,
        })
    }

    /// Units of `room_id` held by pending or confirmed stays overlapping the range
    async fn booked_rooms(
        &self,
        room_id: Uuid,
        check_in: NaiveDate,
        check_out: NaiveDate,
        exclude: Option<Uuid>,
    ) -> DerlgResult<u32> {
        Ok(self
            .stores
            .bookings
            .search("room_id", &room_id.to_string())
            .await?
            .iter()
            .filter(|b| Some(b.id) != exclude && b.status.occupies_room() && b.overlaps(check_in, check_out))
            .map(|b| b.room_count)
            .sum())
    }

    async fn room_of(&self, hotel: &Hotel, room_id: Uuid) -> DerlgResult<Room> {
        let room = find_or_404(self.stores.rooms.as_ref(), &room_id).await?;
        if room.hotel_id != hotel.id {
            return Err(EntityError::not_found("room", room_id).into());
        }
        if !room.is_bookable() {
            return Err(BookingError::RoomInactive { room_id }.into());
        }
        Ok(room)
    }

    async fn rooms_of(&self, hotel_id: Uuid) -> DerlgResult<Vec<Room>> {
        let mut rooms: Vec<Room> = self
            .stores
            .rooms
            .search("hotel_id", &hotel_id.to_string())
            .await?
            .into_iter()
            .filter(Room::is_bookable)
            .collect();
        rooms.sort_by(|a, b| a.room_type.cmp(&b.room_type));
        Ok(rooms)
    }

    fn ensure_modifiable(&self, booking: &Booking, now: DateTime<Utc>) -> DerlgResult<()> {
        if !booking.status.occupies_room() {
            return Err(BookingError::CannotBeModified {
                reason: format!("bookings in status '{}' cannot be modified", booking.status),
            }
            .into());
        }
        let starts = booking.check_in.and_time(NaiveTime::MIN).and_utc();
        if (starts - now).num_hours() < self.rules.modification_cutoff_hours {
            return Err(BookingError::CannotBeModified {
                reason: format!(
                    "changes are only allowed up to {} hours before check-in",
                    self.rules.modification_cutoff_hours
                ),
            }
            .into());
        }
        Ok(())
    }

    async fn promo_by_code(&self, code: &str) -> DerlgResult<Option<PromoCode>> {
        Ok(self
            .stores
            .promo_codes
            .search("code", &normalize_code(code))
            .await?
            .into_iter()
            .find(|p| p.deleted_at.is_none()))
    }

    /// Look up a code and check it against the hotel, the guest and `amount`
    pub async fn eligible_promo(
        &self,
        code: &str,
        hotel: &Hotel,
        user_id: Uuid,
        amount: f64,
        now: DateTime<Utc>,
    ) -> DerlgResult<PromoCode> {
        let promo = self.promo_by_code(code).await?.ok_or_else(|| PromoError::NotFound {
            code: normalize_code(code),
        })?;
        promo.check_validity(now)?;

        if !promo.can_apply_to(ApplicableTo::Hotels, hotel.id) {
            return Err(PromoError::NotApplicable.into());
        }
        if amount < promo.min_booking_amount {
            return Err(PromoError::MinimumNotMet {
                minimum: promo.min_booking_amount,
            }
            .into());
        }

        if promo.user_type != PromoAudience::All {
            let completed = self
                .stores
                .bookings
                .search("user_id", &user_id.to_string())
                .await?
                .iter()
                .filter(|b| b.status == BookingStatus::Completed)
                .count();
            match promo.user_type {
                PromoAudience::New if completed > 0 => {
                    return Err(PromoError::UserNotEligible {
                        reason: "This promo code is only for new customers".to_string(),
                    }
                    .into());
                }
                PromoAudience::Returning if completed == 0 => {
                    return Err(PromoError::UserNotEligible {
                        reason: "This promo code is only for returning customers".to_string(),
                    }
                    .into());
                }
                _ => {}
            }
        }
        Ok(promo)
    }

    /// Lock a promo code and re-check its limits against the stored record
    async fn lock_promo(&self, promo_id: Uuid, now: DateTime<Utc>) -> DerlgResult<(KeyGuard<'_>, PromoCode)> {
        let guard = self.promo_locks.acquire(promo_id).await;
        let promo = find_or_404(self.stores.promo_codes.as_ref(), &promo_id).await?;
        promo.check_validity(now)?;
        Ok((guard, promo))
    }

    /// Count one use of a code held through [`lock_promo`](Self::lock_promo)
    async fn count_promo_use(&self, mut promo: PromoCode) -> DerlgResult<()> {
        promo.usage_count += 1;
        promo.touch();
        let id = promo.id;
        self.stores.promo_codes.update(&id, promo).await?;
        Ok(())
    }

    /// Spend what a stored booking used: its promo code and one student booking
    ///
    /// The caller holds the guest's lock and the promo lock, and `user` was
    /// read under the former.
    async fn spend_allowances(&self, promo: Option<PromoCode>, user: Option<User>, booking: &Booking) -> DerlgResult<()> {
        if let Some(promo) = promo {
            self.count_promo_use(promo).await?;
        }
        if let Some(mut user) = user.filter(|_| booking.pricing.student_discount > 0.0) {
            user.student_discount_remaining = user.student_discount_remaining.saturating_sub(1);
            user.touch();
            let id = user.id;
            self.stores.users.update(&id, user).await?;
        }
        Ok(())
    }
}

/// Nights of a stay, rejecting past check-ins and empty stays
pub fn validate_dates(check_in: NaiveDate, check_out: NaiveDate, today: NaiveDate) -> DerlgResult<i64> {
    if check_in < today {
        return Err(BookingError::InvalidDates {
            message: "check-in date cannot be in the past".to_string(),
        }
        .into());
    }
    let nights = (check_out - check_in).num_days();
    if nights <= 0 {
        return Err(BookingError::InvalidDates {
            message: "check-out must be after check-in".to_string(),
        }
        .into());
    }
    Ok(nights)
}

fn check_capacity(room: &Room, guests: &Guests, room_count: u32) -> DerlgResult<()> {
    let capacity = room.capacity.saturating_mul(room_count);
    if guests.total() > capacity {
        return Err(BookingError::CapacityExceeded {
            capacity,
            requested: guests.total(),
        }
        .into());
    }
    Ok(())
}

/// What a promo code is measured against: the stay after room and student discounts
fn promo_base(pricing: &Pricing) -> f64 {
    round_cents((pricing.subtotal - pricing.discount - pricing.student_discount).max(0.0))
}

/// Taxed total before any payment-plan discount
fn pre_plan_total(pricing: &Pricing) -> f64 {
    round_cents(pricing.total + pricing.payment_discount)
}

fn booked_discount_percentage(pricing: &Pricing) -> f64 {
    if pricing.subtotal > 0.0 {
        pricing.discount / pricing.subtotal * 100.0
    } else {
        0.0
    }
}

fn page_of(mut bookings: Vec<Booking>, query: &BookingListQuery) -> PaginatedResponse<BookingView> {
    if let Some(status) = query.status {
        bookings.retain(|b| b.status == status);
    }
    bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    let today = Utc::now().date_naive();
    PaginatedResponse::from_items(bookings, &query.params()).map(|b| BookingView::new(b, today))
}

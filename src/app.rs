//! Shared application state handed to every route

use crate::booking::BookingService;
use crate::config::AppConfig;
use crate::core::events::EventBus;
use crate::payments::{EscrowScheduler, PaymentGateway, PaymentService, SimulatedGateway};
use crate::storage::Stores;
use std::sync::Arc;

/// Stores, configuration and the domain services
///
/// Cheap to clone; every field is reference counted.
#[derive(Clone)]
pub struct AppState {
    pub stores: Stores,
    pub config: Arc<AppConfig>,
    pub events: Arc<EventBus>,
    pub bookings: Arc<BookingService>,
    pub payments: Arc<PaymentService>,
}

impl AppState {
    pub fn new(config: AppConfig, stores: Stores, gateway: Arc<dyn PaymentGateway>) -> Self {
        let events = Arc::new(EventBus::new(config.events.capacity));
        let payments = Arc::new(PaymentService::new(stores.clone(), gateway, events.clone(), &config));
        let bookings = Arc::new(BookingService::new(
            stores.clone(),
            payments.clone(),
            events.clone(),
            &config,
        ));

        Self {
            stores,
            config: Arc::new(config),
            events,
            bookings,
            payments,
        }
    }

    /// In-memory stores and the simulated gateway
    pub fn in_memory(config: AppConfig) -> Self {
        Self::new(config, Stores::in_memory(), Arc::new(SimulatedGateway::new()))
    }

    pub fn scheduler(&self) -> EscrowScheduler {
        EscrowScheduler::new(
            self.stores.clone(),
            self.payments.clone(),
            self.events.clone(),
            self.config.pricing.clone(),
            self.config.scheduler.clone(),
        )
    }
}

//! # DerLg booking platform API
//!
//! Backend of a Cambodian tourism marketplace: hotels and their rooms,
//! bookings with deposit and milestone payment plans, escrowed payments,
//! promo codes, and the tour, event and guide catalogs around them.
//!
//! ## Layout
//!
//! - [`booking`]: pricing rules, the booking state machine and its service
//! - [`payments`]: gateways, escrow, refunds and the background scheduler
//! - [`entities`]: catalog and platform records with their routes
//! - [`core`]: errors, identity, validation, events and storage traits
//! - [`storage`]: in-memory and MySQL backends
//! - [`server`]: module registration, REST exposure and rate limiting
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use derlg::prelude::*;
//!
//! let state = AppState::in_memory(AppConfig::default());
//! let app = ServerBuilder::new(state.clone())
//!     .register_module(PlatformModule::new(state))
//!     .build()?;
//! ```

pub mod app;
pub mod booking;
pub mod config;
pub mod core;
pub mod entities;
pub mod payments;
pub mod server;
pub mod storage;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Core ===
    pub use crate::core::{
        ApiResponse, AuthContext, AuthPolicy, Data, DataService, DerlgError, DerlgResult, Entity,
        EventBus, FieldValue, Module, PaginatedResponse, PathId, PlatformEvent, QueryParams, Role,
        ValidatedJson,
    };

    // === Macros ===
    pub use crate::impl_data_entity;

    // === Domain ===
    pub use crate::app::AppState;
    pub use crate::booking::{Booking, BookingService, BookingStatus};
    pub use crate::payments::{PaymentGateway, PaymentService, PaymentTransaction, SimulatedGateway};

    // === Storage ===
    pub use crate::storage::{InMemoryDataService, Stores};

    // === Config ===
    pub use crate::config::AppConfig;

    // === Server ===
    pub use crate::server::{EntityDescriptor, EntityRegistry, PlatformModule, ServerBuilder};

    // === External dependencies ===
    pub use anyhow::Result;
    pub use async_trait::async_trait;
    pub use chrono::{DateTime, Utc};
    pub use serde::{Deserialize, Serialize};
    pub use uuid::Uuid;

    // === Axum ===
    pub use axum::{
        Router,
        extract::{Path, State},
        routing::{delete, get, post, put},
    };
}

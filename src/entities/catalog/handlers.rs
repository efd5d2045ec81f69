//! Catalog rules and the event listings beyond plain CRUD

use super::model::{guide_status, vehicle_status, Event, Guide, Tour, Transportation};
use crate::core::entity::Entity;
use crate::core::error::{DerlgResult, ValidationError};
use crate::core::query::{PaginatedResponse, QueryParams};
use crate::core::service::DataService;
use crate::core::validation::PHONE_RE;
use crate::entities::crud::{CatalogResource, CatalogState};
use crate::storage::Stores;
use axum::extract::{Query, State};
use axum::Json;
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use std::sync::Arc;

impl CatalogResource for Tour {
    fn store(stores: &Stores) -> Arc<dyn DataService<Self>> {
        stores.tours.clone()
    }

    fn check(&self) -> Result<(), ValidationError> {
        if self.price_per_person < 0.0 {
            return Err(ValidationError::field("price_per_person", "must not be negative"));
        }
        if self.group_size.min == 0 || self.group_size.min > self.group_size.max {
            return Err(ValidationError::field("group_size", "min must be at least 1 and at most max"));
        }
        if self.duration.days == 0 {
            return Err(ValidationError::field("duration", "a tour lasts at least one day"));
        }
        Ok(())
    }

    fn mark_deleted(&mut self) {
        self.soft_delete();
    }
}

impl CatalogResource for Event {
    fn store(stores: &Stores) -> Arc<dyn DataService<Self>> {
        stores.events.clone()
    }

    fn check(&self) -> Result<(), ValidationError> {
        if self.end_date < self.start_date {
            return Err(ValidationError::field("end_date", "must not be before start_date"));
        }
        if self.pricing.base_price < 0.0 {
            return Err(ValidationError::field("pricing", "base_price must not be negative"));
        }
        Ok(())
    }

    fn mark_deleted(&mut self) {
        self.soft_delete();
    }
}

impl CatalogResource for Guide {
    fn store(stores: &Stores) -> Arc<dyn DataService<Self>> {
        stores.guides.clone()
    }

    fn default_status() -> &'static str {
        guide_status::AVAILABLE
    }

    fn check(&self) -> Result<(), ValidationError> {
        if !guide_status::ALL.contains(&self.status.as_str()) {
            return Err(ValidationError::field(
                "status",
                format!("must be one of {}", guide_status::ALL.join(", ")),
            ));
        }
        if !PHONE_RE.is_match(&self.phone) {
            return Err(ValidationError::field("phone", "invalid phone number"));
        }
        Ok(())
    }

    fn mark_deleted(&mut self) {
        self.soft_delete();
    }
}

impl CatalogResource for Transportation {
    fn store(stores: &Stores) -> Arc<dyn DataService<Self>> {
        stores.transportation.clone()
    }

    fn default_status() -> &'static str {
        vehicle_status::AVAILABLE
    }

    fn check(&self) -> Result<(), ValidationError> {
        if !vehicle_status::ALL.contains(&self.status.as_str()) {
            return Err(ValidationError::field(
                "status",
                format!("must be one of {}", vehicle_status::ALL.join(", ")),
            ));
        }
        if self.capacity == 0 {
            return Err(ValidationError::field("capacity", "must be at least 1"));
        }
        if !PHONE_RE.is_match(&self.phone) {
            return Err(ValidationError::field("phone", "invalid phone number"));
        }
        Ok(())
    }

    fn mark_deleted(&mut self) {
        self.status = vehicle_status::UNAVAILABLE.to_string();
        self.last_status_update = Some(Utc::now());
        self.soft_delete();
    }
}

#[derive(Debug, Deserialize)]
pub struct EventDateQuery {
    pub date: NaiveDate,
    #[serde(default = "first_page")]
    pub page: usize,
    #[serde(default = "page_size")]
    pub limit: usize,
}

fn first_page() -> usize {
    1
}

fn page_size() -> usize {
    20
}

async fn live_events(store: &dyn DataService<Event>) -> DerlgResult<Vec<Event>> {
    Ok(store
        .list()
        .await?
        .into_iter()
        .filter(|event| !event.is_deleted() && event.status == "active")
        .collect())
}

/// Active events running on the given day, earliest start first
pub async fn events_on_date(
    State(state): State<CatalogState<Event>>,
    Query(query): Query<EventDateQuery>,
) -> DerlgResult<Json<PaginatedResponse<Event>>> {
    let mut events: Vec<Event> = live_events(state.store.as_ref())
        .await?
        .into_iter()
        .filter(|event| event.runs_on(query.date))
        .collect();
    events.sort_by_key(|event| event.start_date);

    let params = QueryParams::new(query.page, query.limit);
    Ok(Json(PaginatedResponse::from_items(events, &params)))
}

/// Active events that have not started yet
pub async fn upcoming_events(
    State(state): State<CatalogState<Event>>,
    Query(params): Query<QueryParams>,
) -> DerlgResult<Json<PaginatedResponse<Event>>> {
    let today = Utc::now().date_naive();
    let mut events: Vec<Event> = live_events(state.store.as_ref())
        .await?
        .into_iter()
        .filter(|event| event.is_upcoming(today))
        .collect();
    events.sort_by_key(|event| event.start_date);
    Ok(Json(PaginatedResponse::from_items(events, &params)))
}

//! Routes of the tour, event, guide and transportation catalogs

use super::handlers::{events_on_date, upcoming_events};
use super::model::{Event, Guide, Tour, Transportation};
use crate::app::AppState;
use crate::entities::crud::{CatalogDescriptor, CatalogState};
use crate::server::entity_registry::EntityDescriptor;
use axum::routing::get;
use axum::Router;

/// Public read, super-admin write for every catalog resource
pub fn descriptors(state: &AppState) -> Vec<Box<dyn EntityDescriptor>> {
    let events = CatalogState::<Event>::new(&state.stores, state.events.clone());
    let event_routes = Router::new()
        .route("/events/by-date", get(events_on_date))
        .route("/events/upcoming", get(upcoming_events))
        .with_state(events.clone());

    vec![
        Box::new(CatalogDescriptor::new(CatalogState::<Tour>::new(
            &state.stores,
            state.events.clone(),
        ))),
        Box::new(CatalogDescriptor::new(events).with_routes(event_routes)),
        Box::new(CatalogDescriptor::new(CatalogState::<Guide>::new(
            &state.stores,
            state.events.clone(),
        ))),
        Box::new(CatalogDescriptor::new(CatalogState::<Transportation>::new(
            &state.stores,
            state.events.clone(),
        ))),
    ]
}

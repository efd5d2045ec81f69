//! Server host: the state every exposure is built from
//!
//! The host owns the application state and the registry of resource routes.
//! It knows nothing about HTTP; [`RestExposure`](super::exposure::RestExposure)
//! turns it into a router.

use crate::app::AppState;
use crate::core::events::EventBus;
use crate::server::entity_registry::EntityRegistry;
use std::sync::Arc;

pub struct ServerHost {
    /// Stores, configuration and domain services
    pub state: AppState,

    /// Routes of every registered resource
    pub entity_registry: EntityRegistry,
}

impl ServerHost {
    pub fn new(state: AppState, entity_registry: EntityRegistry) -> Self {
        Self {
            state,
            entity_registry,
        }
    }

    /// Get entity types registered in the host
    pub fn entity_types(&self) -> Vec<&str> {
        self.entity_registry.entity_types()
    }

    /// A host without resources serves nothing but health checks
    pub fn is_ready(&self) -> bool {
        !self.entity_registry.entity_types().is_empty()
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.state.events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::core::module::Module;
    use crate::server::module::PlatformModule;

    #[test]
    fn test_empty_host_is_not_ready() {
        let host = ServerHost::new(AppState::in_memory(AppConfig::default()), EntityRegistry::new());
        assert!(!host.is_ready());
        assert!(host.entity_types().is_empty());
    }

    #[test]
    fn test_host_shares_the_state_event_bus() {
        let state = AppState::in_memory(AppConfig::default());
        let mut registry = EntityRegistry::new();
        PlatformModule::new(state.clone()).register_entities(&mut registry);

        let host = ServerHost::new(state.clone(), registry);
        assert!(host.is_ready());
        assert!(Arc::ptr_eq(host.event_bus(), &state.events));
    }
}

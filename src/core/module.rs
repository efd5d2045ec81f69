//! Module system
//!
//! A module groups the entity descriptors of one area of the platform and
//! registers their routes with the server.

use crate::server::entity_registry::EntityRegistry;

pub trait Module: Send + Sync {
    /// Unique name of this module
    fn name(&self) -> &str;

    /// Module version
    fn version(&self) -> &str {
        "1.0.0"
    }

    /// Entity types managed by this module
    fn entity_types(&self) -> Vec<&str>;

    /// Register entity descriptors with the registry
    fn register_entities(&self, registry: &mut EntityRegistry);
}

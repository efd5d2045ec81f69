//! Registry of resource descriptors and the routes they contribute

use axum::Router;
use std::collections::HashMap;

/// How one resource contributes routes to the API
///
/// Routes are relative to `/api` and already carry their state, e.g.
/// `GET /hotels`, `POST /hotels` and `GET /hotels/{id}`.
pub trait EntityDescriptor: Send + Sync {
    /// The entity type name (singular, e.g. "booking")
    fn entity_type(&self) -> &str;

    /// The plural form (e.g. "bookings")
    fn plural(&self) -> &str;

    fn build_routes(&self) -> Router;
}

/// Descriptors of every registered resource, keyed by entity type
#[derive(Default)]
pub struct EntityRegistry {
    descriptors: HashMap<String, Box<dyn EntityDescriptor>>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self {
            descriptors: HashMap::new(),
        }
    }

    /// Register a descriptor; a second one for the same type replaces the first
    pub fn register(&mut self, descriptor: Box<dyn EntityDescriptor>) {
        let entity_type = descriptor.entity_type().to_string();
        if self.descriptors.contains_key(&entity_type) {
            tracing::warn!(entity_type = %entity_type, "replacing registered descriptor");
        }
        self.descriptors.insert(entity_type, descriptor);
    }

    /// Merge the routes of every registered resource
    ///
    /// Panics if two resources declare the same method on the same path,
    /// which axum reports when merging.
    pub fn build_routes(&self) -> Router {
        let mut router = Router::new();

        for descriptor in self.descriptors.values() {
            router = router.merge(descriptor.build_routes());
        }

        router
    }

    pub fn entity_types(&self) -> Vec<&str> {
        self.descriptors.keys().map(|s| s.as_str()).collect()
    }

    pub fn plural_of(&self, entity_type: &str) -> Option<&str> {
        self.descriptors.get(entity_type).map(|d| d.plural())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::get;

    struct MockDescriptor {
        entity_type: String,
        plural: String,
    }

    impl MockDescriptor {
        fn new(entity_type: &str, plural: &str) -> Self {
            Self {
                entity_type: entity_type.to_string(),
                plural: plural.to_string(),
            }
        }
    }

    impl EntityDescriptor for MockDescriptor {
        fn entity_type(&self) -> &str {
            &self.entity_type
        }

        fn plural(&self) -> &str {
            &self.plural
        }

        fn build_routes(&self) -> Router {
            let path = format!("/{}", self.plural);
            Router::new().route(&path, get(|| async { "[]" }))
        }
    }

    #[test]
    fn test_new_registry_is_empty() {
        let registry = EntityRegistry::new();
        assert!(registry.entity_types().is_empty());
        assert!(EntityRegistry::default().entity_types().is_empty());
    }

    #[test]
    fn test_register_multiple_entities() {
        let mut registry = EntityRegistry::new();
        registry.register(Box::new(MockDescriptor::new("hotel", "hotels")));
        registry.register(Box::new(MockDescriptor::new("review", "reviews")));
        registry.register(Box::new(MockDescriptor::new("wishlist", "wishlists")));
        assert_eq!(registry.entity_types().len(), 3);
        assert_eq!(registry.plural_of("review"), Some("reviews"));
        assert_eq!(registry.plural_of("booking"), None);
    }

    #[test]
    fn test_register_duplicate_replaces() {
        let mut registry = EntityRegistry::new();
        registry.register(Box::new(MockDescriptor::new("tour", "tours")));
        registry.register(Box::new(MockDescriptor::new("tour", "excursions")));
        assert_eq!(registry.entity_types().len(), 1);
        assert_eq!(registry.plural_of("tour"), Some("excursions"));
    }

    #[test]
    fn test_build_routes_with_entities() {
        let mut registry = EntityRegistry::new();
        registry.register(Box::new(MockDescriptor::new("tour", "tours")));
        registry.register(Box::new(MockDescriptor::new("event", "events")));
        let _router = registry.build_routes();
    }
}

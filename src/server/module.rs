//! The platform module: every resource of the DerLg API

use crate::app::AppState;
use crate::booking::descriptor::BookingDescriptor;
use crate::core::module::Module;
use crate::entities::{
    ai_conversation::AiConversationDescriptor, catalog, hotel::HotelDescriptor,
    message::MessageDescriptor, promo_code::PromoCodeDescriptor, review::ReviewDescriptor,
    room::RoomDescriptor, user::UserDescriptor, wishlist::WishlistDescriptor,
};
use crate::payments::descriptor::PaymentDescriptor;
use crate::server::entity_registry::EntityRegistry;

pub struct PlatformModule {
    state: AppState,
}

impl PlatformModule {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

impl Module for PlatformModule {
    fn name(&self) -> &str {
        "derlg-platform"
    }

    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    fn entity_types(&self) -> Vec<&str> {
        vec![
            "user",
            "hotel",
            "room",
            "booking",
            "payment_transaction",
            "tour",
            "event",
            "guide",
            "transportation",
            "promo_code",
            "review",
            "message",
            "wishlist",
            "ai_conversation",
        ]
    }

    fn register_entities(&self, registry: &mut EntityRegistry) {
        let state = &self.state;
        registry.register(Box::new(UserDescriptor::new(state.clone())));
        registry.register(Box::new(HotelDescriptor::new(state.clone())));
        registry.register(Box::new(RoomDescriptor::new(state.clone())));
        registry.register(Box::new(BookingDescriptor::new(state.clone())));
        registry.register(Box::new(PaymentDescriptor::new(state.clone())));
        registry.register(Box::new(PromoCodeDescriptor::new(state.clone())));
        registry.register(Box::new(ReviewDescriptor::new(state.clone())));
        registry.register(Box::new(MessageDescriptor::new(state.clone())));
        registry.register(Box::new(WishlistDescriptor::new(state.clone())));
        registry.register(Box::new(AiConversationDescriptor::new(state.clone())));
        for descriptor in catalog::descriptors(state) {
            registry.register(descriptor);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    #[test]
    fn test_every_resource_is_registered() {
        let module = PlatformModule::new(AppState::in_memory(AppConfig::default()));
        let mut registry = EntityRegistry::new();
        module.register_entities(&mut registry);

        let mut registered = registry.entity_types();
        registered.sort();
        let mut declared = module.entity_types();
        declared.sort();
        assert_eq!(registered, declared);
    }
}

//! Saved hotels, tours and events

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    Hotel,
    Tour,
    Event,
}

impl ItemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::Hotel => "hotel",
            ItemType::Tour => "tour",
            ItemType::Event => "event",
        }
    }
}

// `name` holds the item type
crate::impl_data_entity!(Wishlist, "wishlist", "wishlists", ["user_id"], {
    user_id: Uuid,
    item_type: ItemType,
    item_id: Uuid,
    notes: Option<String>,
});

impl Wishlist {
    pub fn is_same_item(&self, user_id: Uuid, item_type: ItemType, item_id: Uuid) -> bool {
        self.user_id == user_id && self.item_type == item_type && self.item_id == item_id
    }
}

//! The set of stores the platform works with

use crate::booking::Booking;
use crate::core::DataService;
use crate::entities::ai_conversation::AiConversation;
use crate::entities::catalog::{Event, Guide, Tour, Transportation};
use crate::entities::hotel::Hotel;
use crate::entities::message::Message;
use crate::entities::promo_code::PromoCode;
use crate::entities::review::Review;
use crate::entities::room::Room;
use crate::entities::user::User;
use crate::entities::wishlist::Wishlist;
use crate::payments::PaymentTransaction;
use std::sync::Arc;

/// One [`DataService`] per resource, shared by handlers and services
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn DataService<User>>,
    pub hotels: Arc<dyn DataService<Hotel>>,
    pub rooms: Arc<dyn DataService<Room>>,
    pub bookings: Arc<dyn DataService<Booking>>,
    pub transactions: Arc<dyn DataService<PaymentTransaction>>,
    pub tours: Arc<dyn DataService<Tour>>,
    pub events: Arc<dyn DataService<Event>>,
    pub reviews: Arc<dyn DataService<Review>>,
    pub guides: Arc<dyn DataService<Guide>>,
    pub transportation: Arc<dyn DataService<Transportation>>,
    pub promo_codes: Arc<dyn DataService<PromoCode>>,
    pub messages: Arc<dyn DataService<Message>>,
    pub wishlists: Arc<dyn DataService<Wishlist>>,
    pub conversations: Arc<dyn DataService<AiConversation>>,
}

impl Stores {
    pub fn in_memory() -> Self {
        use super::InMemoryDataService as Mem;
        Self {
            users: Arc::new(Mem::new()),
            hotels: Arc::new(Mem::new()),
            rooms: Arc::new(Mem::new()),
            bookings: Arc::new(Mem::new()),
            transactions: Arc::new(Mem::new()),
            tours: Arc::new(Mem::new()),
            events: Arc::new(Mem::new()),
            reviews: Arc::new(Mem::new()),
            guides: Arc::new(Mem::new()),
            transportation: Arc::new(Mem::new()),
            promo_codes: Arc::new(Mem::new()),
            messages: Arc::new(Mem::new()),
            wishlists: Arc::new(Mem::new()),
            conversations: Arc::new(Mem::new()),
        }
    }

    #[cfg(feature = "mysql")]
    pub fn mysql(pool: sqlx::MySqlPool) -> Self {
        use super::mysql::MysqlDataService as Sql;
        Self {
            users: Arc::new(Sql::new(pool.clone())),
            hotels: Arc::new(Sql::new(pool.clone())),
            rooms: Arc::new(Sql::new(pool.clone())),
            bookings: Arc::new(Sql::new(pool.clone())),
            transactions: Arc::new(Sql::new(pool.clone())),
            tours: Arc::new(Sql::new(pool.clone())),
            events: Arc::new(Sql::new(pool.clone())),
            reviews: Arc::new(Sql::new(pool.clone())),
            guides: Arc::new(Sql::new(pool.clone())),
            transportation: Arc::new(Sql::new(pool.clone())),
            promo_codes: Arc::new(Sql::new(pool.clone())),
            messages: Arc::new(Sql::new(pool.clone())),
            wishlists: Arc::new(Sql::new(pool.clone())),
            conversations: Arc::new(Sql::new(pool)),
        }
    }
}

impl Default for Stores {
    fn default() -> Self {
        Self::in_memory()
    }
}

//! Entity traits shared by every persisted record on the platform

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Base trait for every stored record (hotel, room, booking, transaction, ...).
///
/// All entities have:
/// - id: Unique identifier
/// - type: Entity type name (e.g., "booking", "hotel")
/// - created_at / updated_at: Timestamps
/// - deleted_at: Soft deletion timestamp (optional)
/// - status: Current lifecycle status rendered as a string
pub trait Entity: Clone + Send + Sync + 'static {
    /// The plural resource name, also used as the table name (e.g., "bookings")
    fn resource_name() -> &'static str;

    /// The singular resource name (e.g., "booking")
    fn resource_name_singular() -> &'static str;

    fn id(&self) -> Uuid;

    fn entity_type(&self) -> &str;

    fn created_at(&self) -> DateTime<Utc>;

    fn updated_at(&self) -> DateTime<Utc>;

    fn deleted_at(&self) -> Option<DateTime<Utc>>;

    /// Lifecycle status as stored (e.g., "pending", "active")
    fn status(&self) -> &str;

    /// The hotel that owns this record, when the record is hotel-scoped.
    ///
    /// Hotels are the tenants of the platform: rooms, bookings and payment
    /// transactions override this to return their hotel id so that hotel
    /// admins only ever see their own data.
    fn tenant_id(&self) -> Option<Uuid> {
        None
    }

    /// Check if the entity has been soft-deleted
    fn is_deleted(&self) -> bool {
        self.deleted_at().is_some()
    }

    /// Check if the entity is active (status == "active" and not deleted)
    fn is_active(&self) -> bool {
        self.status() == "active" && !self.is_deleted()
    }
}

/// Trait for entities that can be listed, searched and filtered generically.
pub trait Data: Entity {
    /// Human-readable label (hotel name, booking number, promo code, ...)
    fn name(&self) -> &str;

    /// Fields that storage backends may index for searching
    fn indexed_fields() -> &'static [&'static str];

    /// Get the value of a specific field by name
    fn field_value(&self, field: &str) -> Option<crate::core::field::FieldValue>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Clone, Debug, Serialize, Deserialize)]
    struct TestRoom {
        id: Uuid,
        hotel_id: Uuid,
        entity_type: String,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
        deleted_at: Option<DateTime<Utc>>,
        status: String,
    }

    impl Entity for TestRoom {
        fn resource_name() -> &'static str {
            "test_rooms"
        }

        fn resource_name_singular() -> &'static str {
            "test_room"
        }

        fn id(&self) -> Uuid {
            self.id
        }

        fn entity_type(&self) -> &str {
            &self.entity_type
        }

        fn created_at(&self) -> DateTime<Utc> {
            self.created_at
        }

        fn updated_at(&self) -> DateTime<Utc> {
            self.updated_at
        }

        fn deleted_at(&self) -> Option<DateTime<Utc>> {
            self.deleted_at
        }

        fn status(&self) -> &str {
            &self.status
        }

        fn tenant_id(&self) -> Option<Uuid> {
            Some(self.hotel_id)
        }
    }

    fn room() -> TestRoom {
        let now = Utc::now();
        TestRoom {
            id: Uuid::new_v4(),
            hotel_id: Uuid::new_v4(),
            entity_type: "test_room".to_string(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
            status: "active".to_string(),
        }
    }

    #[test]
    fn test_soft_deleted_entity_is_not_active() {
        let mut room = room();
        assert!(!room.is_deleted());
        assert!(room.is_active());

        room.deleted_at = Some(Utc::now());
        assert!(room.is_deleted());
        assert!(!room.is_active());
    }

    #[test]
    fn test_tenant_override() {
        let room = room();
        assert_eq!(room.tenant_id(), Some(room.hotel_id));
        assert_eq!(TestRoom::resource_name(), "test_rooms");
    }
}

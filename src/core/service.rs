//! Storage-agnostic service trait for persisted entities

use crate::core::{Data, Entity};
use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

/// Service trait for managing data entities
///
/// Implementations provide CRUD operations for a specific entity type.
/// Business services (bookings, payments) only ever talk to storage through
/// this trait, so the in-memory and MySQL backends are interchangeable.
#[async_trait]
pub trait DataService<T: Data>: Send + Sync {
    /// Create a new entity
    async fn create(&self, entity: T) -> Result<T>;

    /// Get an entity by ID
    async fn get(&self, id: &Uuid) -> Result<Option<T>>;

    /// List all entities
    async fn list(&self) -> Result<Vec<T>>;

    /// Update an existing entity. Fails if the entity does not exist.
    async fn update(&self, id: &Uuid, entity: T) -> Result<T>;

    /// Delete an entity
    async fn delete(&self, id: &Uuid) -> Result<()>;

    /// Search entities whose field equals `value`
    async fn search(&self, field: &str, value: &str) -> Result<Vec<T>>;
}

/// Fetch a live record, mapping a missing or soft-deleted one to 404
pub async fn find_or_404<T: Data>(
    store: &dyn DataService<T>,
    id: &Uuid,
) -> crate::core::error::DerlgResult<T> {
    match store.get(id).await? {
        Some(entity) if !entity.is_deleted() => Ok(entity),
        _ => Err(crate::core::error::EntityError::not_found(T::resource_name_singular(), id).into()),
    }
}

//! In-memory implementation of DataService for development and tests

use crate::core::{Data, DataService};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

/// In-memory data service
///
/// Uses RwLock for thread-safe access. Cloning shares the underlying map.
#[derive(Clone)]
pub struct InMemoryDataService<T> {
    entities: Arc<RwLock<HashMap<Uuid, T>>>,
}

impl<T> InMemoryDataService<T> {
    pub fn new() -> Self {
        Self {
            entities: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl<T> Default for InMemoryDataService<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T: Data> DataService<T> for InMemoryDataService<T> {
    async fn create(&self, entity: T) -> Result<T> {
        let mut entities = self
            .entities
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;

        if entities.contains_key(&entity.id()) {
            return Err(anyhow!(
                "{} already exists: {}",
                T::resource_name_singular(),
                entity.id()
            ));
        }
        entities.insert(entity.id(), entity.clone());

        Ok(entity)
    }

    async fn get(&self, id: &Uuid) -> Result<Option<T>> {
        let entities = self
            .entities
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;

        Ok(entities.get(id).cloned())
    }

    async fn list(&self) -> Result<Vec<T>> {
        let entities = self
            .entities
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;

        let mut all: Vec<T> = entities.values().cloned().collect();
        all.sort_by_key(|e| std::cmp::Reverse(e.created_at()));
        Ok(all)
    }

    async fn update(&self, id: &Uuid, entity: T) -> Result<T> {
        let mut entities = self
            .entities
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;

        entities
            .get_mut(id)
            .ok_or_else(|| anyhow!("{} not found: {}", T::resource_name_singular(), id))?;

        entities.insert(*id, entity.clone());

        Ok(entity)
    }

    async fn delete(&self, id: &Uuid) -> Result<()> {
        let mut entities = self
            .entities
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;

        entities.remove(id);

        Ok(())
    }

    async fn search(&self, field: &str, value: &str) -> Result<Vec<T>> {
        let entities = self
            .entities
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;

        Ok(entities
            .values()
            .filter(|entity| match field {
                "name" => entity.name() == value,
                "status" => entity.status() == value,
                _ => entity.field_value(field).is_some_and(|v| v.matches(value)),
            })
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    crate::impl_data_entity!(Note, "note", "notes", ["topic"], {
        topic: String,
    });

    fn note(topic: &str) -> Note {
        Note::new(format!("{} note", topic), "active".to_string(), topic.to_string())
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let service = InMemoryDataService::new();
        let created = service.create(note("angkor")).await.unwrap();

        let fetched = service.get(&created.id).await.unwrap().unwrap();
        assert_eq!(fetched.topic, "angkor");
    }

    #[tokio::test]
    async fn test_duplicate_id_is_rejected() {
        let service = InMemoryDataService::new();
        let created = service.create(note("kep")).await.unwrap();
        assert!(service.create(created).await.is_err());
    }

    #[tokio::test]
    async fn test_update_missing_fails() {
        let service = InMemoryDataService::new();
        let n = note("kampot");
        assert!(service.update(&n.id.clone(), n).await.is_err());
    }

    #[tokio::test]
    async fn test_search_by_field() {
        let service = InMemoryDataService::new();
        service.create(note("angkor")).await.unwrap();
        service.create(note("angkor")).await.unwrap();
        service.create(note("kep")).await.unwrap();

        assert_eq!(service.search("topic", "angkor").await.unwrap().len(), 2);
        assert_eq!(service.search("name", "kep note").await.unwrap().len(), 1);
        assert!(service.search("topic", "siem reap").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let service = InMemoryDataService::new();
        let other = service.clone();
        let created = service.create(note("koh rong")).await.unwrap();
        assert!(other.get(&created.id).await.unwrap().is_some());

        other.delete(&created.id).await.unwrap();
        assert!(service.get(&created.id).await.unwrap().is_none());
    }
}

//! Entity repository abstraction.
//!
//! Relational storage sits behind [`Repository`]; [`InMemoryRepository`]
//! keeps entities in a map for the single-process host and for tests.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::DomainError;

/// A persisted entity identified by a UUID.
pub trait Entity: Clone + Send + Sync + 'static {
    /// Returns the entity identifier.
    fn id(&self) -> Uuid;

    /// Returns the tenant owning the entity.
    fn tenant_id(&self) -> Uuid;
}

/// Repository trait for loading and storing entities.
#[async_trait]
pub trait Repository<T: Entity>: Send + Sync {
    /// Load an entity by id, `None` if it does not exist.
    async fn get(&self, id: Uuid) -> Result<Option<T>, DomainError>;

    /// All entities owned by `tenant_id`.
    async fn list_by_tenant(&self, tenant_id: Uuid) -> Result<Vec<T>, DomainError>;

    /// Insert or replace an entity.
    async fn save(&self, entity: T) -> Result<(), DomainError>;

    /// Remove an entity. Returns whether it existed.
    async fn delete(&self, id: Uuid) -> Result<bool, DomainError>;
}

/// Map-backed repository.
#[derive(Debug)]
pub struct InMemoryRepository<T> {
    entities: RwLock<HashMap<Uuid, T>>,
}

impl<T> Default for InMemoryRepository<T> {
    fn default() -> Self {
        Self {
            entities: RwLock::new(HashMap::new()),
        }
    }
}

impl<T> InMemoryRepository<T> {
    /// Create an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl<T: Entity> Repository<T> for InMemoryRepository<T> {
    async fn get(&self, id: Uuid) -> Result<Option<T>, DomainError> {
        Ok(self
            .entities
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned())
    }

    async fn list_by_tenant(&self, tenant_id: Uuid) -> Result<Vec<T>, DomainError> {
        let mut owned: Vec<T> = self
            .entities
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|entity| entity.tenant_id() == tenant_id)
            .cloned()
            .collect();
        owned.sort_by_key(Entity::id);
        Ok(owned)
    }

    async fn save(&self, entity: T) -> Result<(), DomainError> {
        self.entities
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(entity.id(), entity);
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, DomainError> {
        Ok(self
            .entities
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
            .is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Note {
        id: Uuid,
        tenant_id: Uuid,
    }

    impl Entity for Note {
        fn id(&self) -> Uuid {
            self.id
        }

        fn tenant_id(&self) -> Uuid {
            self.tenant_id
        }
    }

    #[tokio::test]
    async fn test_save_then_get_returns_entity() {
        let repo = InMemoryRepository::new();
        let note = Note {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
        };

        repo.save(note.clone()).await.unwrap();

        assert_eq!(repo.get(note.id).await.unwrap(), Some(note));
    }

    #[tokio::test]
    async fn test_list_by_tenant_filters_other_tenants() {
        let repo = InMemoryRepository::new();
        let tenant = Uuid::new_v4();
        let mine = Note {
            id: Uuid::new_v4(),
            tenant_id: tenant,
        };
        let theirs = Note {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
        };
        repo.save(mine.clone()).await.unwrap();
        repo.save(theirs).await.unwrap();

        let listed = repo.list_by_tenant(tenant).await.unwrap();

        assert_eq!(listed, vec![mine]);
    }

    #[tokio::test]
    async fn test_delete_reports_whether_entity_existed() {
        let repo = InMemoryRepository::new();
        let note = Note {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
        };
        repo.save(note.clone()).await.unwrap();

        assert!(repo.delete(note.id).await.unwrap());
        assert!(!repo.delete(note.id).await.unwrap());
        assert_eq!(repo.get(note.id).await.unwrap(), None);
    }
}

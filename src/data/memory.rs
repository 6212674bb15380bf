use crate::domain::error::DomainError;
use crate::domain::repository::RestaurantRepository;
use crate::domain::restaurant::{Restaurant, RestaurantDraft};
use crate::domain::validation::{TAKEN, ValidationErrors};
use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, instrument, trace, warn};

struct Table {
    rows: BTreeMap<u32, Restaurant>,
    next_id: u32,
}

impl Table {
    fn name_taken(&self, name: &str, except: Option<u32>) -> bool {
        self.rows
            .values()
            .any(|r| r.name == name && Some(r.id) != except)
    }
}

fn name_taken_error() -> anyhow::Error {
    let mut errors = ValidationErrors::new();
    errors.add("name", TAKEN);
    DomainError::Validation(errors).into()
}

#[derive(Clone)]
pub struct InMemoryRestaurantRepository {
    storage: Arc<RwLock<Table>>,
}

impl InMemoryRestaurantRepository {
    pub fn new() -> Self {
        Self {
            storage: Arc::new(RwLock::new(Table {
                rows: BTreeMap::new(),
                next_id: 1,
            })),
        }
    }
}

impl Default for InMemoryRestaurantRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RestaurantRepository for InMemoryRestaurantRepository {
    #[instrument(skip(self), fields(name = %draft.name))]
    async fn insert(&self, draft: RestaurantDraft) -> Result<Restaurant> {
        trace!("Acquiring write lock for restaurant storage");
        let mut table = self.storage.write().await;
        if table.name_taken(&draft.name, None) {
            warn!(name = %draft.name, "Rejected insert of duplicate restaurant name");
            return Err(name_taken_error());
        }

        let id = table.next_id;
        table.next_id = id
            .checked_add(1)
            .ok_or_else(|| DomainError::Internal("Restaurant id space exhausted".to_string()))?;

        let now = Utc::now();
        let restaurant = Restaurant {
            id,
            name: draft.name,
            description: draft.description,
            created_at: now,
            updated_at: now,
        };
        table.rows.insert(id, restaurant.clone());
        debug!(restaurant_id = id, "Restaurant inserted into memory storage");
        Ok(restaurant)
    }

    async fn find_by_id(&self, id: u32) -> Result<Option<Restaurant>> {
        let table = self.storage.read().await;
        Ok(table.rows.get(&id).cloned())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Restaurant>> {
        let table = self.storage.read().await;
        Ok(table.rows.values().find(|r| r.name == name).cloned())
    }

    async fn list(&self) -> Result<Vec<Restaurant>> {
        let table = self.storage.read().await;
        Ok(table.rows.values().cloned().collect())
    }

    #[instrument(skip(self, draft), fields(restaurant_id = id))]
    async fn update(&self, id: u32, draft: RestaurantDraft) -> Result<Option<Restaurant>> {
        let mut table = self.storage.write().await;
        if !table.rows.contains_key(&id) {
            trace!("Restaurant not found in storage");
            return Ok(None);
        }
        if table.name_taken(&draft.name, Some(id)) {
            warn!(name = %draft.name, "Rejected rename to duplicate restaurant name");
            return Err(name_taken_error());
        }

        let updated = table.rows.get_mut(&id).map(|row| {
            row.name = draft.name;
            row.description = draft.description;
            row.updated_at = Utc::now();
            row.clone()
        });
        debug!("Restaurant updated in memory storage");
        Ok(updated)
    }

    #[instrument(skip(self), fields(restaurant_id = id))]
    async fn delete(&self, id: u32) -> Result<Option<Restaurant>> {
        let mut table = self.storage.write().await;
        let removed = table.rows.remove(&id);
        debug!(removed = removed.is_some(), "Restaurant delete applied");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(name: &str, description: Option<&str>) -> RestaurantDraft {
        RestaurantDraft {
            name: name.to_string(),
            description: description.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_insert_assigns_sequential_ids() {
        let repo = InMemoryRestaurantRepository::new();
        let kfc = repo.insert(draft("KFC", None)).await.unwrap();
        let moes = repo.insert(draft("Moe's Tavern", None)).await.unwrap();

        assert_eq!(kfc.id, 1);
        assert_eq!(moes.id, 2);
        assert_eq!(kfc.created_at, kfc.updated_at);
    }

    #[tokio::test]
    async fn test_ids_are_not_reused_after_delete() {
        let repo = InMemoryRestaurantRepository::new();
        let kfc = repo.insert(draft("KFC", None)).await.unwrap();
        repo.delete(kfc.id).await.unwrap();
        let again = repo.insert(draft("KFC", None)).await.unwrap();

        assert_ne!(again.id, kfc.id);
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicate_name() {
        let repo = InMemoryRestaurantRepository::new();
        repo.insert(draft("KFC", None)).await.unwrap();

        let err = repo.insert(draft("KFC", Some("again"))).await.unwrap_err();
        match err.downcast_ref::<DomainError>() {
            Some(DomainError::Validation(errors)) => {
                assert_eq!(errors.on("name"), vec![TAKEN]);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(repo.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_name_uniqueness_is_case_sensitive() {
        let repo = InMemoryRestaurantRepository::new();
        repo.insert(draft("KFC", None)).await.unwrap();
        assert!(repo.insert(draft("kfc", None)).await.is_ok());
    }

    #[tokio::test]
    async fn test_list_is_ordered_by_id() {
        let repo = InMemoryRestaurantRepository::new();
        for name in ["Zed's", "Alfredo's", "Moe's Tavern"] {
            repo.insert(draft(name, None)).await.unwrap();
        }
        let names: Vec<String> = repo.list().await.unwrap().into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["Zed's", "Alfredo's", "Moe's Tavern"]);
    }

    #[tokio::test]
    async fn test_find_by_name_and_id() {
        let repo = InMemoryRestaurantRepository::new();
        let kfc = repo.insert(draft("KFC", Some("Bucket food."))).await.unwrap();

        let by_name = repo.find_by_name("KFC").await.unwrap().unwrap();
        assert_eq!(by_name.id, kfc.id);
        let by_id = repo.find_by_id(kfc.id).await.unwrap().unwrap();
        assert_eq!(by_id.description.as_deref(), Some("Bucket food."));
        assert!(repo.find_by_name("Nando's").await.unwrap().is_none());
        assert!(repo.find_by_id(99).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_allows_keeping_own_name() {
        let repo = InMemoryRestaurantRepository::new();
        let kfc = repo.insert(draft("KFC", None)).await.unwrap();

        let updated = repo
            .update(kfc.id, draft("KFC", Some("Bucket food.")))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.name, "KFC");
        assert_eq!(updated.description.as_deref(), Some("Bucket food."));
        assert!(updated.updated_at >= updated.created_at);
    }

    #[tokio::test]
    async fn test_update_rejects_other_records_name() {
        let repo = InMemoryRestaurantRepository::new();
        repo.insert(draft("KFC", None)).await.unwrap();
        let moes = repo.insert(draft("Moe's Tavern", None)).await.unwrap();

        assert!(repo.update(moes.id, draft("KFC", None)).await.is_err());
        let unchanged = repo.find_by_id(moes.id).await.unwrap().unwrap();
        assert_eq!(unchanged.name, "Moe's Tavern");
    }

    #[tokio::test]
    async fn test_update_and_delete_missing_record() {
        let repo = InMemoryRestaurantRepository::new();
        assert!(repo.update(42, draft("KFC", None)).await.unwrap().is_none());
        assert!(repo.delete(42).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_concurrent_inserts_of_same_name_admit_one() {
        let repo = InMemoryRestaurantRepository::new();

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let repo_clone = repo.clone();
                tokio::spawn(async move { repo_clone.insert(draft("KFC", None)).await })
            })
            .collect();

        let mut successes = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                successes += 1;
            }
        }
        assert_eq!(successes, 1);
        assert_eq!(repo.list().await.unwrap().len(), 1);
    }
}

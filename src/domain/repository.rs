use crate::domain::restaurant::{Restaurant, RestaurantDraft};
use crate::domain::user::User;
use anyhow::Result;
use async_trait::async_trait;

/// Restaurant storage. Implementations must reject a write whose name is
/// already used by another record with `DomainError::Validation`.
#[async_trait]
pub trait RestaurantRepository: Send + Sync {
    async fn insert(&self, draft: RestaurantDraft) -> Result<Restaurant>;
    async fn find_by_id(&self, id: u32) -> Result<Option<Restaurant>>;
    async fn find_by_name(&self, name: &str) -> Result<Option<Restaurant>>;
    /// All records ordered by id.
    async fn list(&self) -> Result<Vec<Restaurant>>;
    /// Returns `None` when no record has this id.
    async fn update(&self, id: u32, draft: RestaurantDraft) -> Result<Option<Restaurant>>;
    /// Returns the removed record, `None` when no record has this id.
    async fn delete(&self, id: u32) -> Result<Option<Restaurant>>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn save_user(&self, user: User) -> Result<()>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;
    async fn find_user_by_id(&self, id: &str) -> Result<Option<User>>;
}

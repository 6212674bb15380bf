use crate::domain::error::DomainError;
use crate::domain::repository::UserRepository;
use crate::domain::user::User;
use crate::domain::validation::{TAKEN, ValidationErrors};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, instrument, trace, warn};

#[derive(Default)]
struct Accounts {
    by_id: HashMap<String, User>,
    /// email -> user id
    by_email: HashMap<String, String>,
}

#[derive(Clone, Default)]
pub struct InMemoryUserRepository {
    storage: Arc<RwLock<Accounts>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    /// Inserts or replaces by id. An email owned by a different id is rejected.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    async fn save_user(&self, user: User) -> Result<()> {
        trace!("Acquiring write lock for user storage");
        let mut accounts = self.storage.write().await;

        if let Some(owner) = accounts.by_email.get(&user.email) {
            if owner != &user.id {
                warn!("Rejected user with an email that is already registered");
                let mut errors = ValidationErrors::new();
                errors.add("email", TAKEN);
                return Err(DomainError::Validation(errors).into());
            }
        }

        if let Some(previous) = accounts.by_id.get(&user.id).map(|u| u.email.clone()) {
            accounts.by_email.remove(&previous);
        }
        accounts.by_email.insert(user.email.clone(), user.id.clone());
        accounts.by_id.insert(user.id.clone(), user);
        debug!("User saved to memory storage");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let accounts = self.storage.read().await;
        let user = accounts
            .by_email
            .get(email)
            .and_then(|id| accounts.by_id.get(id))
            .cloned();
        trace!(found = user.is_some(), "Looked up user by email");
        Ok(user)
    }

    #[instrument(skip(self))]
    async fn find_user_by_id(&self, id: &str) -> Result<Option<User>> {
        let accounts = self.storage.read().await;
        let user = accounts.by_id.get(id).cloned();
        trace!(found = user.is_some(), "Looked up user by id");
        Ok(user)
    }
}

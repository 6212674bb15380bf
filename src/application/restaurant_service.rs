use crate::domain::error::DomainError;
use crate::domain::repository::RestaurantRepository;
use crate::domain::restaurant::{Restaurant, RestaurantParams};
use crate::domain::validation::{BLANK, TAKEN, ValidationErrors, is_blank};
use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

pub struct RestaurantService<R: RestaurantRepository> {
    repository: Arc<R>,
}

impl<R: RestaurantRepository> RestaurantService<R> {
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    pub async fn list(&self) -> Result<Vec<Restaurant>> {
        self.repository.list().await
    }

    pub async fn get(&self, id: u32) -> Result<Restaurant> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::RestaurantNotFound(id).into())
    }

    /// Collects field errors for `params` without writing anything.
    /// `existing_id` is the record being edited, so it may keep its own name.
    #[instrument(skip(self, params), fields(name = %params.name))]
    pub async fn validate(
        &self,
        params: &RestaurantParams,
        existing_id: Option<u32>,
    ) -> Result<ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if is_blank(&params.name) {
            errors.add("name", BLANK);
        } else if let Some(other) = self.repository.find_by_name(&params.name).await? {
            if Some(other.id) != existing_id {
                errors.add("name", TAKEN);
            }
        }
        debug!(error_count = errors.len(), "Restaurant validated");
        Ok(errors)
    }

    #[instrument(skip(self, params), fields(name = %params.name))]
    pub async fn create(&self, params: RestaurantParams) -> Result<Restaurant> {
        let errors = self.validate(&params, None).await?;
        if !errors.is_empty() {
            warn!(errors = %errors, "Restaurant rejected");
            return Err(DomainError::Validation(errors).into());
        }

        let restaurant = self.repository.insert(params.into_draft()).await?;
        info!(restaurant_id = restaurant.id, "Restaurant created");
        Ok(restaurant)
    }

    #[instrument(skip(self, params), fields(name = %params.name))]
    pub async fn update(&self, id: u32, params: RestaurantParams) -> Result<Restaurant> {
        self.get(id).await?;

        let errors = self.validate(&params, Some(id)).await?;
        if !errors.is_empty() {
            warn!(errors = %errors, "Restaurant update rejected");
            return Err(DomainError::Validation(errors).into());
        }

        let restaurant = self
            .repository
            .update(id, params.into_draft())
            .await?
            .ok_or(DomainError::RestaurantNotFound(id))?;
        info!(restaurant_id = id, "Restaurant updated");
        Ok(restaurant)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: u32) -> Result<Restaurant> {
        let removed = self
            .repository
            .delete(id)
            .await?
            .ok_or(DomainError::RestaurantNotFound(id))?;
        info!(restaurant_id = id, name = %removed.name, "Restaurant deleted");
        Ok(removed)
    }
}

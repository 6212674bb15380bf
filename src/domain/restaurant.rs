use crate::domain::validation::is_blank;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Restaurant {
    pub id: u32,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields submitted through the restaurant form.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct RestaurantParams {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl RestaurantParams {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }

    /// Prefills the edit form from a stored record.
    pub fn from_restaurant(restaurant: &Restaurant) -> Self {
        Self {
            name: restaurant.name.clone(),
            description: restaurant.description.clone().unwrap_or_default(),
        }
    }

    /// Blank descriptions are stored as absent.
    pub fn into_draft(self) -> RestaurantDraft {
        let description = if is_blank(&self.description) {
            None
        } else {
            Some(self.description)
        };
        RestaurantDraft {
            name: self.name,
            description,
        }
    }
}

/// Validated attributes ready to be written to a repository.
#[derive(Debug, Clone, PartialEq)]
pub struct RestaurantDraft {
    pub name: String,
    pub description: Option<String>,
}

//! Listing catalog service

use uuid::Uuid;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        item::{CreateItem, ItemQuery},
        Item, Session,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
}

impl CatalogService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Search listings that can be rented right now
    pub async fn search_items(&self, query: &ItemQuery) -> AppResult<Vec<Item>> {
        self.repository.items.list_available(query).await
    }

    pub async fn get_item(&self, item_id: Uuid) -> AppResult<Item> {
        self.repository.items.get(item_id).await
    }

    /// List an item owned by the caller
    pub async fn create_item(&self, session: &Session, item: CreateItem) -> AppResult<Item> {
        item.validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        let created = self.repository.items.create(session.user_id, &item).await?;
        tracing::info!("Item {} listed by {}", created.item_id, session.user_id);
        Ok(created)
    }
}

//! Items repository for database operations

use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        item::{CreateItem, ItemQuery},
        Item,
    },
};

use super::ItemStore;

#[derive(Clone)]
pub struct ItemsRepository {
    pool: Pool<Postgres>,
}

impl ItemsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ItemStore for ItemsRepository {
    async fn get(&self, item_id: Uuid) -> AppResult<Item> {
        sqlx::query_as::<_, Item>("SELECT * FROM items WHERE item_id = $1")
            .bind(item_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Item with id {} not found", item_id)))
    }

    async fn list_available(&self, query: &ItemQuery) -> AppResult<Vec<Item>> {
        let items = sqlx::query_as::<_, Item>(
            r#"
            SELECT * FROM items
            WHERE available
              AND ($1::text IS NULL OR category = $1)
              AND ($2::text IS NULL
                   OR title ILIKE '%' || $2 || '%'
                   OR description ILIKE '%' || $2 || '%')
            ORDER BY created_at DESC
            "#,
        )
        .bind(query.category.as_deref())
        .bind(query.q.as_deref().map(str::trim).filter(|q| !q.is_empty()))
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    async fn create(&self, owner_id: Uuid, item: &CreateItem) -> AppResult<Item> {
        let created = sqlx::query_as::<_, Item>(
            r#"
            INSERT INTO items (user_id, title, description, category, condition, price_per_day, image_url, available)
            VALUES ($1, $2, $3, $4, $5, $6, $7, TRUE)
            RETURNING *
            "#,
        )
        .bind(owner_id)
        .bind(&item.title)
        .bind(&item.description)
        .bind(&item.category)
        .bind(&item.condition)
        .bind(item.price_per_day)
        .bind(&item.image_url)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    async fn claim(&self, item_id: Uuid) -> AppResult<bool> {
        let claimed = sqlx::query_scalar::<_, Uuid>(
            "UPDATE items SET available = FALSE WHERE item_id = $1 AND available RETURNING item_id",
        )
        .bind(item_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(claimed.is_some())
    }

    async fn release(&self, item_id: Uuid) -> AppResult<()> {
        let result = sqlx::query("UPDATE items SET available = TRUE WHERE item_id = $1")
            .bind(item_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Item with id {} not found", item_id)));
        }

        Ok(())
    }
}

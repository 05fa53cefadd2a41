use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};

/// A piece of uniform or equipment held by exactly one member.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct ClothingItem {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub image: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Deserialize)]
pub struct NewClothingItem {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub image: String,
}

impl ClothingItem {
    pub async fn for_user(user_id: Uuid, pool: &PgPool) -> ApiResult<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT id, user_id, name, image, created_at FROM clothing_items
             WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn with_id_opt(id: Uuid, pool: &PgPool) -> ApiResult<Option<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT id, user_id, name, image, created_at FROM clothing_items WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn create(user_id: Uuid, new_item: NewClothingItem, pool: &PgPool) -> ApiResult<Self> {
        if new_item.name.is_empty() || new_item.image.is_empty() {
            return Err(ApiError::BadRequest("name and image are required".to_owned()));
        }

        sqlx::query_as::<_, Self>(
            "INSERT INTO clothing_items (id, user_id, name, image) VALUES ($1, $2, $3, $4)
             RETURNING id, user_id, name, image, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(&new_item.name)
        .bind(&new_item.image)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    /// Members may only delete their own items.
    pub async fn delete(id: Uuid, owner: Uuid, pool: &PgPool) -> ApiResult<()> {
        let item = Self::with_id_opt(id, pool)
            .await?
            .ok_or(ApiError::NotFound("clothing item"))?;
        if item.user_id != owner {
            return Err(ApiError::Forbidden(None));
        }

        sqlx::query("DELETE FROM clothing_items WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(())
    }
}

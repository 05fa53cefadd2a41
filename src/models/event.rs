use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Event {
    pub id: Uuid,
    pub title: String,
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
    pub location: Option<String>,
    pub description: Option<String>,
    /// Once closed, the event no longer accepts attendance submissions
    pub is_closed: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Deserialize)]
pub struct NewEvent {
    pub title: String,
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
    pub location: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EventUpdate {
    pub title: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub date: Option<OffsetDateTime>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub is_closed: Option<bool>,
}

const EVENT_COLUMNS: &str = "id, title, date, location, description, is_closed, created_at";

impl Event {
    pub async fn with_id(id: Uuid, pool: &PgPool) -> ApiResult<Self> {
        Self::with_id_opt(id, pool)
            .await?
            .ok_or(ApiError::NotFound("event"))
    }

    pub async fn with_id_opt(id: Uuid, pool: &PgPool) -> ApiResult<Option<Self>> {
        sqlx::query_as::<_, Self>(&format!(
            "SELECT {} FROM events WHERE id = $1",
            EVENT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn all(pool: &PgPool) -> ApiResult<Vec<Self>> {
        sqlx::query_as::<_, Self>(&format!(
            "SELECT {} FROM events ORDER BY date",
            EVENT_COLUMNS
        ))
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn create(new_event: NewEvent, pool: &PgPool) -> ApiResult<Self> {
        if new_event.title.is_empty() {
            return Err(ApiError::BadRequest("event title is required".to_owned()));
        }

        sqlx::query_as::<_, Self>(&format!(
            "INSERT INTO events (id, title, date, location, description)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {}",
            EVENT_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(&new_event.title)
        .bind(new_event.date)
        .bind(&new_event.location)
        .bind(&new_event.description)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn update(id: Uuid, update: &EventUpdate, pool: &PgPool) -> ApiResult<Self> {
        sqlx::query_as::<_, Self>(&format!(
            "UPDATE events SET
                title = COALESCE($2, title),
                date = COALESCE($3, date),
                location = COALESCE($4, location),
                description = COALESCE($5, description),
                is_closed = COALESCE($6, is_closed)
             WHERE id = $1
             RETURNING {}",
            EVENT_COLUMNS
        ))
        .bind(id)
        .bind(&update.title)
        .bind(update.date)
        .bind(&update.location)
        .bind(&update.description)
        .bind(update.is_closed)
        .fetch_optional(pool)
        .await?
        .ok_or(ApiError::NotFound("event"))
    }

    pub async fn delete(id: Uuid, pool: &PgPool) -> ApiResult<()> {
        let deleted = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        if deleted.rows_affected() == 0 {
            Err(ApiError::NotFound("event"))
        } else {
            Ok(())
        }
    }
}

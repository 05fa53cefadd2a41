use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};

/// A named set of permission tokens that can be assigned to members.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Role {
    pub id: Uuid,
    pub name: String,
    /// Permission tokens serialized as a JSON array
    pub permissions: String,
}

#[derive(Debug, Serialize)]
pub struct RoleResponse {
    pub id: Uuid,
    pub name: String,
    pub permissions: Vec<String>,
}

impl Role {
    /// Parses the serialized permission tokens, treating bad data as empty.
    pub fn permission_list(&self) -> Vec<String> {
        serde_json::from_str(&self.permissions).unwrap_or_default()
    }

    pub fn into_response(self) -> RoleResponse {
        let permissions = self.permission_list();
        RoleResponse {
            id: self.id,
            name: self.name,
            permissions,
        }
    }

    pub async fn all(pool: &PgPool) -> ApiResult<Vec<Self>> {
        sqlx::query_as::<_, Self>("SELECT id, name, permissions FROM roles ORDER BY name")
            .fetch_all(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn with_id(id: Uuid, pool: &PgPool) -> ApiResult<Self> {
        Self::with_id_opt(id, pool)
            .await?
            .ok_or(ApiError::NotFound("role"))
    }

    pub async fn with_id_opt(id: Uuid, pool: &PgPool) -> ApiResult<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT id, name, permissions FROM roles WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn for_user(user_id: Uuid, pool: &PgPool) -> ApiResult<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT id, name, permissions FROM roles
             WHERE id IN (SELECT role_id FROM user_roles WHERE user_id = $1)
             ORDER BY name",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn create(name: &str, permissions: &[String], pool: &PgPool) -> ApiResult<Self> {
        if name.is_empty() {
            return Err(ApiError::BadRequest("role name is required".to_owned()));
        }

        sqlx::query_as::<_, Self>(
            "INSERT INTO roles (id, name, permissions) VALUES ($1, $2, $3)
             RETURNING id, name, permissions",
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(serialize_permissions(permissions))
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn update(
        id: Uuid,
        name: Option<&str>,
        permissions: &[String],
        pool: &PgPool,
    ) -> ApiResult<Self> {
        sqlx::query_as::<_, Self>(
            "UPDATE roles SET name = COALESCE($2, name), permissions = $3
             WHERE id = $1 RETURNING id, name, permissions",
        )
        .bind(id)
        .bind(name)
        .bind(serialize_permissions(permissions))
        .fetch_optional(pool)
        .await?
        .ok_or(ApiError::NotFound("role"))
    }

    pub async fn delete(id: Uuid, pool: &PgPool) -> ApiResult<()> {
        let deleted = sqlx::query("DELETE FROM roles WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        if deleted.rows_affected() == 0 {
            Err(ApiError::NotFound("role"))
        } else {
            Ok(())
        }
    }
}

fn serialize_permissions(permissions: &[String]) -> String {
    serde_json::to_string(permissions).unwrap_or_else(|_| "[]".to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn role_with_permissions(permissions: &str) -> Role {
        Role {
            id: Uuid::new_v4(),
            name: "PLANNER".to_owned(),
            permissions: permissions.to_owned(),
        }
    }

    #[test]
    fn permissions_round_trip_through_serialization() {
        let tokens = vec!["MANAGE_EVENTS".to_owned(), "VIEW_ATTENDANCE".to_owned()];
        let role = role_with_permissions(&serialize_permissions(&tokens));

        assert_eq!(role.permission_list(), tokens);
    }

    #[test]
    fn malformed_permissions_parse_as_empty() {
        assert!(role_with_permissions("not json").permission_list().is_empty());
        assert!(role_with_permissions("").permission_list().is_empty());
    }
}
